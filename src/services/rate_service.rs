use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client as HttpClient;
use tracing::{info, warn};

use crate::api::currency::{CurrencyApiClient, ExchangeRateApiClient, RateSource};
use crate::config::Settings;
use crate::models::{ExchangeRate, FreshnessLabel};

/// Best-effort base-to-local rate lookup with a fixed fallback chain
pub struct RateProvider {
    sources: Vec<Box<dyn RateSource>>,
    base_currency: String,
    local_currency: String,
    default_rate: f64,
}

impl RateProvider {
    pub fn new(
        sources: Vec<Box<dyn RateSource>>,
        base_currency: String,
        local_currency: String,
        default_rate: f64,
    ) -> Self {
        Self {
            sources,
            base_currency,
            local_currency,
            default_rate,
        }
    }

    /// Primary CurrencyAPI, then keyless exchangerate-api, then the default
    pub fn from_settings(settings: &Settings, http_client: HttpClient) -> Self {
        let sources: Vec<Box<dyn RateSource>> = vec![
            Box::new(CurrencyApiClient::new(
                http_client.clone(),
                settings.currency_api_key.clone(),
                settings.currency_api_url.clone(),
            )),
            Box::new(ExchangeRateApiClient::new(
                http_client,
                settings.fallback_rate_url.clone(),
            )),
        ];

        Self::new(
            sources,
            settings.base_currency.clone(),
            settings.local_currency.clone(),
            settings.default_rate,
        )
    }

    /// Walk the chain once. Never fails: the last resort is the default rate.
    pub async fn refresh(&self) -> ExchangeRate {
        for source in &self.sources {
            match source
                .fetch_rate(&self.base_currency, &self.local_currency)
                .await
            {
                Ok(quote) => {
                    info!(
                        "💱 Exchange rate updated via {}: 1 {} = {} {}",
                        source.name(),
                        self.base_currency,
                        quote.value,
                        self.local_currency
                    );
                    info!(
                        "📅 Last updated: {}",
                        quote.last_updated.as_deref().unwrap_or("Unknown")
                    );
                    return ExchangeRate::from_quote(quote, source.origin());
                }
                Err(e) => {
                    warn!("⚠ Failed to fetch exchange rate from {}: {}", source.name(), e);
                }
            }
        }

        warn!(
            "⚠ All rate sources failed, using default rate of {} {} per {}",
            self.default_rate, self.local_currency, self.base_currency
        );
        ExchangeRate::fallback_default(self.default_rate)
    }
}

/// Human-readable age of the rate, relative to `now`
pub fn format_freshness(label: &FreshnessLabel, now: DateTime<Utc>) -> String {
    let raw = match label {
        FreshnessLabel::DefaultRate => return "Default rate".to_string(),
        FreshnessLabel::Reported(raw) => raw,
    };

    let Some(updated_at) = parse_timestamp(raw) else {
        return "Unknown".to_string();
    };

    let hours = (now - updated_at).num_hours();
    if hours < 1 {
        "Just now".to_string()
    } else if hours < 24 {
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else if updated_at.year() != now.year() {
        updated_at.format("%b %-d, %Y").to_string()
    } else {
        updated_at.format("%b %-d").to_string()
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare date at midnight UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
