use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use super::models::{CurrencyApiResponse, ErrorResponse, ExchangeRateApiResponse, RateApiError};
use crate::models::{RateOrigin, RateQuote};

/// One link in the exchange rate fallback chain
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn origin(&self) -> RateOrigin;

    /// Fetch `1 base = N target`. The whole response is trusted or none of it.
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<RateQuote, RateApiError>;
}

/// Keyed CurrencyAPI client (primary source)
pub struct CurrencyApiClient {
    http_client: HttpClient,
    api_key: Option<String>,
    base_url: String,
}

impl CurrencyApiClient {
    pub fn new(http_client: HttpClient, api_key: Option<String>, base_url: String) -> Self {
        Self {
            http_client,
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl RateSource for CurrencyApiClient {
    fn name(&self) -> &'static str {
        "CurrencyAPI"
    }

    fn origin(&self) -> RateOrigin {
        RateOrigin::Primary
    }

    async fn fetch_rate(&self, base: &str, target: &str) -> Result<RateQuote, RateApiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RateApiError::NotConfigured("CURRENCY_API_KEY not set".to_string()))?;

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("apikey", api_key),
                ("currencies", target),
                ("base_currency", base),
            ])
            .send()
            .await
            .map_err(|e| RateApiError::RequestError(format!("Request failed: {}", e)))?;

        let body = read_success_body(response).await?;
        parse_currency_api_body(&body, target)
    }
}

/// Keyless exchangerate-api client (fallback source)
pub struct ExchangeRateApiClient {
    http_client: HttpClient,
    url_template: String,
}

impl ExchangeRateApiClient {
    /// `url_template` may contain `{base}`, replaced with the base currency
    pub fn new(http_client: HttpClient, url_template: String) -> Self {
        Self {
            http_client,
            url_template,
        }
    }

    fn endpoint(&self, base: &str) -> String {
        self.url_template.replace("{base}", base)
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiClient {
    fn name(&self) -> &'static str {
        "exchangerate-api"
    }

    fn origin(&self) -> RateOrigin {
        RateOrigin::Fallback
    }

    async fn fetch_rate(&self, base: &str, target: &str) -> Result<RateQuote, RateApiError> {
        let response = self
            .http_client
            .get(self.endpoint(base))
            .send()
            .await
            .map_err(|e| RateApiError::RequestError(format!("Request failed: {}", e)))?;

        let body = read_success_body(response).await?;
        parse_exchange_rate_api_body(&body, base, target, Utc::now())
    }
}

/// Return the body of a 2xx response, or classify the failure by status code
async fn read_success_body(response: reqwest::Response) -> Result<String, RateApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RateApiError::RequestError(format!("Failed to read body: {}", e)))?;

    if status.is_success() {
        return Ok(body);
    }

    let status_code = status.as_u16();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|err| err.message.or(err.error))
        .unwrap_or(body);

    Err(match status_code {
        401 | 403 => RateApiError::Unauthorized(message),
        429 => {
            warn!("Rate service is rate limiting us: {}", message);
            RateApiError::RateLimited(message)
        }
        500..=599 => RateApiError::ServerError(status_code, message),
        _ => RateApiError::HttpError(status_code, message),
    })
}

fn validate_value(value: f64) -> Result<f64, RateApiError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RateApiError::InvalidValue(value))
    }
}

/// `{"meta": {"last_updated_at": ...}, "data": {"KES": {"code": "KES", "value": 129.5}}}`
pub fn parse_currency_api_body(body: &str, target: &str) -> Result<RateQuote, RateApiError> {
    let parsed: CurrencyApiResponse = serde_json::from_str(body)
        .map_err(|e| RateApiError::DeserializationError(format!("Failed to parse response: {}", e)))?;

    let entry = parsed
        .data
        .as_ref()
        .and_then(|data| data.get(target))
        .ok_or_else(|| RateApiError::MissingCurrency(target.to_string()))?;

    if let Some(code) = &entry.code {
        if !code.eq_ignore_ascii_case(target) {
            return Err(RateApiError::MissingCurrency(target.to_string()));
        }
    }

    let value = validate_value(entry.value)?;
    debug!("CurrencyAPI quoted {} = {}", target, value);

    Ok(RateQuote {
        value,
        last_updated: parsed.meta.and_then(|meta| meta.last_updated_at),
    })
}

/// `{"base": "USD", "date": "2024-05-01", "rates": {"KES": 129.5, ...}}`
///
/// A response without a `date` is stamped with `fetched_at`.
pub fn parse_exchange_rate_api_body(
    body: &str,
    base: &str,
    target: &str,
    fetched_at: DateTime<Utc>,
) -> Result<RateQuote, RateApiError> {
    let parsed: ExchangeRateApiResponse = serde_json::from_str(body)
        .map_err(|e| RateApiError::DeserializationError(format!("Failed to parse response: {}", e)))?;

    if let Some(reported_base) = &parsed.base {
        if !reported_base.eq_ignore_ascii_case(base) {
            return Err(RateApiError::DeserializationError(format!(
                "expected base {}, got {}",
                base, reported_base
            )));
        }
    }

    let value = parsed
        .rates
        .get(target)
        .copied()
        .ok_or_else(|| RateApiError::MissingCurrency(target.to_string()))?;

    Ok(RateQuote {
        value: validate_value(value)?,
        last_updated: Some(
            parsed
                .date
                .unwrap_or_else(|| fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ),
    })
}
