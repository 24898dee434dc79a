use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::{open_token, AppError, ConfigError};

const DEFAULT_WS_URL: &str = "wss://ws.binaryws.com/websockets/v3";
const DEFAULT_CURRENCY_API_URL: &str = "https://api.currencyapi.com/v3/latest";
const DEFAULT_FALLBACK_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/{base}";
const DEFAULT_RATE: f64 = 130.0;
const DEFAULT_STATS_TIMEOUT_SECS: u64 = 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Runtime settings, read from the environment (and `.env` via dotenv)
#[derive(Clone)]
pub struct Settings {
    pub ws_url: String,
    /// App id used to open the connection
    pub app_id: u64,
    /// App id whose breakdown entry is shown on the widget
    pub markup_app_id: u64,
    pub api_token: String,
    pub login_id: String,
    pub currency_api_key: Option<String>,
    pub currency_api_url: String,
    pub fallback_rate_url: String,
    pub base_currency: String,
    pub local_currency: String,
    pub default_rate: f64,
    pub output_path: PathBuf,
    pub chart_path: PathBuf,
    pub stats_timeout: Duration,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("ws_url", &self.ws_url)
            .field("app_id", &self.app_id)
            .field("markup_app_id", &self.markup_app_id)
            .field("api_token", &"<redacted>")
            .field("login_id", &self.login_id)
            .field("currency_api_key", &self.currency_api_key.as_ref().map(|_| "<redacted>"))
            .field("currency_api_url", &self.currency_api_url)
            .field("fallback_rate_url", &self.fallback_rate_url)
            .field("base_currency", &self.base_currency)
            .field("local_currency", &self.local_currency)
            .field("default_rate", &self.default_rate)
            .field("output_path", &self.output_path)
            .field("chart_path", &self.chart_path)
            .field("stats_timeout", &self.stats_timeout)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any name -> value lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let app_id = parse_required::<u64>(&get, "DERIV_APP_ID")?;
        let markup_app_id = parse_or::<u64>(&get, "MARKUP_APP_ID", app_id)?;
        let login_id = get("DERIV_LOGIN_ID").ok_or(ConfigError::Missing("DERIV_LOGIN_ID"))?;

        let api_token = match get("DERIV_API_TOKEN") {
            Some(token) => token,
            None => {
                let sealed = get("DERIV_API_TOKEN_SEALED")
                    .ok_or(ConfigError::Missing("DERIV_API_TOKEN"))?;
                let key = get("TOKEN_ENCRYPTION_KEY")
                    .ok_or(ConfigError::Missing("TOKEN_ENCRYPTION_KEY"))?;
                open_token(&sealed, &key)?
            }
        };

        let default_rate = parse_or::<f64>(&get, "DEFAULT_RATE", DEFAULT_RATE)?;
        if !default_rate.is_finite() || default_rate <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_RATE",
                value: default_rate.to_string(),
            }
            .into());
        }

        Ok(Settings {
            ws_url: get("DERIV_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            app_id,
            markup_app_id,
            api_token,
            login_id,
            currency_api_key: get("CURRENCY_API_KEY"),
            currency_api_url: get("CURRENCY_API_URL")
                .unwrap_or_else(|| DEFAULT_CURRENCY_API_URL.to_string()),
            fallback_rate_url: get("FALLBACK_RATE_URL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_RATE_URL.to_string()),
            base_currency: get("BASE_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            local_currency: get("LOCAL_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "KES".to_string()),
            default_rate,
            output_path: get("WALLET_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("wallet.html")),
            chart_path: get("WALLET_CHART_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("markup_chart.png")),
            stats_timeout: Duration::from_secs(parse_or(
                &get,
                "STATS_TIMEOUT_SECS",
                DEFAULT_STATS_TIMEOUT_SECS,
            )?),
            http_timeout: Duration::from_secs(parse_or(
                &get,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_required<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<T, ConfigError> {
    let raw = get(name).ok_or(ConfigError::Missing(name))?;
    raw.parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
