use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Response from the CurrencyAPI `latest` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyApiResponse {
    pub meta: Option<CurrencyApiMeta>,
    pub data: Option<HashMap<String, CurrencyApiValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyApiMeta {
    pub last_updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyApiValue {
    pub code: Option<String>,
    pub value: f64,
}

/// Response from the keyless exchangerate-api `latest/<BASE>` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateApiResponse {
    pub base: Option<String>,
    pub date: Option<String>,
    pub rates: HashMap<String, f64>,
}

/// Error response body some rate services send with 4xx codes
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Everything that can go wrong talking to a rate service
#[derive(Debug, Clone, Error)]
pub enum RateApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Rate Limited: {0}")]
    RateLimited(String),
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
    #[error("Currency '{0}' missing from response")]
    MissingCurrency(String),
    #[error("Invalid rate value: {0}")]
    InvalidValue(f64),
    #[error("Source not configured: {0}")]
    NotConfigured(String),
}
