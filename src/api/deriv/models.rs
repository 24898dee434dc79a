use serde::{Deserialize, Serialize};

/// `{"authorize": "<token>"}`
#[derive(Clone, Serialize, PartialEq)]
pub struct AuthorizeRequest {
    pub authorize: String,
}

impl std::fmt::Debug for AuthorizeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizeRequest")
            .field("authorize", &"<redacted>")
            .finish()
    }
}

/// Markup statistics request for one date window
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarkupStatisticsRequest {
    pub app_markup_statistics: u8,
    pub date_from: String,
    pub date_to: String,
    pub loginid: String,
    pub req_id: u32,
}

/// Every frame this client sends
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum OutboundMessage {
    Authorize(AuthorizeRequest),
    MarkupStatistics(MarkupStatisticsRequest),
}

/// Envelope shared by every inbound frame; `msg_type` discriminates
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub msg_type: Option<String>,
    pub req_id: Option<u32>,
    pub echo_req: Option<EchoRequest>,
    pub app_markup_statistics: Option<MarkupStatistics>,
    pub error: Option<ErrorPayload>,
}

/// The part of the request the server echoes back
#[derive(Debug, Clone, Deserialize)]
pub struct EchoRequest {
    pub date_from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkupStatistics {
    pub breakdown: Option<Vec<BreakdownEntry>>,
}

/// Per-application slice of the markup totals
#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownEntry {
    pub app_id: Option<u64>,
    pub app_markup_usd: Option<f64>,
    pub transactions_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub code: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}
