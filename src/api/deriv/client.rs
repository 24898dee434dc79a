use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::models::OutboundMessage;
use crate::utils::AppError;

pub type DerivWsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `wss://host/websockets/v3?app_id=123`. The configured URL is kept as
/// given; a bare host needs its trailing `/` to stay a valid request target.
pub fn ws_endpoint(base_url: &str, app_id: u64) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}app_id={}", base_url, separator, app_id)
}

/// Open the streaming connection
pub async fn connect_stream(base_url: &str, app_id: u64) -> Result<DerivWsStream, AppError> {
    let ws_config = WebSocketConfig {
        max_message_size: Some(16 << 20),
        max_frame_size: Some(4 << 20),
        ..Default::default()
    };

    let endpoint = ws_endpoint(base_url, app_id);
    debug!("Connecting to {}", endpoint);
    let (stream, _) = connect_async_with_config(endpoint, Some(ws_config), false).await?;
    Ok(stream)
}

/// Serialize and send one frame
pub async fn send_message(
    stream: &mut DerivWsStream,
    message: &OutboundMessage,
) -> Result<(), AppError> {
    let payload = serde_json::to_string(message)?;
    stream.send(Message::Text(payload)).await?;
    Ok(())
}
