//! Transport connect for the push endpoint.

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// The raw WebSocket stream for one connection.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Open a WebSocket connection to the push endpoint.
pub async fn connect(url: &str) -> Result<WsStream, TransportError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(format!("Failed to connect to {url}: {e}")))?;

    tracing::info!(url = %url, "Connected to push endpoint");
    Ok(ws_stream)
}

/// Errors on the push transport. Logged by the channel, never returned to
/// its callers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
