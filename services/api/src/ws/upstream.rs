//! Authenticated Outbound Connection to the Upstream Realtime API
//!
//! One connection per session, established with a bounded handshake timeout.
//! Retry policy, if any, would belong to the caller; there is none here.

use crate::config::Config;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, client::IntoClientRequest},
};
use tracing::info;

pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Invalid upstream endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Timed out connecting to upstream after {0:?}")]
    Timeout(Duration),
    #[error("Upstream handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
}

/// Builds the realtime WebSocket URL from the configured HTTP(S) endpoint.
fn websocket_url(config: &Config) -> String {
    let endpoint = config.upstream_endpoint.trim_end_matches('/');
    let endpoint = endpoint
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    format!(
        "{}/openai/realtime?api-version={}&deployment={}",
        endpoint, config.api_version, config.deployment
    )
}

/// Opens the authenticated upstream connection.
///
/// Fails with [`UpstreamError`] if the transport or credential negotiation
/// does not complete within the configured timeout.
pub async fn connect(config: &Config) -> Result<UpstreamStream, UpstreamError> {
    let url = websocket_url(config);
    let mut request = url
        .clone()
        .into_client_request()
        .map_err(|e| UpstreamError::InvalidEndpoint(e.to_string()))?;
    let api_key = config.api_key.parse().map_err(|_| {
        UpstreamError::InvalidEndpoint("API key is not a valid header value".to_string())
    })?;
    request.headers_mut().insert("api-key", api_key);

    let (stream, _) = timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| UpstreamError::Timeout(config.connect_timeout))??;
    info!(deployment = %config.deployment, "Connected to upstream realtime API");
    Ok(stream)
}
