//! Per-Connection Relay Lifecycle
//!
//! Handshake, duplex forwarding, and teardown for one client session. The
//! relay never rewrites payloads in either direction; it only observes
//! upstream event tags to drive barge-in cancellation.

use super::{
    events::{ResponseLifecycle, UpstreamEvent},
    upstream::{self, UpstreamStream},
};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use voicegate_core::realtime::{ClientCommand, SessionDescriptor};

/// Shared by both forwarding loops: the client loop forwards frames through
/// it, the upstream loop uses it for the side-channel cancellation command.
type UpstreamSink = Arc<Mutex<SplitSink<UpstreamStream, WsMessage>>>;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual relay session.
///
/// Opens the upstream connection, sends the session descriptor, and runs the
/// two forwarding loops until either side closes. An upstream handshake
/// failure is reported to the client before its channel is closed; it is
/// fatal to the session, never to the process.
#[instrument(name = "relay_session", skip_all, fields(session_id))]
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", session_id.to_string().as_str());
    info!("Client connected. Opening upstream connection...");

    let upstream = match upstream::connect(&state.config).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "Upstream handshake failed");
            let _ = socket
                .send(Message::Text(
                    error_frame("Upstream connection failed").into(),
                ))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    let voice = state.config.voice_policy().choose(&mut rand::rng());
    info!(%voice, "Session voice selected. Starting forwarding loops.");
    let descriptor = SessionDescriptor::new(
        state.instructions.as_ref().clone(),
        voice,
        state.config.turn_detection(),
    );

    if let Err(e) = run_relay(socket, upstream, descriptor).await {
        error!(error = ?e, "Relay session terminated with error");
    }
    info!("Session closed.");
}

/// Sends the session descriptor upstream, then drives the two forwarding
/// loops. Either loop ending tears the whole session down.
async fn run_relay(
    socket: WebSocket,
    upstream: UpstreamStream,
    descriptor: SessionDescriptor,
) -> Result<()> {
    let (client_tx, client_rx) = socket.split();
    let (upstream_tx, upstream_rx) = upstream.split();
    let upstream_tx: UpstreamSink = Arc::new(Mutex::new(upstream_tx));

    // The descriptor is the first outbound message on the upstream channel.
    let update = serde_json::to_string(&ClientCommand::SessionUpdate {
        session: descriptor,
    })?;
    upstream_tx
        .lock()
        .await
        .send(WsMessage::Text(update.into()))
        .await?;

    let mut client_task = tokio::spawn(forward_client_to_upstream(
        client_rx,
        upstream_tx.clone(),
    ));
    let mut upstream_task = tokio::spawn(forward_upstream_to_client(
        upstream_rx,
        client_tx,
        upstream_tx.clone(),
    ));

    tokio::select! {
        _ = &mut client_task => upstream_task.abort(),
        _ = &mut upstream_task => client_task.abort(),
    }

    let _ = upstream_tx.lock().await.close().await;
    Ok(())
}

/// Client frames are forwarded upstream verbatim, never inspected. This loop
/// holds no reference to the response lifecycle state.
async fn forward_client_to_upstream(
    mut client_rx: SplitStream<WebSocket>,
    upstream_tx: UpstreamSink,
) {
    while let Some(frame) = client_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Client channel error");
                break;
            }
        };
        if matches!(frame, Message::Close(_)) {
            info!("Client sent close frame.");
            break;
        }
        let Some(outbound) = client_frame_to_upstream(frame) else {
            continue;
        };
        if let Err(e) = upstream_tx.lock().await.send(outbound).await {
            error!(error = %e, "Failed to forward client frame upstream");
            break;
        }
    }
}

/// Upstream frames are forwarded to the client verbatim. Text frames are
/// first inspected for the event tags that drive the response lifecycle; a
/// barge-in cancellation goes out on the upstream channel before the
/// triggering frame reaches the client.
async fn forward_upstream_to_client(
    mut upstream_rx: SplitStream<UpstreamStream>,
    mut client_tx: SplitSink<WebSocket, Message>,
    upstream_tx: UpstreamSink,
) {
    // Single writer: only this loop ever touches the lifecycle state.
    let mut lifecycle = ResponseLifecycle::default();
    while let Some(frame) = upstream_rx.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                let event = UpstreamEvent::parse(&text);
                if lifecycle.on_event(&event) {
                    send_cancellation(&upstream_tx).await;
                }
                if client_tx
                    .send(Message::Text(text.as_str().into()))
                    .await
                    .is_err()
                {
                    warn!("Client channel closed while forwarding upstream frame");
                    break;
                }
            }
            Ok(WsMessage::Binary(data)) => {
                if client_tx.send(Message::Binary(data)).await.is_err() {
                    break;
                }
            }
            Ok(WsMessage::Close(_)) => {
                info!("Upstream sent close frame.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Upstream channel error");
                let _ = client_tx
                    .send(Message::Text(error_frame("Upstream connection lost").into()))
                    .await;
                break;
            }
        }
    }
    let _ = client_tx.close().await;
}

/// A cancellation-send failure is logged; forwarding of the triggering frame
/// still proceeds so the client is never left silently unresponsive.
async fn send_cancellation(upstream_tx: &UpstreamSink) {
    info!("Barge-in: speech started during an active response. Cancelling.");
    let cancel = match serde_json::to_string(&ClientCommand::ResponseCancel) {
        Ok(cancel) => cancel,
        Err(e) => {
            error!(error = %e, "Failed to serialize response.cancel");
            return;
        }
    };
    if let Err(e) = upstream_tx
        .lock()
        .await
        .send(WsMessage::Text(cancel.into()))
        .await
    {
        error!(error = %e, "Failed to send response.cancel upstream");
    }
}

fn client_frame_to_upstream(frame: Message) -> Option<WsMessage> {
    match frame {
        Message::Text(text) => Some(WsMessage::Text(text.as_str().into())),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}

/// Error-shaped frame matching the upstream error event shape, so clients
/// need only one error-handling path.
fn error_frame(message: &str) -> String {
    serde_json::json!({ "type": "error", "error": { "message": message } }).to_string()
}
