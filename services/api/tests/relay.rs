//! End-to-end relay tests against a mock upstream realtime endpoint.
//!
//! Each test spins up a single-connection WebSocket server standing in for
//! the upstream API, a real relay serving `/realtime`, and a real WebSocket
//! client, then drives frames through all three.

use std::{future::IntoFuture, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::tungstenite::Message;
use tracing::Level;
use voicegate_api::{config::Config, router::create_router, state::AppState};

const WAIT: Duration = Duration::from_secs(5);

type ClientStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn test_config(upstream: SocketAddr) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        upstream_endpoint: format!("http://{upstream}"),
        api_key: "test-key".to_string(),
        deployment: "gpt-realtime".to_string(),
        api_version: "2024-10-01-preview".to_string(),
        voice: Some("echo".to_string()),
        knowledge_path: PathBuf::from("knowledge.json"),
        knowledge_max_chars: 6000,
        turn_detection_threshold: 0.5,
        turn_detection_prefix_padding_ms: 300,
        turn_detection_silence_ms: 500,
        connect_timeout: Duration::from_secs(5),
        log_level: Level::INFO,
    }
}

/// A single-connection upstream stand-in. Text frames it receives are pushed
/// to the returned receiver; strings pushed to the returned sender are
/// emitted to the relay as text frames.
async fn spawn_mock_upstream() -> (
    SocketAddr,
    mpsc::UnboundedReceiver<String>,
    mpsc::UnboundedSender<String>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let (emit_tx, mut emit_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut tx, mut rx) = ws.split();
        loop {
            tokio::select! {
                inbound = rx.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let _ = seen_tx.send(text.to_string());
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                outbound = emit_rx.recv() => match outbound {
                    Some(text) => {
                        if tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });
    (addr, seen_rx, emit_tx)
}

async fn spawn_relay(upstream: SocketAddr) -> SocketAddr {
    let config = test_config(upstream);
    let state = Arc::new(AppState {
        config: Arc::new(config),
        instructions: Arc::new("You are a test assistant.".to_string()),
        knowledge_entries: 0,
    });
    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(axum::serve(listener, app).into_future());
    addr
}

async fn connect_client(relay: SocketAddr) -> ClientStream {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{relay}/realtime"))
        .await
        .expect("client failed to connect to relay");
    client
}

async fn recv_seen(seen: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(WAIT, seen.recv())
        .await
        .expect("timed out waiting for a frame at the mock upstream")
        .expect("mock upstream connection ended")
}

async fn recv_client_text(client: &mut ClientStream) -> String {
    loop {
        let frame = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for a frame at the client")
            .expect("client stream ended")
            .expect("client channel error");
        if let Message::Text(text) = frame {
            return text.to_string();
        }
    }
}

#[tokio::test]
async fn descriptor_is_the_first_upstream_message() {
    let (upstream_addr, mut seen, _emit) = spawn_mock_upstream().await;
    let relay_addr = spawn_relay(upstream_addr).await;
    let _client = connect_client(relay_addr).await;

    let first: Value = serde_json::from_str(&recv_seen(&mut seen).await).unwrap();
    assert_eq!(first["type"], "session.update");
    assert_eq!(first["session"]["voice"], "echo");
    assert_eq!(first["session"]["instructions"], "You are a test assistant.");
    assert_eq!(first["session"]["turn_detection"]["type"], "server_vad");
    assert_eq!(first["session"]["input_audio_transcription"]["model"], "whisper-1");
}

#[tokio::test]
async fn client_frames_are_forwarded_upstream_verbatim() {
    let (upstream_addr, mut seen, _emit) = spawn_mock_upstream().await;
    let relay_addr = spawn_relay(upstream_addr).await;
    let mut client = connect_client(relay_addr).await;

    let _descriptor = recv_seen(&mut seen).await;

    client
        .send(Message::Text(r#"{"type":"foo"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_seen(&mut seen).await, r#"{"type":"foo"}"#);

    // Even a frame that is not session-relevant JSON passes through as-is.
    client
        .send(Message::Text("not json at all".into()))
        .await
        .unwrap();
    assert_eq!(recv_seen(&mut seen).await, "not json at all");
}

#[tokio::test]
async fn barge_in_cancels_before_forwarding_the_trigger() {
    let (upstream_addr, mut seen, emit) = spawn_mock_upstream().await;
    let relay_addr = spawn_relay(upstream_addr).await;
    let mut client = connect_client(relay_addr).await;

    let _descriptor = recv_seen(&mut seen).await;

    let created = r#"{"type":"response.created","response":{"id":"r1"}}"#;
    emit.send(created.to_string()).unwrap();
    assert_eq!(recv_client_text(&mut client).await, created);

    let speech = r#"{"type":"input_audio_buffer.speech_started"}"#;
    emit.send(speech.to_string()).unwrap();

    // The cancellation reaches upstream, and the triggering frame still
    // reaches the client unmodified.
    let cancel: Value = serde_json::from_str(&recv_seen(&mut seen).await).unwrap();
    assert_eq!(cancel["type"], "response.cancel");
    assert_eq!(recv_client_text(&mut client).await, speech);
}

#[tokio::test]
async fn no_cancellation_without_an_active_response() {
    let (upstream_addr, mut seen, emit) = spawn_mock_upstream().await;
    let relay_addr = spawn_relay(upstream_addr).await;
    let mut client = connect_client(relay_addr).await;

    let _descriptor = recv_seen(&mut seen).await;

    // response.done with no prior response.created, then speech.
    emit.send(r#"{"type":"response.done"}"#.to_string()).unwrap();
    assert_eq!(
        recv_client_text(&mut client).await,
        r#"{"type":"response.done"}"#
    );
    emit.send(r#"{"type":"input_audio_buffer.speech_started"}"#.to_string())
        .unwrap();
    assert_eq!(
        recv_client_text(&mut client).await,
        r#"{"type":"input_audio_buffer.speech_started"}"#
    );

    // Any cancellation would have been sent upstream before the speech frame
    // was forwarded, so it would now sit ahead of this marker.
    client
        .send(Message::Text(r#"{"type":"marker"}"#.into()))
        .await
        .unwrap();
    assert_eq!(recv_seen(&mut seen).await, r#"{"type":"marker"}"#);
}

#[tokio::test]
async fn client_disconnect_tears_down_the_upstream_side() {
    let (upstream_addr, mut seen, _emit) = spawn_mock_upstream().await;
    let relay_addr = spawn_relay(upstream_addr).await;
    let mut client = connect_client(relay_addr).await;

    let _descriptor = recv_seen(&mut seen).await;

    client.close(None).await.unwrap();

    // The mock's loop exits once the relay closes the upstream channel, which
    // drops the sender and ends the stream of seen frames.
    let end = timeout(WAIT, seen.recv())
        .await
        .expect("upstream side was not torn down after client disconnect");
    assert!(end.is_none());
}

#[tokio::test]
async fn upstream_handshake_failure_is_reported_to_the_client() {
    // Nothing listens on this address; the upstream connection is refused.
    let unreachable = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = unreachable.local_addr().unwrap();
    drop(unreachable);

    let relay_addr = spawn_relay(dead_addr).await;
    let mut client = connect_client(relay_addr).await;

    let frame: Value = serde_json::from_str(&recv_client_text(&mut client).await).unwrap();
    assert_eq!(frame["type"], "error");
    assert!(
        frame["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Upstream connection failed")
    );

    // The channel then closes without any further protocol traffic.
    let next = timeout(WAIT, client.next())
        .await
        .expect("client channel was not closed after handshake failure");
    assert!(matches!(next, None | Some(Ok(Message::Close(_)))));
}
