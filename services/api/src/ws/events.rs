//! Recognized Upstream Events and Response Lifecycle Tracking
//!
//! The relay inspects only a small fixed set of upstream event tags to drive
//! barge-in handling. Everything else, including frames that fail to parse,
//! maps to [`UpstreamEvent::Opaque`] and is forwarded without a state update.

use serde::Deserialize;

/// The subset of upstream events the relay reacts to.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum UpstreamEvent {
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,
    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default)]
        response: ResponseRef,
    },
    #[serde(rename = "response.done")]
    ResponseDone,
    #[serde(rename = "response.cancelled")]
    ResponseCancelled,
    #[serde(rename = "response.failed")]
    ResponseFailed,
    /// Any other tag. Forwarded unchanged, never acted on.
    #[serde(other)]
    Opaque,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl UpstreamEvent {
    /// Parses the event tag of a raw upstream frame. Malformed or untagged
    /// frames are treated as opaque.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or(UpstreamEvent::Opaque)
    }
}

/// Whether the upstream side currently has an in-progress response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Responding,
}

/// Tracks the upstream response lifecycle for one session.
///
/// Owned exclusively by the upstream-to-client forwarding loop; the
/// client-to-upstream loop never receives a reference to it.
#[derive(Debug, Default)]
pub struct ResponseLifecycle {
    phase: Phase,
    response_id: Option<String>,
}

impl ResponseLifecycle {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    /// Applies one observed event and reports whether a barge-in cancellation
    /// must be sent upstream before the event is forwarded to the client.
    ///
    /// Returns `true` exactly when speech starts while a response is active.
    pub fn on_event(&mut self, event: &UpstreamEvent) -> bool {
        match event {
            UpstreamEvent::SpeechStarted if self.phase == Phase::Responding => {
                self.phase = Phase::Idle;
                self.response_id = None;
                true
            }
            UpstreamEvent::ResponseCreated { response } => {
                self.phase = Phase::Responding;
                self.response_id = response.id.clone();
                false
            }
            UpstreamEvent::ResponseDone
            | UpstreamEvent::ResponseCancelled
            | UpstreamEvent::ResponseFailed => {
                self.phase = Phase::Idle;
                self.response_id = None;
                false
            }
            _ => false,
        }
    }
}
