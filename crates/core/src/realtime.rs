//! Realtime Session Wire Types
//!
//! Serde types for the two messages the relay itself originates on the
//! upstream channel: the `session.update` descriptor sent during the
//! handshake and the `response.cancel` command issued on barge-in. Every
//! other frame passes through the relay untouched, so nothing else from the
//! upstream vocabulary is modeled here.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// The published realtime voices eligible for random selection.
pub const AVAILABLE_VOICES: &[&str] = &[
    "alloy", "ash", "ballad", "coral", "echo", "sage", "shimmer", "verse",
];

/// Commands the relay sends upstream on its own behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// The session descriptor, sent once as the first outbound message.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionDescriptor },
    /// Cancels the in-flight response when the user barges in.
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

/// The initial session configuration, sent verbatim during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub input_audio_transcription: AudioTranscription,
    pub turn_detection: TurnDetection,
    pub temperature: f32,
    pub max_response_output_tokens: u32,
}

impl SessionDescriptor {
    /// Builds a descriptor with the fixed audio and transcription parameters
    /// the upstream API expects for speech-to-speech sessions.
    pub fn new(instructions: String, voice: String, turn_detection: TurnDetection) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions,
            voice,
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            input_audio_transcription: AudioTranscription {
                model: "whisper-1".to_string(),
            },
            turn_detection,
            temperature: 0.7,
            max_response_output_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTranscription {
    pub model: String,
}

/// Voice-activity turn detection, performed upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad(ServerVadTurnDetection),
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self::ServerVad(ServerVadTurnDetection::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVadTurnDetection {
    /// Activation threshold for VAD (0.0 to 1.0).
    threshold: f32,

    /// Amount of audio to include before speech starts, in milliseconds.
    prefix_padding_ms: u32,

    /// Duration of silence that ends a turn, in milliseconds.
    silence_duration_ms: u32,
}

impl Default for ServerVadTurnDetection {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

impl ServerVadTurnDetection {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_prefix_padding_ms(mut self, prefix_padding_ms: u32) -> Self {
        self.prefix_padding_ms = prefix_padding_ms;
        self
    }

    pub fn with_silence_duration_ms(mut self, silence_duration_ms: u32) -> Self {
        self.silence_duration_ms = silence_duration_ms;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn prefix_padding_ms(&self) -> u32 {
        self.prefix_padding_ms
    }

    pub fn silence_duration_ms(&self) -> u32 {
        self.silence_duration_ms
    }
}

/// How the voice for a new session is picked.
#[derive(Debug, Clone)]
pub enum VoicePolicy {
    /// Always use the given voice. Deterministic.
    Fixed(String),
    /// Draw uniformly from [`AVAILABLE_VOICES`].
    Random,
}

impl VoicePolicy {
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match self {
            Self::Fixed(voice) => voice.clone(),
            Self::Random => AVAILABLE_VOICES
                .choose(rng)
                .copied()
                .unwrap_or("alloy")
                .to_string(),
        }
    }
}
