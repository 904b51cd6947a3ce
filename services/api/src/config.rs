use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use voicegate_core::realtime::{
    AVAILABLE_VOICES, ServerVadTurnDetection, TurnDetection, VoicePolicy,
};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Base HTTP(S) endpoint of the upstream realtime deployment.
    pub upstream_endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    /// Fixed session voice; unset means a random published voice per session.
    pub voice: Option<String>,
    pub knowledge_path: PathBuf,
    pub knowledge_max_chars: usize,
    pub turn_detection_threshold: f32,
    pub turn_detection_prefix_padding_ms: u32,
    pub turn_detection_silence_ms: u32,
    pub connect_timeout: Duration,
    pub log_level: Level,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let upstream_endpoint = std::env::var("AZURE_OPENAI_ENDPOINT")
            .map_err(|_| ConfigError::MissingVar("AZURE_OPENAI_ENDPOINT".to_string()))?;
        let api_key = std::env::var("AZURE_OPENAI_KEY")
            .map_err(|_| ConfigError::MissingVar("AZURE_OPENAI_KEY".to_string()))?;

        let deployment =
            std::env::var("DEPLOYMENT_NAME").unwrap_or_else(|_| "gpt-realtime".to_string());
        let api_version = std::env::var("INFERENCE_API_VERSION")
            .unwrap_or_else(|_| "2024-10-01-preview".to_string());

        let voice = std::env::var("VOICE").ok();
        if let Some(v) = &voice {
            if !AVAILABLE_VOICES.contains(&v.as_str()) {
                return Err(ConfigError::InvalidValue(
                    "VOICE".to_string(),
                    format!("'{}' is not a recognized voice", v),
                ));
            }
        }

        let knowledge_path = std::env::var("KNOWLEDGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("knowledge.json"));
        let knowledge_max_chars = parse_var("KNOWLEDGE_MAX_CHARS", 6000usize)?;

        let turn_detection_threshold = parse_var("TURN_DETECTION_THRESHOLD", 0.5f32)?;
        let turn_detection_prefix_padding_ms =
            parse_var("TURN_DETECTION_PREFIX_PADDING_MS", 300u32)?;
        let turn_detection_silence_ms = parse_var("TURN_DETECTION_SILENCE_MS", 500u32)?;

        let connect_timeout =
            Duration::from_secs(parse_var("UPSTREAM_CONNECT_TIMEOUT_SECS", 10u64)?);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            upstream_endpoint,
            api_key,
            deployment,
            api_version,
            voice,
            knowledge_path,
            knowledge_max_chars,
            turn_detection_threshold,
            turn_detection_prefix_padding_ms,
            turn_detection_silence_ms,
            connect_timeout,
            log_level,
        })
    }

    /// The per-session voice selection policy implied by the configuration.
    pub fn voice_policy(&self) -> VoicePolicy {
        match &self.voice {
            Some(voice) => VoicePolicy::Fixed(voice.clone()),
            None => VoicePolicy::Random,
        }
    }

    /// The configured turn-detection parameters for the session descriptor.
    pub fn turn_detection(&self) -> TurnDetection {
        TurnDetection::ServerVad(
            ServerVadTurnDetection::default()
                .with_threshold(self.turn_detection_threshold)
                .with_prefix_padding_ms(self.turn_detection_prefix_padding_ms)
                .with_silence_duration_ms(self.turn_detection_silence_ms),
        )
    }
}
