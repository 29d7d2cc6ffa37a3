use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::PLAYBACK_SAMPLE_RATE;
use crate::capture::CaptureSettings;
use crate::config::Config;
use crate::live::DEFAULT_ENDPOINT;

/// Configuration for interview sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// API credential for the live endpoint (checked at connect time)
    pub api_key: Option<String>,

    /// Live endpoint URL
    pub endpoint: String,

    /// Conversational model identifier
    pub model: String,

    /// Prebuilt voice used for synthesized speech
    pub voice: String,

    /// How long to wait for the connection handshake
    pub connect_timeout: Duration,

    /// Microphone and camera capture parameters
    pub capture: CaptureSettings,

    /// Sample rate of received speech
    pub playback_sample_rate: u32,

    /// Slack allowed when deciding playback has caught up with the cursor
    pub speaking_epsilon: Duration,

    /// Optional WAV file receiving the played-back audio
    pub record_path: Option<PathBuf>,

    /// Maximum concurrent outbound sends before frames are dropped
    pub max_in_flight_sends: usize,

    /// Capacity of the controller's event queue
    pub event_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "models/gemini-2.0-flash-exp".to_string(),
            voice: "Puck".to_string(),
            connect_timeout: Duration::from_secs(15),
            capture: CaptureSettings::default(),
            playback_sample_rate: PLAYBACK_SAMPLE_RATE,
            speaking_epsilon: Duration::from_millis(20),
            record_path: None,
            max_in_flight_sends: 16,
            event_queue_capacity: 64,
        }
    }
}

impl SessionConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_key: cfg.live.api_key.clone(),
            endpoint: cfg.live.endpoint.clone(),
            model: cfg.live.model.clone(),
            voice: cfg.live.voice.clone(),
            connect_timeout: Duration::from_secs(cfg.live.connect_timeout_secs),
            capture: cfg.capture.clone(),
            playback_sample_rate: cfg.playback.sample_rate,
            speaking_epsilon: Duration::from_millis(cfg.playback.speaking_epsilon_ms),
            record_path: cfg.playback.record_path.as_ref().map(PathBuf::from),
            max_in_flight_sends: cfg.session.max_in_flight_sends,
            event_queue_capacity: cfg.session.event_queue_capacity,
        }
    }

    /// The credential, if one is configured and non-empty
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// System instruction for the interviewer persona
pub fn interviewer_instruction(role: &str) -> String {
    format!(
        "You are an experienced HR interviewer conducting a mock interview for the role of {role}. \
         Start by greeting the candidate warmly and briefly explaining the format. \
         Ask one question at a time and wait for the candidate to finish answering before moving on. \
         Focus on soft skills, past experience, and situational questions relevant to a {role}. \
         Keep your responses concise and conversational."
    )
}
