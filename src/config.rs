use anyhow::Result;
use serde::Deserialize;

use crate::audio::PLAYBACK_SAMPLE_RATE;
use crate::capture::CaptureSettings;
use crate::live::DEFAULT_ENDPOINT;

/// Environment variable consulted when `live.api_key` is not set
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveConfig,
    pub capture: CaptureSettings,
    pub playback: PlaybackConfig,
    pub session: SessionLimits,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "interview-live".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8085,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "models/gemini-2.0-flash-exp".to_string(),
            voice: "Puck".to_string(),
            api_key: None,
            connect_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub sample_rate: u32,
    pub speaking_epsilon_ms: u64,
    pub record_path: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: PLAYBACK_SAMPLE_RATE,
            speaking_epsilon_ms: 20,
            record_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    pub max_in_flight_sends: usize,
    pub event_queue_capacity: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_in_flight_sends: 16,
            event_queue_capacity: 64,
        }
    }
}

impl Config {
    /// Load configuration from an optional file, overridden by
    /// `INTERVIEW__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;

        if cfg.live.api_key.is_none() {
            cfg.live.api_key = std::env::var(API_KEY_ENV).ok();
        }

        Ok(cfg)
    }
}
