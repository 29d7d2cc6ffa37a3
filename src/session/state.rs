use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::stats::SessionStats;

/// Lifecycle of the interview connection.
///
/// ```text
/// Idle ──connect──▶ Connecting ──opened──▶ Active ──disconnect──▶ Closing ──▶ Idle
///                   Connecting ──failure─▶ Error ──▶ Idle
///                                          Active ──remote close/error──▶ Error ──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Active,
    Closing,
    Error,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read model for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub is_speaking: bool,
    /// Most recent terminal problem
    pub error: Option<String>,
    /// Human-readable transcript of session events, oldest first
    pub logs: Vec<String>,
    /// Correlation id of the current or last interview
    pub interview_id: Option<String>,
    /// Role the current or last session interviewed for
    pub role: Option<String>,
    pub stats: SessionStats,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
            is_connected: false,
            is_speaking: false,
            error: None,
            logs: Vec::new(),
            interview_id: None,
            role: None,
            stats: SessionStats::default(),
        }
    }
}

impl SessionView {
    pub fn push_log(&mut self, message: impl AsRef<str>) {
        self.logs
            .push(format!("[{}] {}", Utc::now().format("%H:%M:%S"), message.as_ref()));
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.is_connected = state == ConnectionState::Active;
        if state != ConnectionState::Active {
            self.is_speaking = false;
        }
    }
}
