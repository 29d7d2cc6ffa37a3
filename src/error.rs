//! Error taxonomy for the interview session core.
//!
//! Device and credential failures abort a connect attempt before any network
//! resource is opened. Per-message failures (`MalformedAudioData`,
//! `SendFailure`, `OutputDevice`) are isolated and never end a healthy
//! session. `TransportError` always tears the session down.

use thiserror::Error;

use crate::session::ConnectionState;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InterviewError {
    /// The user declined microphone/camera access or no device exists.
    #[error("device access denied: {0}")]
    DeviceAccessDenied(String),

    /// No API credential is configured; no connection attempt was made.
    #[error("missing API credential (set live.api_key or GEMINI_API_KEY)")]
    MissingCredential,

    #[error("malformed audio data: {0}")]
    MalformedAudioData(String),

    /// Connection-level failure; the session is torn down.
    #[error("transport error: {0}")]
    TransportError(String),

    #[error("send failure: {0}")]
    SendFailure(String),

    #[error("audio output error: {0}")]
    OutputDevice(String),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },
}

impl InterviewError {
    /// Whether this error ends the current session or connect attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InterviewError::DeviceAccessDenied(_)
                | InterviewError::MissingCredential
                | InterviewError::TransportError(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for InterviewError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        InterviewError::TransportError(err.to_string())
    }
}
