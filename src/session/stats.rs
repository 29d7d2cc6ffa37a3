use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one interview session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// When the session was created
    pub started_at: Option<DateTime<Utc>>,

    /// Audio chunks handed to the transport
    pub audio_chunks_sent: u64,

    /// Video frames handed to the transport
    pub video_frames_sent: u64,

    /// Inbound speech segments scheduled for playback
    pub segments_scheduled: u64,

    /// Outbound sends that failed or were dropped
    pub send_failures: u64,

    /// Inbound audio messages dropped as malformed
    pub malformed_dropped: u64,
}
