use base64::Engine;

use crate::error::InterviewError;

/// Encode bytes as standard padded base64 without line wrapping.
pub fn to_transport_text(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode standard padded base64.
pub fn from_transport_text(text: &str) -> Result<Vec<u8>, InterviewError> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|e| InterviewError::MalformedAudioData(format!("invalid base64: {}", e)))
}
