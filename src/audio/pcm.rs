//! Conversion between normalized `f32` samples and signed 16-bit
//! little-endian PCM bytes.

use crate::error::InterviewError;

/// Sample rate of microphone audio sent to the model.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of synthesized speech received from the model.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Convert one normalized sample to a signed 16-bit value.
///
/// Positive samples scale by 32767 and negative ones by 32768 so that both
/// ends of `[-1.0, 1.0]` map onto the full `i16` range. NaN maps to silence.
pub fn to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round() as i16
}

/// Encode normalized samples as 16-bit little-endian PCM.
pub fn encode(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| to_i16(s).to_le_bytes())
        .collect()
}

/// Decode 16-bit little-endian PCM into normalized samples.
///
/// The buffer must hold at least one sample and an even number of bytes.
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>, InterviewError> {
    if bytes.is_empty() {
        return Err(InterviewError::MalformedAudioData(
            "empty PCM buffer".to_string(),
        ));
    }
    if bytes.len() % 2 != 0 {
        return Err(InterviewError::MalformedAudioData(format!(
            "PCM buffer has odd length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}
