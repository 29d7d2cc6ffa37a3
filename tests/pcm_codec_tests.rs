// Tests for the PCM codec and transport text encoding
//
// These verify the float <-> 16-bit PCM conversion and the base64 framing
// used for every media message sent to or received from the model.

use interview_live::audio::pcm;
use interview_live::live::{from_transport_text, to_transport_text};
use interview_live::InterviewError;

#[test]
fn test_encode_full_scale_and_silence() {
    let bytes = pcm::encode(&[0.0, 1.0, -1.0]);

    assert_eq!(bytes.len(), 6);
    assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
    assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 32767);
    assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), -32768);
}

#[test]
fn test_encode_clamps_out_of_range_samples() {
    let bytes = pcm::encode(&[2.5, -7.0, f32::NAN]);

    assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
    assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MIN);
    assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), 0, "NaN should encode as silence");
}

#[test]
fn test_encode_is_little_endian() {
    // 0.5 * 32767 = 16383.5 -> 16384 = 0x4000
    let bytes = pcm::encode(&[0.5]);
    assert_eq!(bytes, vec![0x00, 0x40]);
}

#[test]
fn test_decode_divides_by_32768() -> Result<(), InterviewError> {
    let bytes: Vec<u8> = [16384i16, -32768, 0]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();

    let samples = pcm::decode(&bytes)?;
    assert_eq!(samples, vec![0.5, -1.0, 0.0]);
    Ok(())
}

#[test]
fn test_decode_rejects_odd_length() {
    let result = pcm::decode(&[0x00, 0x40, 0x01]);
    assert!(matches!(result, Err(InterviewError::MalformedAudioData(_))));
}

#[test]
fn test_decode_rejects_empty_buffer() {
    let result = pcm::decode(&[]);
    assert!(matches!(result, Err(InterviewError::MalformedAudioData(_))));
}

#[test]
fn test_round_trip_within_quantization_bound() -> Result<(), InterviewError> {
    // Typical speech magnitudes
    let original: Vec<f32> = (0..2000)
        .map(|i| 0.45 * ((i as f32) * 0.037).sin())
        .collect();

    let decoded = pcm::decode(&pcm::encode(&original))?;

    assert_eq!(decoded.len(), original.len());
    for (a, b) in original.iter().zip(&decoded) {
        assert!(
            (a - b).abs() <= 1.0 / 32768.0,
            "sample {} decoded as {}",
            a,
            b
        );
    }
    Ok(())
}

#[test]
fn test_base64_round_trip() -> Result<(), InterviewError> {
    let bytes: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

    let text = to_transport_text(&bytes);
    assert!(!text.contains('\n'), "no line wrapping");
    assert_eq!(from_transport_text(&text)?, bytes);

    assert_eq!(to_transport_text(&[]), "");
    assert_eq!(from_transport_text("")?, Vec::<u8>::new());
    Ok(())
}

#[test]
fn test_base64_keeps_padding() {
    assert_eq!(to_transport_text(b"a"), "YQ==");
    assert_eq!(to_transport_text(b"ab"), "YWI=");
}

#[test]
fn test_base64_rejects_invalid_alphabet_and_padding() {
    assert!(matches!(
        from_transport_text("not*base64!"),
        Err(InterviewError::MalformedAudioData(_))
    ));
    assert!(matches!(
        from_transport_text("YQ="),
        Err(InterviewError::MalformedAudioData(_))
    ));
}

#[test]
fn test_silent_chunk_end_to_end() -> Result<(), InterviewError> {
    let chunk = vec![0.0f32; 4096];

    let text = to_transport_text(&pcm::encode(&chunk));

    // ceil(8192 / 3) * 4
    assert_eq!(text.len(), 10924);

    let samples = pcm::decode(&from_transport_text(&text)?)?;
    assert_eq!(samples.len(), 4096);
    assert!(samples.iter().all(|&s| s == 0.0));
    Ok(())
}
