use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageResult, RgbImage};

/// Map a `0.0..=1.0` quality factor onto the encoder's `1..=100` scale.
pub fn quality_percent(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 50;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Draw `frame` onto a `width`x`height` canvas and JPEG-compress it.
pub fn compress_frame(frame: &RgbImage, width: u32, height: u32, quality: u8) -> ImageResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
        if frame.dimensions() == (width, height) {
            encoder.encode_image(frame)?;
        } else {
            let canvas = imageops::resize(frame, width, height, FilterType::Triangle);
            encoder.encode_image(&canvas)?;
        }
    }

    Ok(jpeg)
}
