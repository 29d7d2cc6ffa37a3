use std::sync::Arc;

use crate::error::InterviewError;

/// A fixed-size block of microphone audio (16kHz mono, normalized samples)
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Normalized samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Position of this chunk in the capture stream (0-indexed)
    pub sequence: u64,
}

/// A single compressed still from the camera
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// JPEG bytes
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Position of this frame in the capture stream (0-indexed)
    pub sequence: u64,
}

/// Receives captured media. Called synchronously from capture callbacks,
/// so implementations must never block.
pub trait MediaSink: Send + Sync {
    fn on_audio(&self, chunk: AudioChunk);
    fn on_video(&self, frame: VideoFrame);
}

/// Callback handed to a microphone; receives 16kHz mono sample blocks of
/// any length.
pub type SampleCallback = Arc<dyn Fn(&[f32]) + Send + Sync>;

/// Microphone capture backend
///
/// Implementations:
/// - [`WavMicrophone`](super::WavMicrophone): plays a WAV file in real time
/// - test doubles that push samples on demand
#[async_trait::async_trait]
pub trait Microphone: Send + Sync {
    /// Start delivering samples to `on_samples`
    async fn start(&mut self, on_samples: SampleCallback) -> Result<(), InterviewError>;

    /// Stop delivering samples. Stopping a stopped microphone is a no-op.
    async fn stop(&mut self);

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Camera backend
pub trait Camera: Send + Sync {
    /// Native resolution of the live track, if known
    fn native_resolution(&self) -> Option<(u32, u32)>;

    /// The current frame, if one is available
    fn current_frame(&self) -> Option<image::RgbImage>;

    /// Stop the track and release the preview handle
    fn stop(&self);

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Devices granted by a combined microphone+camera access request
pub struct CaptureDevices {
    pub microphone: Box<dyn Microphone>,
    pub camera: Arc<dyn Camera>,
}

/// Host environment that grants device access
#[async_trait::async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Request combined microphone and camera access.
    ///
    /// Fails with [`InterviewError::DeviceAccessDenied`] when access is
    /// declined or a device is missing.
    async fn request_access(&self) -> Result<CaptureDevices, InterviewError>;
}
