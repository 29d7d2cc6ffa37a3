use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{info, warn};

use super::devices::{Camera, CaptureDevices, DeviceProvider};
use super::file::WavMicrophone;
use crate::error::InterviewError;

/// Camera that shows the same still image for the whole session
pub struct StillCamera {
    frame: RgbImage,
    live: AtomicBool,
}

impl StillCamera {
    pub fn new(frame: RgbImage) -> Self {
        Self {
            frame,
            live: AtomicBool::new(true),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let frame = image::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?
            .to_rgb8();

        info!(
            "Still camera loaded {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );

        Ok(Self::new(frame))
    }
}

impl Camera for StillCamera {
    fn native_resolution(&self) -> Option<(u32, u32)> {
        Some(self.frame.dimensions())
    }

    fn current_frame(&self) -> Option<RgbImage> {
        self.live
            .load(Ordering::SeqCst)
            .then(|| self.frame.clone())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "still-image"
    }
}

/// Camera track that never produces a frame
#[derive(Debug, Default)]
pub struct BlankCamera;

impl Camera for BlankCamera {
    fn native_resolution(&self) -> Option<(u32, u32)> {
        None
    }

    fn current_frame(&self) -> Option<RgbImage> {
        None
    }

    fn stop(&self) {}

    fn name(&self) -> &str {
        "blank"
    }
}

/// Device provider backed by files: a WAV for the microphone and an
/// optional image for the camera.
#[derive(Debug, Clone)]
pub struct FileDevices {
    pub wav_path: PathBuf,
    pub image_path: Option<PathBuf>,
    pub sample_rate: u32,
}

impl FileDevices {
    pub fn new(wav_path: PathBuf, image_path: Option<PathBuf>, sample_rate: u32) -> Self {
        Self {
            wav_path,
            image_path,
            sample_rate,
        }
    }
}

#[async_trait::async_trait]
impl DeviceProvider for FileDevices {
    async fn request_access(&self) -> Result<CaptureDevices, InterviewError> {
        let microphone = WavMicrophone::open(&self.wav_path, self.sample_rate)
            .map_err(|e| InterviewError::DeviceAccessDenied(format!("microphone: {:#}", e)))?;

        let camera: Arc<dyn Camera> = match &self.image_path {
            Some(path) => Arc::new(
                StillCamera::open(path)
                    .map_err(|e| InterviewError::DeviceAccessDenied(format!("camera: {:#}", e)))?,
            ),
            None => {
                warn!("No camera image configured, video frames will be skipped");
                Arc::new(BlankCamera)
            }
        };

        Ok(CaptureDevices {
            microphone: Box::new(microphone),
            camera,
        })
    }
}
