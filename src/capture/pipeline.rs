// Capture pipeline
//
// Owns the microphone and camera for one session. Microphone blocks of any
// size are assembled into fixed-size chunks in a single bounded buffer; the
// camera is sampled on a periodic timer. Both are pushed synchronously into
// a registered sink and never queued here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::devices::{AudioChunk, Camera, DeviceProvider, MediaSink, Microphone, VideoFrame};
use super::jpeg;
use crate::audio::CAPTURE_SAMPLE_RATE;
use crate::error::InterviewError;

/// Capture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Microphone sample rate in Hz
    pub sample_rate: u32,
    /// Samples per emitted audio chunk
    pub buffer_size: usize,
    /// Period of the video frame timer
    pub video_interval_ms: u64,
    /// JPEG quality factor (0.0 to 1.0)
    pub jpeg_quality: f32,
    /// Canvas size used when the camera does not report its resolution
    pub fallback_width: u32,
    pub fallback_height: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: CAPTURE_SAMPLE_RATE,
            buffer_size: 4096,
            video_interval_ms: 1000,
            jpeg_quality: 0.5,
            fallback_width: 640,
            fallback_height: 480,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineStage {
    Acquired,
    Running,
    TornDown,
}

/// Collects microphone samples into fixed-size chunks.
struct ChunkAssembler {
    buffer: Mutex<Vec<f32>>,
    size: usize,
    sample_rate: u32,
    sequence: AtomicU64,
    sink: Arc<dyn MediaSink>,
}

impl ChunkAssembler {
    fn new(size: usize, sample_rate: u32, sink: Arc<dyn MediaSink>) -> Self {
        let size = size.max(1);
        Self {
            buffer: Mutex::new(Vec::with_capacity(size)),
            size,
            sample_rate,
            sequence: AtomicU64::new(0),
            sink,
        }
    }

    fn push(&self, samples: &[f32]) {
        let mut ready = Vec::new();
        {
            let mut buffer = self
                .buffer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            for &sample in samples {
                buffer.push(sample);
                if buffer.len() == self.size {
                    ready.push(std::mem::replace(
                        &mut *buffer,
                        Vec::with_capacity(self.size),
                    ));
                }
            }
        }

        // Emit outside the lock so a sink can never stall the next callback
        for samples in ready {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
            self.sink.on_audio(AudioChunk {
                samples,
                sample_rate: self.sample_rate,
                sequence,
            });
        }
    }
}

/// Microphone and camera capture for a single session
pub struct CapturePipeline {
    microphone: Box<dyn Microphone>,
    camera: Arc<dyn Camera>,
    settings: CaptureSettings,
    video_task: Option<JoinHandle<()>>,
    stage: PipelineStage,
}

impl CapturePipeline {
    /// Request device access from the host.
    ///
    /// Device refusal surfaces as [`InterviewError::DeviceAccessDenied`] and
    /// is not retried.
    pub async fn acquire(
        provider: &dyn DeviceProvider,
        settings: CaptureSettings,
    ) -> Result<Self, InterviewError> {
        let devices = provider.request_access().await?;

        info!(
            "Capture devices granted: microphone={}, camera={}",
            devices.microphone.name(),
            devices.camera.name()
        );

        Ok(Self {
            microphone: devices.microphone,
            camera: devices.camera,
            settings,
            video_task: None,
            stage: PipelineStage::Acquired,
        })
    }

    /// Start streaming audio chunks and video frames into `sink`
    pub async fn start(&mut self, sink: Arc<dyn MediaSink>) -> Result<(), InterviewError> {
        match self.stage {
            PipelineStage::Running => {
                warn!("Capture already running");
                return Ok(());
            }
            PipelineStage::TornDown => {
                return Err(InterviewError::DeviceAccessDenied(
                    "capture devices were already released".to_string(),
                ));
            }
            PipelineStage::Acquired => {}
        }

        let assembler = Arc::new(ChunkAssembler::new(
            self.settings.buffer_size,
            self.settings.sample_rate,
            Arc::clone(&sink),
        ));
        self.microphone
            .start(Arc::new(move |samples: &[f32]| assembler.push(samples)))
            .await?;

        self.video_task = Some(tokio::spawn(run_video_timer(
            Arc::clone(&self.camera),
            sink,
            self.settings.clone(),
        )));

        self.stage = PipelineStage::Running;

        info!(
            "Capture started ({}Hz, {} samples/chunk, video every {}ms)",
            self.settings.sample_rate, self.settings.buffer_size, self.settings.video_interval_ms
        );

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.stage == PipelineStage::Running
    }

    /// Stop the timer, the microphone and the camera. Idempotent.
    pub async fn teardown(&mut self) {
        if self.stage == PipelineStage::TornDown {
            return;
        }

        if let Some(task) = self.video_task.take() {
            task.abort();
        }
        self.microphone.stop().await;
        self.camera.stop();

        self.stage = PipelineStage::TornDown;
        info!("Capture torn down");
    }
}

async fn run_video_timer(camera: Arc<dyn Camera>, sink: Arc<dyn MediaSink>, settings: CaptureSettings) {
    let period = Duration::from_millis(settings.video_interval_ms.max(1));
    let quality = jpeg::quality_percent(settings.jpeg_quality);

    // First tick fires after one full period
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sequence = 0u64;
    loop {
        ticker.tick().await;

        let Some(frame) = camera.current_frame() else {
            continue;
        };

        let (width, height) = camera
            .native_resolution()
            .unwrap_or((settings.fallback_width, settings.fallback_height));

        match jpeg::compress_frame(&frame, width, height, quality) {
            Ok(jpeg) => {
                debug!("Captured video frame {} ({} bytes)", sequence, jpeg.len());
                sink.on_video(VideoFrame {
                    jpeg,
                    width,
                    height,
                    sequence,
                });
                sequence += 1;
            }
            Err(e) => warn!("Failed to compress video frame: {}", e),
        }
    }
}
