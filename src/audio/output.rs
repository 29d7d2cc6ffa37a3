// Clock-driven playback output
//
// Stands in for a hardware output device: it keeps a monotonic clock from
// the moment it is opened, fires completion callbacks when each segment's
// scheduled end time is reached, and can record the played timeline to a
// WAV file so the model's side of the interview can be listened to later.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::pcm;
use super::playback::{AudioOutput, AudioOutputProvider, InboundAudioSegment, OnEnded};
use crate::error::InterviewError;

type Recorder = hound::WavWriter<BufWriter<File>>;

/// Writes scheduled segments to a WAV file, filling gaps with silence.
struct TimelineRecorder {
    writer: Option<Recorder>,
    sample_rate: u32,
    /// Samples written so far (position on the output timeline)
    written: u64,
}

impl TimelineRecorder {
    fn create(path: &Path, sample_rate: u32) -> Result<Self, InterviewError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec).map_err(|e| {
            InterviewError::OutputDevice(format!("failed to create {}: {}", path.display(), e))
        })?;

        Ok(Self {
            writer: Some(writer),
            sample_rate,
            written: 0,
        })
    }

    fn write_at(&mut self, start_time: f64, samples: &[f32]) -> Result<(), hound::Error> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let start_sample = (start_time * self.sample_rate as f64).round() as u64;
        while self.written < start_sample {
            writer.write_sample(0i16)?;
            self.written += 1;
        }

        for &sample in samples {
            writer.write_sample(pcm::to_i16(sample))?;
        }
        self.written += samples.len() as u64;

        Ok(())
    }

    fn finish(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize playback recording: {}", e);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Playback output timed against a tokio clock.
pub struct ClockedOutput {
    opened_at: Instant,
    recorder: Option<Arc<Mutex<TimelineRecorder>>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ClockedOutput {
    pub fn new(sample_rate: u32, record_path: Option<PathBuf>) -> Result<Self, InterviewError> {
        let recorder = match record_path {
            Some(path) => {
                info!("Recording interviewer audio to {}", path.display());
                Some(Arc::new(Mutex::new(TimelineRecorder::create(
                    &path,
                    sample_rate,
                )?)))
            }
            None => None,
        };

        Ok(Self {
            opened_at: Instant::now(),
            recorder,
            pending: Mutex::new(Vec::new()),
        })
    }
}

impl AudioOutput for ClockedOutput {
    fn current_time(&self) -> f64 {
        self.opened_at.elapsed().as_secs_f64()
    }

    fn schedule(
        &self,
        segment: InboundAudioSegment,
        start_time: f64,
        on_ended: OnEnded,
    ) -> Result<(), InterviewError> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(InterviewError::OutputDevice(format!(
                "invalid start time {}",
                start_time
            )));
        }

        let start_at = self.opened_at + Duration::from_secs_f64(start_time);
        let end_at = start_at + Duration::from_secs_f64(segment.duration_secs());
        let recorder = self.recorder.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(start_at).await;

            if let Some(recorder) = recorder {
                if let Err(e) = lock(&recorder).write_at(start_time, &segment.samples) {
                    warn!("Failed to record played segment: {}", e);
                }
            }

            tokio::time::sleep_until(end_at).await;
            on_ended();
        });

        let mut pending = lock(&self.pending);
        pending.retain(|handle| !handle.is_finished());
        pending.push(task);

        Ok(())
    }

    fn close(&self) {
        for handle in lock(&self.pending).drain(..) {
            handle.abort();
        }

        if let Some(recorder) = &self.recorder {
            lock(recorder).finish();
        }
    }
}

/// Opens a [`ClockedOutput`] per session, optionally recording to a file.
#[derive(Debug, Clone, Default)]
pub struct ClockedOutputProvider {
    record_path: Option<PathBuf>,
}

impl ClockedOutputProvider {
    pub fn new(record_path: Option<PathBuf>) -> Self {
        Self { record_path }
    }
}

impl AudioOutputProvider for ClockedOutputProvider {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>, InterviewError> {
        Ok(Box::new(ClockedOutput::new(
            sample_rate,
            self.record_path.clone(),
        )?))
    }
}
