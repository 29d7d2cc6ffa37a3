use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::devices::{Microphone, SampleCallback};
use crate::error::InterviewError;

/// Samples delivered per simulated hardware callback (32ms at 16kHz)
const BLOCK_SAMPLES: usize = 512;

/// WAV file decoded to normalized mono samples at the capture rate
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioFile {
    /// Open a WAV file and convert it to mono at `target_rate`.
    ///
    /// Multi-channel audio is averaged down to mono; higher sample rates are
    /// decimated when they are an integer multiple of `target_rate`.
    pub fn open(path: impl AsRef<Path>, target_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        let mono = to_mono(&interleaved, spec.channels);
        let samples = decimate(mono, spec.sample_rate, target_rate)?;

        let duration_seconds = samples.len() as f64 / target_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz {}ch -> {}Hz mono",
            duration_seconds, spec.sample_rate, spec.channels, target_rate
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: target_rate,
            samples,
        })
    }
}

/// Average interleaved channels down to mono
fn to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Downsample by decimation (take every Nth sample)
fn decimate(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == target_rate {
        return Ok(samples);
    }

    if target_rate == 0 || source_rate < target_rate || source_rate % target_rate != 0 {
        bail!(
            "Cannot convert {}Hz audio to {}Hz (integer downsampling only)",
            source_rate,
            target_rate
        );
    }

    let ratio = (source_rate / target_rate) as usize;
    Ok(samples.into_iter().step_by(ratio).collect())
}

/// Microphone backed by a WAV file.
///
/// Plays the file in real time, then keeps the stream alive with silence so
/// the remote model still sees the candidate's turn end.
pub struct WavMicrophone {
    audio: AudioFile,
    task: Option<JoinHandle<()>>,
}

impl WavMicrophone {
    pub fn new(audio: AudioFile) -> Self {
        Self { audio, task: None }
    }

    pub fn open(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        Ok(Self::new(AudioFile::open(path, sample_rate)?))
    }
}

#[async_trait::async_trait]
impl Microphone for WavMicrophone {
    async fn start(&mut self, on_samples: SampleCallback) -> Result<(), InterviewError> {
        if self.task.is_some() {
            return Ok(());
        }

        let samples = self.audio.samples.clone();
        let block = Duration::from_secs_f64(BLOCK_SAMPLES as f64 / self.audio.sample_rate.max(1) as f64);

        self.task = Some(tokio::spawn(async move {
            let silence = vec![0.0f32; BLOCK_SAMPLES];
            let mut blocks = samples.chunks(BLOCK_SAMPLES);
            let mut ticker = tokio::time::interval(block);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match blocks.next() {
                    Some(block) => on_samples(block),
                    None => on_samples(&silence),
                }
            }
        }));

        info!("WAV microphone started: {}", self.audio.path);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("WAV microphone stopped");
        }
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
