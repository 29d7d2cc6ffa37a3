use tracing::debug;

use crate::error::InterviewError;

/// A decoded block of model speech awaiting playback.
#[derive(Debug, Clone)]
pub struct InboundAudioSegment {
    /// Normalized mono samples
    pub samples: Vec<f32>,
    /// Sample rate the samples were produced at
    pub sample_rate: u32,
}

impl InboundAudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Playback duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Callback fired by an output once a scheduled segment has finished playing.
pub type OnEnded = Box<dyn FnOnce() + Send + 'static>;

/// An audio output device with its own clock and timed-start primitive.
///
/// Times are seconds on the output clock, which starts at zero when the
/// output is opened.
pub trait AudioOutput: Send + Sync {
    /// Current position of the output clock
    fn current_time(&self) -> f64;

    /// Play `segment` starting exactly at `start_time`, then call `on_ended`.
    fn schedule(
        &self,
        segment: InboundAudioSegment,
        start_time: f64,
        on_ended: OnEnded,
    ) -> Result<(), InterviewError>;

    /// Release the device. Pending segments never fire `on_ended`.
    fn close(&self);
}

/// Opens one output per session.
pub trait AudioOutputProvider: Send + Sync {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>, InterviewError>;
}

/// Where a segment landed on the output timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSegment {
    pub start: f64,
    pub end: f64,
}

/// Gapless sequential playback driven purely by timestamps.
///
/// The cursor is the earliest time the next segment may start. Each enqueued
/// segment starts at `max(now, cursor)` and pushes the cursor to its end, so
/// bursty arrivals play back-to-back without overlap and without an
/// in-memory queue of pending segments.
pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    cursor: f64,
    speaking: bool,
    epsilon: f64,
}

impl PlaybackScheduler {
    /// `epsilon` is the slack, in seconds, allowed when deciding that the
    /// output clock has caught up with the cursor.
    pub fn new(output: Box<dyn AudioOutput>, epsilon: f64) -> Self {
        Self {
            output,
            cursor: 0.0,
            speaking: false,
            epsilon: epsilon.max(0.0),
        }
    }

    pub fn enqueue(
        &mut self,
        segment: InboundAudioSegment,
        on_ended: OnEnded,
    ) -> Result<ScheduledSegment, InterviewError> {
        let now = self.output.current_time();
        let start = now.max(self.cursor);
        let duration = segment.duration_secs();

        self.output.schedule(segment, start, on_ended)?;

        self.cursor = start + duration;
        self.speaking = true;

        debug!(
            "Scheduled {:.3}s segment at {:.3}s (cursor {:.3}s)",
            duration, start, self.cursor
        );

        Ok(ScheduledSegment {
            start,
            end: self.cursor,
        })
    }

    /// Completion check for a finished segment.
    ///
    /// Speaking turns false once the output clock is within `epsilon` of
    /// the cursor. The slack covers completion callbacks that fire just
    /// before the clock reports the segment's end, which would otherwise
    /// leave the flag stuck true after the last segment. A trailing segment
    /// shorter than `epsilon` plays with the flag already false. Returns
    /// the resulting speaking flag.
    pub fn on_segment_ended(&mut self) -> bool {
        if self.speaking && self.output.current_time() + self.epsilon >= self.cursor {
            debug!("Playback caught up with cursor at {:.3}s", self.cursor);
            self.speaking = false;
        }
        self.speaking
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn current_time(&self) -> f64 {
        self.output.current_time()
    }

    /// Reset the timeline and release the output. Only used on session teardown.
    pub fn close(&mut self) {
        self.cursor = 0.0;
        self.speaking = false;
        self.output.close();
    }
}
