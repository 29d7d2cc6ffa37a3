pub mod output;
pub mod pcm;
pub mod playback;

pub use output::{ClockedOutput, ClockedOutputProvider};
pub use pcm::{CAPTURE_SAMPLE_RATE, PLAYBACK_SAMPLE_RATE};
pub use playback::{
    AudioOutput, AudioOutputProvider, InboundAudioSegment, OnEnded, PlaybackScheduler,
    ScheduledSegment,
};
