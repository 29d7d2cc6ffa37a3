// Tests for gapless playback scheduling
//
// A fake output clock is advanced by hand so start times and the speaking
// flag can be checked exactly.

mod common;

use common::FakeOutput;
use interview_live::audio::{InboundAudioSegment, PlaybackScheduler};
use interview_live::InterviewError;

const RATE: u32 = 24_000;

fn segment(duration_secs: f64) -> InboundAudioSegment {
    InboundAudioSegment::new(vec![0.1; (duration_secs * RATE as f64) as usize], RATE)
}

fn noop() -> Box<dyn FnOnce() + Send> {
    Box::new(|| {})
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_segment_duration() {
    assert_close(segment(0.5).duration_secs(), 0.5);
    assert_close(InboundAudioSegment::new(vec![0.0; 2400], RATE).duration_secs(), 0.1);
    assert_close(InboundAudioSegment::new(vec![0.0; 10], 0).duration_secs(), 0.0);
}

#[test]
fn test_segments_play_back_to_back_despite_jitter() -> Result<(), InterviewError> {
    let output = FakeOutput::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(output.clone()), 0.0);

    output.set_time(1.0);
    let first = scheduler.enqueue(segment(0.5), noop())?;

    // Arrivals come faster than playback, with uneven gaps
    output.set_time(1.05);
    let second = scheduler.enqueue(segment(0.25), noop())?;
    output.set_time(1.40);
    let third = scheduler.enqueue(segment(0.75), noop())?;

    assert_close(first.start, 1.0);
    assert_close(second.start, 1.5);
    assert_close(third.start, 1.75);
    assert_close(third.end, 2.5);
    assert_close(scheduler.cursor(), 2.5);

    let scheduled = output.scheduled();
    assert_eq!(scheduled.len(), 3);
    for pair in scheduled.windows(2) {
        assert_close(pair[0].0 + pair[0].1, pair[1].0);
    }

    Ok(())
}

#[test]
fn test_segment_after_silence_starts_now() -> Result<(), InterviewError> {
    let output = FakeOutput::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(output.clone()), 0.0);

    scheduler.enqueue(segment(0.5), noop())?;

    // The model pauses; the clock moves past the cursor
    output.set_time(3.0);
    let resumed = scheduler.enqueue(segment(0.5), noop())?;

    assert_close(resumed.start, 3.0);
    assert_close(scheduler.cursor(), 3.5);
    Ok(())
}

#[test]
fn test_speaking_flag_follows_output_clock() -> Result<(), InterviewError> {
    let output = FakeOutput::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(output.clone()), 0.0);

    assert!(!scheduler.is_speaking());

    scheduler.enqueue(segment(0.5), noop())?;
    assert!(scheduler.is_speaking(), "speaking starts on first enqueue");
    scheduler.enqueue(segment(0.5), noop())?;

    // First segment ends while the second is still scheduled
    output.set_time(0.5);
    assert!(scheduler.on_segment_ended());

    // Clock reaches the cursor
    output.set_time(1.0);
    assert!(!scheduler.on_segment_ended());
    assert!(!scheduler.is_speaking());
    Ok(())
}

#[test]
fn test_speaking_epsilon_absorbs_clock_lag() -> Result<(), InterviewError> {
    let output = FakeOutput::default();
    let mut strict = PlaybackScheduler::new(Box::new(output.clone()), 0.0);
    let mut tolerant = PlaybackScheduler::new(Box::new(output.clone()), 0.02);

    strict.enqueue(segment(0.5), noop())?;
    tolerant.enqueue(segment(0.5), noop())?;

    // Completion fires a few milliseconds before the clock reports the end
    output.set_time(0.495);
    assert!(strict.on_segment_ended());
    assert!(!tolerant.on_segment_ended());
    Ok(())
}

#[test]
fn test_trailing_segment_shorter_than_epsilon_reads_as_silent() -> Result<(), InterviewError> {
    let output = FakeOutput::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(output.clone()), 0.02);

    scheduler.enqueue(segment(0.5), noop())?;
    // 240 samples: 10ms, inside the epsilon window
    scheduler.enqueue(InboundAudioSegment::new(vec![0.1; 240], RATE), noop())?;
    assert!((scheduler.cursor() - 0.51).abs() < 1e-9);

    // The first segment ends while the short one is still playing
    output.set_time(0.5);
    assert!(!scheduler.on_segment_ended());

    // A longer tail keeps the flag up
    let mut longer = PlaybackScheduler::new(Box::new(output.clone()), 0.02);
    output.set_time(0.0);
    longer.enqueue(segment(0.5), noop())?;
    longer.enqueue(segment(0.05), noop())?;
    output.set_time(0.5);
    assert!(longer.on_segment_ended());
    Ok(())
}

#[test]
fn test_close_resets_cursor_and_releases_output() -> Result<(), InterviewError> {
    let output = FakeOutput::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(output.clone()), 0.0);

    scheduler.enqueue(segment(1.0), noop())?;
    assert!(scheduler.cursor() > 0.0);

    scheduler.close();

    assert_eq!(scheduler.cursor(), 0.0);
    assert!(!scheduler.is_speaking());
    assert!(output.closed.load(std::sync::atomic::Ordering::SeqCst));
    Ok(())
}
