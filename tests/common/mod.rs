// Shared test doubles
//
// Fake devices, transport and output that let tests drive the session
// controller deterministically from a single task.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use interview_live::audio::{AudioOutput, AudioOutputProvider, InboundAudioSegment, OnEnded};
use interview_live::capture::{
    Camera, CaptureDevices, DeviceProvider, Microphone, SampleCallback,
};
use interview_live::live::{LiveConnection, LiveTransport, MediaChunk, MediaSender, SessionSetup};
use interview_live::session::{EventSink, SessionEventKind};
use interview_live::InterviewError;

// ============================================================================
// Output with a hand-driven clock
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeOutput {
    pub clock: Arc<Mutex<f64>>,
    pub scheduled: Arc<Mutex<Vec<(f64, f64)>>>,
    pub callbacks: Arc<Mutex<Vec<OnEnded>>>,
    pub closed: Arc<AtomicBool>,
}

impl FakeOutput {
    pub fn set_time(&self, t: f64) {
        *self.clock.lock().unwrap() = t;
    }

    /// (start, duration) of every scheduled segment
    pub fn scheduled(&self) -> Vec<(f64, f64)> {
        self.scheduled.lock().unwrap().clone()
    }

    /// Fire the oldest pending completion callback
    pub fn finish_next(&self) -> bool {
        let callback = {
            let mut callbacks = self.callbacks.lock().unwrap();
            if callbacks.is_empty() {
                return false;
            }
            callbacks.remove(0)
        };
        callback();
        true
    }
}

impl AudioOutput for FakeOutput {
    fn current_time(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn schedule(
        &self,
        segment: InboundAudioSegment,
        start_time: f64,
        on_ended: OnEnded,
    ) -> Result<(), InterviewError> {
        self.scheduled
            .lock()
            .unwrap()
            .push((start_time, segment.duration_secs()));
        self.callbacks.lock().unwrap().push(on_ended);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.callbacks.lock().unwrap().clear();
    }
}

#[derive(Clone, Default)]
pub struct FakeOutputProvider {
    pub output: FakeOutput,
    pub opened: Arc<AtomicUsize>,
}

impl AudioOutputProvider for FakeOutputProvider {
    fn open(&self, _sample_rate: u32) -> Result<Box<dyn AudioOutput>, InterviewError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.output.clone()))
    }
}

// ============================================================================
// Devices
// ============================================================================

/// Microphone whose samples are pushed by the test
#[derive(Clone, Default)]
pub struct FakeMicrophone {
    pub callback: Arc<Mutex<Option<SampleCallback>>>,
    pub stops: Arc<AtomicUsize>,
}

impl FakeMicrophone {
    pub fn push(&self, samples: &[f32]) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(samples);
        }
    }

    pub fn is_started(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }
}

#[async_trait::async_trait]
impl Microphone for FakeMicrophone {
    async fn start(&mut self, on_samples: SampleCallback) -> Result<(), InterviewError> {
        *self.callback.lock().unwrap() = Some(on_samples);
        Ok(())
    }

    async fn stop(&mut self) {
        if self.callback.lock().unwrap().take().is_some() {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name(&self) -> &str {
        "fake-microphone"
    }
}

/// Camera with a swappable current frame
#[derive(Default)]
pub struct FakeCamera {
    pub frame: Mutex<Option<image::RgbImage>>,
    pub resolution: Option<(u32, u32)>,
    pub stopped: AtomicBool,
}

impl FakeCamera {
    pub fn with_frame(frame: image::RgbImage, resolution: Option<(u32, u32)>) -> Self {
        Self {
            frame: Mutex::new(Some(frame)),
            resolution,
            stopped: AtomicBool::new(false),
        }
    }
}

impl Camera for FakeCamera {
    fn native_resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    fn current_frame(&self) -> Option<image::RgbImage> {
        self.frame.lock().unwrap().clone()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "fake-camera"
    }
}

#[derive(Clone, Default)]
pub struct FakeDevices {
    pub microphone: FakeMicrophone,
    pub camera: Arc<FakeCamera>,
    pub deny: bool,
    pub requests: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl DeviceProvider for FakeDevices {
    async fn request_access(&self) -> Result<CaptureDevices, InterviewError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(InterviewError::DeviceAccessDenied(
                "permission dismissed".to_string(),
            ));
        }
        Ok(CaptureDevices {
            microphone: Box::new(self.microphone.clone()),
            camera: self.camera.clone(),
        })
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
pub struct FakeSender {
    pub sent: Mutex<Vec<MediaChunk>>,
    pub fail: AtomicBool,
}

#[async_trait::async_trait]
impl MediaSender for FakeSender {
    async fn send_media(&self, chunk: MediaChunk) -> Result<(), InterviewError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(InterviewError::SendFailure("socket closed".to_string()));
        }
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }
}

pub struct FakeConnection {
    sender: Arc<FakeSender>,
    closes: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl LiveConnection for FakeConnection {
    fn media_sender(&self) -> Arc<dyn MediaSender> {
        self.sender.clone()
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    pub sender: Arc<FakeSender>,
    pub setups: Arc<Mutex<Vec<SessionSetup>>>,
    pub sinks: Arc<Mutex<Vec<EventSink>>>,
    pub closes: Arc<AtomicUsize>,
    pub refuse: bool,
    /// Acknowledge the setup immediately
    pub auto_ack: bool,
    /// Never finish the handshake
    pub stall: bool,
}

impl FakeTransport {
    pub fn acking() -> Self {
        Self {
            auto_ack: true,
            ..Self::default()
        }
    }

    pub fn stalling() -> Self {
        Self {
            stall: true,
            ..Self::default()
        }
    }

    /// A connection sharing this transport's sender and close counter
    pub fn connection(&self) -> Box<dyn LiveConnection> {
        Box::new(FakeConnection {
            sender: self.sender.clone(),
            closes: self.closes.clone(),
        })
    }

    pub fn sent(&self) -> Vec<MediaChunk> {
        self.sender.sent.lock().unwrap().clone()
    }

    pub fn last_sink(&self) -> EventSink {
        self.sinks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("transport was never opened")
    }
}

#[async_trait::async_trait]
impl LiveTransport for FakeTransport {
    async fn open(
        &self,
        setup: SessionSetup,
        events: EventSink,
    ) -> Result<Box<dyn LiveConnection>, InterviewError> {
        if self.stall {
            self.setups.lock().unwrap().push(setup);
            return std::future::pending().await;
        }
        if self.refuse {
            return Err(InterviewError::TransportError(
                "handshake rejected".to_string(),
            ));
        }
        self.setups.lock().unwrap().push(setup);
        self.sinks.lock().unwrap().push(events.clone());
        if self.auto_ack {
            events.notify(SessionEventKind::ConnectionOpened).await;
        }
        Ok(self.connection())
    }
}

/// Let spawned send tasks run to completion
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
