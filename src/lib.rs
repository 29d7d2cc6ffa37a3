pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod session;

pub use audio::{
    AudioOutput, AudioOutputProvider, ClockedOutput, ClockedOutputProvider, InboundAudioSegment,
    PlaybackScheduler,
};
pub use capture::{
    AudioChunk, Camera, CaptureDevices, CapturePipeline, CaptureSettings, DeviceProvider,
    FileDevices, MediaSink, Microphone, VideoFrame,
};
pub use config::Config;
pub use error::InterviewError;
pub use http::{create_router, AppState};
pub use live::{GeminiLiveTransport, LiveConnection, LiveTransport, MediaChunk, MediaSender, ServerMessage};
pub use session::{
    ConnectionState, SessionConfig, SessionController, SessionEvent, SessionEventKind,
    SessionHandle, SessionId, SessionStats, SessionView,
};
