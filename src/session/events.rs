use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::capture::{AudioChunk, MediaSink, VideoFrame};
use crate::error::InterviewError;
use crate::live::{LiveConnection, ServerMessage};

/// Identity of one interview call. Events from a superseded session carry
/// an old id and are ignored by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A connection whose handshake finished on the background open task.
pub struct OpenedConnection(Box<dyn LiveConnection>);

impl OpenedConnection {
    pub fn new(connection: Box<dyn LiveConnection>) -> Self {
        Self(connection)
    }

    pub fn into_inner(self) -> Box<dyn LiveConnection> {
        self.0
    }
}

impl fmt::Debug for OpenedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpenedConnection")
    }
}

/// Everything that can happen to a session, delivered to a single handler.
#[derive(Debug)]
pub enum SessionEventKind {
    /// A microphone chunk is ready to send
    CaptureAudio(AudioChunk),
    /// A camera frame is ready to send
    CaptureVideo(VideoFrame),
    /// A message arrived from the remote model
    InboundMedia(ServerMessage),
    /// The open task finished connecting and sent the setup
    HandshakeCompleted(Result<OpenedConnection, InterviewError>),
    /// The remote endpoint acknowledged the session setup
    ConnectionOpened,
    /// The remote endpoint closed the connection
    ConnectionClosed { reason: Option<String> },
    /// The connection failed
    ConnectionError(String),
    /// A scheduled playback segment finished
    PlaybackEnded,
    /// An outbound media send failed
    SendFailed(String),
}

impl SessionEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEventKind::CaptureAudio(_) => "capture-audio",
            SessionEventKind::CaptureVideo(_) => "capture-video",
            SessionEventKind::InboundMedia(_) => "inbound-media",
            SessionEventKind::HandshakeCompleted(_) => "handshake-completed",
            SessionEventKind::ConnectionOpened => "connection-opened",
            SessionEventKind::ConnectionClosed { .. } => "connection-closed",
            SessionEventKind::ConnectionError(_) => "connection-error",
            SessionEventKind::PlaybackEnded => "playback-ended",
            SessionEventKind::SendFailed(_) => "send-failed",
        }
    }
}

#[derive(Debug)]
pub struct SessionEvent {
    pub session: SessionId,
    pub kind: SessionEventKind,
}

/// Session-scoped handle onto the controller's event queue.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSink {
    pub fn new(session: SessionId, tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver an event if there is room, otherwise drop it.
    ///
    /// Used for captured media, which must never queue up behind a slow
    /// handler. Returns whether the event was accepted.
    pub fn emit(&self, kind: SessionEventKind) -> bool {
        match self.tx.try_send(self.event(kind)) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!("Event queue full, dropping {}", event.kind.name());
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Deliver an event from synchronous code without ever dropping it.
    ///
    /// Falls back to a spawned send when the queue is full; must be called
    /// from within a tokio runtime.
    pub fn emit_reliable(&self, kind: SessionEventKind) {
        match self.tx.try_send(self.event(kind)) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(event).await;
                });
            }
        }
    }

    /// Deliver an event, waiting for room in the queue.
    pub async fn notify(&self, kind: SessionEventKind) {
        let _ = self.tx.send(self.event(kind)).await;
    }

    fn event(&self, kind: SessionEventKind) -> SessionEvent {
        SessionEvent {
            session: self.session,
            kind,
        }
    }
}

impl MediaSink for EventSink {
    fn on_audio(&self, chunk: AudioChunk) {
        self.emit(SessionEventKind::CaptureAudio(chunk));
    }

    fn on_video(&self, frame: VideoFrame) {
        self.emit(SessionEventKind::CaptureVideo(frame));
    }
}
