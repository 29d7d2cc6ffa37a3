use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::{interviewer_instruction, SessionConfig};
use super::events::{EventSink, OpenedConnection, SessionEvent, SessionEventKind, SessionId};
use super::outbound::OutboundDispatcher;
use super::state::{ConnectionState, SessionView};
use super::stats::SessionStats;
use crate::audio::{pcm, AudioOutputProvider, InboundAudioSegment, PlaybackScheduler};
use crate::capture::{AudioChunk, CapturePipeline, DeviceProvider, VideoFrame};
use crate::error::InterviewError;
use crate::live::{
    from_transport_text, to_transport_text, LiveConnection, LiveTransport, MediaChunk,
    ResponseModality, ServerMessage, SessionSetup,
};

/// State of the duplex connection behind a session
enum Link {
    /// Handshake still running on its own task
    Opening(JoinHandle<()>),
    Open {
        connection: Box<dyn LiveConnection>,
        outbound: OutboundDispatcher,
    },
}

/// One interview call. Created by `connect`, destroyed by teardown.
struct Session {
    id: SessionId,
    role: String,
    capture: CapturePipeline,
    playback: PlaybackScheduler,
    link: Link,
    /// The endpoint acknowledged the setup (may precede the handshake result)
    acknowledged: bool,
    events: EventSink,
}

/// Owns the live connection and orchestrates capture, transport and
/// playback for at most one session at a time.
///
/// All state is mutated from a single context: `connect`, `disconnect` and
/// `handle_event` take `&mut self`, and every asynchronous source (the open
/// handshake, capture, network reader, send tasks, playback completion)
/// reports back through the event queue.
pub struct SessionController {
    config: SessionConfig,
    transport: Arc<dyn LiveTransport>,
    devices: Arc<dyn DeviceProvider>,
    outputs: Arc<dyn AudioOutputProvider>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    state: ConnectionState,
    session: Option<Session>,
    next_session: u64,
    view: watch::Sender<SessionView>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn LiveTransport>,
        devices: Arc<dyn DeviceProvider>,
        outputs: Arc<dyn AudioOutputProvider>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let (view, _) = watch::channel(SessionView::default());

        Self {
            config,
            transport,
            devices,
            outputs,
            events_tx,
            events_rx,
            state: ConnectionState::Idle,
            session: None,
            next_session: 1,
            view,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Id of the live session, if any
    pub fn current_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id)
    }

    /// Snapshot of the presentation read model
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// The playback cursor; zero when no session exists
    pub fn playback_cursor(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(0.0, |session| session.playback.cursor())
    }

    /// Start an interview for `role`. Valid only from `Idle`.
    ///
    /// Credential, output and device failures are returned directly. Once
    /// the devices are held the handshake runs on its own task and this
    /// returns with the controller `Connecting`; the handshake result and
    /// the endpoint's acknowledgement arrive later as events.
    pub async fn connect(&mut self, role: &str) -> Result<(), InterviewError> {
        if self.state != ConnectionState::Idle {
            warn!("Ignoring connect while {}", self.state);
            return Err(InterviewError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;

        let interview_id = format!("interview-{}", Uuid::new_v4());
        info!("Starting {} ({}) for role: {}", interview_id, id, role);

        self.state = ConnectionState::Connecting;
        self.view.send_modify(|view| {
            *view = SessionView {
                interview_id: Some(interview_id),
                role: Some(role.to_string()),
                stats: SessionStats {
                    started_at: Some(Utc::now()),
                    ..SessionStats::default()
                },
                ..SessionView::default()
            };
            view.set_state(ConnectionState::Connecting);
            view.push_log(format!("Connecting to interviewer for role: {}", role));
        });

        match self.open_session(id, role).await {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn open_session(&self, id: SessionId, role: &str) -> Result<Session, InterviewError> {
        let api_key = self
            .config
            .credential()
            .ok_or(InterviewError::MissingCredential)?
            .to_string();

        let output = self.outputs.open(self.config.playback_sample_rate)?;
        let mut playback =
            PlaybackScheduler::new(output, self.config.speaking_epsilon.as_secs_f64());

        let capture =
            match CapturePipeline::acquire(self.devices.as_ref(), self.config.capture.clone()).await {
                Ok(capture) => capture,
                Err(err) => {
                    playback.close();
                    return Err(err);
                }
            };

        let events = EventSink::new(id, self.events_tx.clone());
        let setup = SessionSetup {
            api_key,
            model: self.config.model.clone(),
            voice: self.config.voice.clone(),
            system_instruction: interviewer_instruction(role),
            response_modality: ResponseModality::Audio,
        };

        let transport = Arc::clone(&self.transport);
        let handshake_events = events.clone();
        let handshake = tokio::spawn(async move {
            let result = transport
                .open(setup, handshake_events.clone())
                .await
                .map(OpenedConnection::new);
            handshake_events
                .notify(SessionEventKind::HandshakeCompleted(result))
                .await;
        });

        Ok(Session {
            id,
            role: role.to_string(),
            capture,
            playback,
            link: Link::Opening(handshake),
            acknowledged: false,
            events,
        })
    }

    /// End the session from any non-`Idle` state, including a pending
    /// handshake. No-op when `Idle`.
    pub async fn disconnect(&mut self) {
        if self.state == ConnectionState::Idle {
            return;
        }

        self.state = ConnectionState::Closing;
        self.view
            .send_modify(|view| view.set_state(ConnectionState::Closing));

        let role = self.session.as_ref().map(|session| session.role.clone());
        self.teardown().await;

        self.state = ConnectionState::Idle;
        self.view.send_modify(|view| {
            view.set_state(ConnectionState::Idle);
            view.push_log("Interview ended");
        });

        info!(
            "Interview disconnected{}",
            role.map(|r| format!(" (role: {})", r)).unwrap_or_default()
        );
    }

    /// Single entry point for every asynchronous event
    pub async fn handle_event(&mut self, event: SessionEvent) {
        match self.current_session() {
            Some(current) if current == event.session => {}
            current => {
                debug!(
                    "Ignoring stale {} from {} (current {:?})",
                    event.kind.name(),
                    event.session,
                    current
                );
                // A handshake that won the race against its abort still owns a socket
                if let SessionEventKind::HandshakeCompleted(Ok(opened)) = event.kind {
                    opened.into_inner().close().await;
                }
                return;
            }
        }

        match event.kind {
            SessionEventKind::HandshakeCompleted(result) => self.on_handshake(result).await,
            SessionEventKind::ConnectionOpened => self.on_opened().await,
            SessionEventKind::CaptureAudio(chunk) => self.on_capture_audio(chunk),
            SessionEventKind::CaptureVideo(frame) => self.on_capture_video(frame),
            SessionEventKind::InboundMedia(message) => self.on_inbound(message),
            SessionEventKind::PlaybackEnded => self.on_playback_ended(),
            SessionEventKind::SendFailed(reason) => self.on_send_failed(reason),
            SessionEventKind::ConnectionClosed { reason } => {
                let message = match reason {
                    Some(reason) => format!("connection closed by remote: {}", reason),
                    None => "connection closed by remote".to_string(),
                };
                self.fail_session(InterviewError::TransportError(message)).await;
            }
            SessionEventKind::ConnectionError(message) => {
                self.fail_session(InterviewError::TransportError(message)).await;
            }
        }
    }

    /// Wait for the next queued event
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Handle every event already queued; returns how many were handled
    pub async fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    async fn on_handshake(&mut self, result: Result<OpenedConnection, InterviewError>) {
        let opened = match result {
            Ok(opened) => opened,
            Err(err) => {
                self.fail_session(err).await;
                return;
            }
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let connection = opened.into_inner();
        let outbound = OutboundDispatcher::new(
            connection.media_sender(),
            self.config.max_in_flight_sends,
            session.events.clone(),
        );
        session.link = Link::Open {
            connection,
            outbound,
        };
        debug!("Handshake for {} complete", session.id);

        if session.acknowledged {
            self.activate().await;
        }
    }

    async fn on_opened(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("Ignoring open acknowledgement while {}", self.state);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.acknowledged = true;
        if matches!(session.link, Link::Open { .. }) {
            self.activate().await;
        }
    }

    /// Start capture once the connection is both open and acknowledged
    async fn activate(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let sink = Arc::new(session.events.clone());
        if let Err(err) = session.capture.start(sink).await {
            error!("Failed to start capture: {}", err);
            self.fail_session(err).await;
            return;
        }

        self.state = ConnectionState::Active;
        self.view.send_modify(|view| {
            view.set_state(ConnectionState::Active);
            view.push_log("Connected, interview started");
        });
        info!("Interview {} active", session.id);
    }

    fn on_capture_audio(&mut self, chunk: AudioChunk) {
        if self.state != ConnectionState::Active {
            return;
        }
        let data = to_transport_text(&pcm::encode(&chunk.samples));
        self.send(MediaChunk::audio(data, chunk.sample_rate));
    }

    fn on_capture_video(&mut self, frame: VideoFrame) {
        if self.state != ConnectionState::Active {
            return;
        }
        let data = to_transport_text(&frame.jpeg);
        self.send(MediaChunk::jpeg(data));
    }

    fn send(&mut self, chunk: MediaChunk) {
        let Some(Link::Open { outbound, .. }) = self.session.as_mut().map(|session| &mut session.link)
        else {
            return;
        };

        let is_audio = chunk.mime_type.starts_with("audio/");
        match outbound.dispatch(chunk) {
            Ok(()) => self.view.send_modify(|view| {
                if is_audio {
                    view.stats.audio_chunks_sent += 1;
                } else {
                    view.stats.video_frames_sent += 1;
                }
            }),
            Err(err) => self.on_send_failed(err.to_string()),
        }
    }

    fn on_send_failed(&mut self, reason: String) {
        warn!("Outbound send failed: {}", reason);
        self.view.send_modify(|view| {
            view.stats.send_failures += 1;
            view.push_log(format!("Send failed: {}", reason));
        });
    }

    fn on_inbound(&mut self, message: ServerMessage) {
        if self.state != ConnectionState::Active {
            debug!("Ignoring inbound message while {}", self.state);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let mut scheduled = 0u64;
        let mut malformed = 0u64;

        for payload in message.audio_payloads() {
            let samples = match from_transport_text(payload).and_then(|bytes| pcm::decode(&bytes)) {
                Ok(samples) => samples,
                Err(err) => {
                    warn!("Dropping inbound audio: {}", err);
                    malformed += 1;
                    continue;
                }
            };

            let segment = InboundAudioSegment::new(samples, self.config.playback_sample_rate);
            let events = session.events.clone();
            let on_ended = Box::new(move || events.emit_reliable(SessionEventKind::PlaybackEnded));

            match session.playback.enqueue(segment, on_ended) {
                Ok(_) => scheduled += 1,
                Err(err) => warn!("Failed to schedule playback: {}", err),
            }
        }

        if scheduled == 0 && malformed == 0 {
            return;
        }

        let speaking = session.playback.is_speaking();
        self.view.send_modify(|view| {
            view.is_speaking = speaking;
            view.stats.segments_scheduled += scheduled;
            view.stats.malformed_dropped += malformed;
        });
    }

    fn on_playback_ended(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let speaking = session.playback.on_segment_ended();
        self.view.send_if_modified(|view| {
            if view.is_speaking == speaking {
                return false;
            }
            view.is_speaking = speaking;
            true
        });
    }

    /// Record a terminal failure and return to `Idle`
    fn fail(&mut self, err: &InterviewError) {
        error!("Interview failed: {}", err);
        self.state = ConnectionState::Error;
        self.view.send_modify(|view| {
            view.set_state(ConnectionState::Error);
            view.error = Some(err.to_string());
            view.push_log(format!("Error: {}", err));
        });

        self.state = ConnectionState::Idle;
        self.view.send_modify(|view| view.set_state(ConnectionState::Idle));
    }

    /// Tear the live session down after a connection-level failure
    async fn fail_session(&mut self, err: InterviewError) {
        self.state = ConnectionState::Error;
        self.teardown().await;
        self.fail(&err);
    }

    async fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.capture.teardown().await;
        match session.link {
            Link::Opening(handshake) => handshake.abort(),
            Link::Open {
                mut connection,
                mut outbound,
            } => {
                outbound.shutdown();
                connection.close().await;
            }
        }
        session.playback.close();

        debug!("Session {} torn down", session.id);
    }

    /// Run the controller on its own task and return a handle to it
    pub fn spawn(self) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let view = self.subscribe();
        tokio::spawn(self.run(commands_rx));
        SessionHandle {
            commands: commands_tx,
            view,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Connect { role, reply }) => {
                        let _ = reply.send(self.connect(&role).await);
                    }
                    Some(SessionCommand::Disconnect { reply }) => {
                        self.disconnect().await;
                        let _ = reply.send(());
                    }
                    None => {
                        self.disconnect().await;
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
            }
        }
        debug!("Session controller stopped");
    }
}

enum SessionCommand {
    Connect {
        role: String,
        reply: oneshot::Sender<Result<(), InterviewError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// Presentation-side handle to a running controller
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub async fn connect(&self, role: impl Into<String>) -> Result<(), InterviewError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Connect {
                role: role.into(),
                reply,
            })
            .await
            .map_err(|_| controller_gone())?;
        rx.await.map_err(|_| controller_gone())?
    }

    pub async fn disconnect(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Disconnect { reply })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }
}

fn controller_gone() -> InterviewError {
    InterviewError::TransportError("session controller stopped".to_string())
}
