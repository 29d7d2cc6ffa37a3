use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{MediaChunk, RealtimeInputMessage, ServerMessage, SessionSetup, SetupMessage};
use super::transport::{LiveConnection, LiveTransport, MediaSender};
use crate::error::InterviewError;
use crate::session::{EventSink, SessionEventKind};

pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// Websocket transport for the Gemini Live bidirectional API
#[derive(Debug, Clone)]
pub struct GeminiLiveTransport {
    endpoint: String,
    connect_timeout: Duration,
}

impl GeminiLiveTransport {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
        }
    }

    fn url(&self, api_key: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.endpoint, separator, api_key)
    }
}

impl Default for GeminiLiveTransport {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, Duration::from_secs(15))
    }
}

#[async_trait::async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn open(
        &self,
        setup: SessionSetup,
        events: EventSink,
    ) -> Result<Box<dyn LiveConnection>, InterviewError> {
        info!("Connecting to live endpoint {}", self.endpoint);

        let payload = serde_json::to_string(&SetupMessage::from_setup(&setup))
            .map_err(|e| InterviewError::TransportError(format!("failed to encode setup: {}", e)))?;

        // Connect and setup frame share one deadline
        let handshake = async {
            let (ws_stream, _) = connect_async(self.url(&setup.api_key)).await?;
            let (mut writer, reader) = ws_stream.split();
            writer.send(Message::Text(payload)).await?;
            Ok::<_, InterviewError>((writer, reader))
        };

        let (writer, reader) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                InterviewError::TransportError(format!(
                    "handshake timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })??;

        info!("Sent session setup for model {}", setup.model);

        let reader_task = tokio::spawn(read_messages(reader, events));

        Ok(Box::new(GeminiLiveConnection {
            writer: Arc::new(WsMediaSender {
                writer: Mutex::new(writer),
            }),
            reader_task: Some(reader_task),
        }))
    }
}

/// Forward inbound frames as session events until the socket ends
async fn read_messages(mut reader: SplitStream<WsStream>, events: EventSink) {
    while let Some(msg_result) = reader.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Live connection error: {}", e);
                events
                    .notify(SessionEventKind::ConnectionError(e.to_string()))
                    .await;
                return;
            }
        };

        let payload = match msg {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(frame) => {
                let reason = frame.and_then(|frame| {
                    if frame.code == CloseCode::Normal && frame.reason.is_empty() {
                        None
                    } else {
                        Some(format!("{} ({})", frame.reason, u16::from(frame.code)))
                    }
                });
                info!("Live endpoint closed the connection: {:?}", reason);
                events
                    .notify(SessionEventKind::ConnectionClosed { reason })
                    .await;
                return;
            }
            _ => continue,
        };

        match serde_json::from_slice::<ServerMessage>(&payload) {
            Ok(message) if message.is_setup_complete() => {
                debug!("Setup acknowledged");
                events.notify(SessionEventKind::ConnectionOpened).await;
            }
            Ok(message) => {
                if message.turn_complete() {
                    debug!("Model turn complete");
                }
                if message.interrupted() {
                    debug!("Model turn interrupted");
                }
                events.notify(SessionEventKind::InboundMedia(message)).await;
            }
            Err(e) => warn!("Failed to parse live message: {}", e),
        }
    }

    events
        .notify(SessionEventKind::ConnectionClosed {
            reason: Some("connection ended".to_string()),
        })
        .await;
}

struct WsMediaSender {
    writer: Mutex<WsWriter>,
}

#[async_trait::async_trait]
impl MediaSender for WsMediaSender {
    async fn send_media(&self, chunk: MediaChunk) -> Result<(), InterviewError> {
        let payload = serde_json::to_string(&RealtimeInputMessage::media(chunk))
            .map_err(|e| InterviewError::SendFailure(e.to_string()))?;

        self.writer
            .lock()
            .await
            .send(Message::Text(payload))
            .await
            .map_err(|e| InterviewError::SendFailure(e.to_string()))
    }
}

struct GeminiLiveConnection {
    writer: Arc<WsMediaSender>,
    reader_task: Option<JoinHandle<()>>,
}

impl Drop for GeminiLiveConnection {
    fn drop(&mut self) {
        // A connection dropped without close() must not leave its reader running
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl LiveConnection for GeminiLiveConnection {
    fn media_sender(&self) -> Arc<dyn MediaSender> {
        self.writer.clone()
    }

    async fn close(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }

        let close = async {
            let mut writer = self.writer.writer.lock().await;
            writer.send(Message::Close(None)).await
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, close).await {
            Ok(Ok(())) => info!("Live connection closed"),
            Ok(Err(e)) => debug!("Close frame not delivered: {}", e),
            Err(_) => debug!("Timed out sending close frame"),
        }
    }
}
