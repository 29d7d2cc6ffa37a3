use std::sync::Arc;

use super::messages::{MediaChunk, SessionSetup};
use crate::error::InterviewError;
use crate::session::EventSink;

/// Sends media to the remote model. Shared by concurrent send tasks.
#[async_trait::async_trait]
pub trait MediaSender: Send + Sync {
    async fn send_media(&self, chunk: MediaChunk) -> Result<(), InterviewError>;
}

/// An open duplex connection
#[async_trait::async_trait]
pub trait LiveConnection: Send + Sync {
    fn media_sender(&self) -> Arc<dyn MediaSender>;

    /// Close the connection. Bounded: never waits on in-flight sends.
    async fn close(&mut self);
}

/// Opens duplex connections to a remote conversational model.
///
/// `open` returns once the connection exists and the setup has been sent.
/// The endpoint's acknowledgement, inbound messages, and close/error
/// notifications are delivered later through `events`.
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    async fn open(
        &self,
        setup: SessionSetup,
        events: EventSink,
    ) -> Result<Box<dyn LiveConnection>, InterviewError>;
}
