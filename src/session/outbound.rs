use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use super::events::{EventSink, SessionEventKind};
use crate::error::InterviewError;
use crate::live::{MediaChunk, MediaSender};

/// Fire-and-forget media sends with bounded concurrency.
///
/// Each message gets its own task so capture never waits on the network.
/// When every permit is taken the message is dropped rather than queued.
/// Failures come back to the controller as `SendFailed` events.
pub struct OutboundDispatcher {
    sender: Arc<dyn MediaSender>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
    events: EventSink,
}

impl OutboundDispatcher {
    pub fn new(sender: Arc<dyn MediaSender>, max_in_flight: usize, events: EventSink) -> Self {
        Self {
            sender,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: JoinSet::new(),
            events,
        }
    }

    pub fn dispatch(&mut self, chunk: MediaChunk) -> Result<(), InterviewError> {
        // Reap finished sends so the set stays bounded by in-flight work
        while self.tasks.try_join_next().is_some() {}

        let permit = Arc::clone(&self.permits).try_acquire_owned().map_err(|_| {
            InterviewError::SendFailure(format!(
                "too many sends in flight, dropped {} frame",
                chunk.mime_type
            ))
        })?;

        let sender = Arc::clone(&self.sender);
        let events = self.events.clone();
        self.tasks.spawn(async move {
            let mime_type = chunk.mime_type.clone();
            if let Err(e) = sender.send_media(chunk).await {
                events.notify(SessionEventKind::SendFailed(format!("{}: {}", mime_type, e))).await;
            }
            drop(permit);
        });

        Ok(())
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Abort every in-flight send without waiting for it
    pub fn shutdown(&mut self) {
        if !self.tasks.is_empty() {
            debug!("Abandoning {} in-flight sends", self.tasks.len());
        }
        self.tasks.abort_all();
        self.tasks.detach_all();
    }
}
