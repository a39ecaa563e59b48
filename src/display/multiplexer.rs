use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::stream::{self, BoxStream, SelectAll};
use futures::{Sink, StreamExt};
use tracing::trace;
use uuid::Uuid;

use super::{DisplayMessage, Writer};
use crate::arena::SnapshotProvider;
use crate::error::Termination;
use crate::hub::{Listener, Notification, Topic};

enum SourceEvent {
    Notified(Notification),
    Closed(Topic),
}

/// Turn a listener into a stream that yields its notifications, then one
/// `Closed` marker when the hub shuts it.
fn source(listener: Listener) -> BoxStream<'static, SourceEvent> {
    stream::unfold(Some(listener), |state| async move {
        let Some(mut listener) = state else {
            return None;
        };
        match listener.recv().await {
            Some(notification) => Some((SourceEvent::Notified(notification), Some(listener))),
            None => Some((SourceEvent::Closed(listener.topic()), None)),
        }
    })
    .boxed()
}

/// Merges a session's listeners into one outbound message stream
pub struct Multiplexer<S> {
    session_id: Uuid,
    sources: SelectAll<BoxStream<'static, SourceEvent>>,
    provider: Arc<dyn SnapshotProvider>,
    writer: Writer<S>,
}

impl<S> Multiplexer<S>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    pub fn new(
        session_id: Uuid,
        listeners: Vec<Listener>,
        provider: Arc<dyn SnapshotProvider>,
        writer: Writer<S>,
    ) -> Self {
        Self {
            session_id,
            sources: stream::select_all(listeners.into_iter().map(source)),
            provider,
            writer,
        }
    }

    /// Forward notifications until a source closes or a write fails.
    pub async fn run(mut self) -> Termination {
        while let Some(event) = self.sources.next().await {
            let notification = match event {
                SourceEvent::Notified(notification) => notification,
                SourceEvent::Closed(topic) => return Termination::SourceClosed(topic),
            };

            let message = DisplayMessage::for_topic(notification.topic, self.provider.as_ref());
            if let Err(e) = self.writer.send(&message).await {
                return Termination::WriteFailed(e.to_string());
            }
            trace!(
                session_id = %self.session_id,
                topic = %notification.topic,
                sequence = notification.sequence,
                "forwarded"
            );
        }
        Termination::SourcesExhausted
    }
}
