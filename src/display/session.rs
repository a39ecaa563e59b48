use std::fmt;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, Stream};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::{multiplexer::Multiplexer, reader, DisplayMessage, Writer};
use crate::arena::SnapshotProvider;
use crate::error::Termination;
use crate::hub::{ListenerKey, Topic, TopicHub};

/// Lifecycle of a display session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Starting,
    Active,
    Closing,
    Closed,
}

/// Outcome of [`DisplaySession::run`]
#[derive(Debug)]
pub struct SessionReport {
    pub id: Uuid,
    /// What ended the session
    pub termination: Termination,
    /// Listeners actually released by teardown; a listener already closed
    /// by the hub does not count.
    pub released: usize,
    /// The multiplexer task, if it was started. Teardown does not join it;
    /// it stops on its next failed write or closed source.
    pub multiplexer: Option<JoinHandle<Termination>>,
}

/// One connected display client
pub struct DisplaySession {
    id: Uuid,
    hub: Arc<TopicHub>,
    provider: Arc<dyn SnapshotProvider>,
    topics: Vec<Topic>,
    phase: watch::Sender<SessionPhase>,
}

impl DisplaySession {
    pub fn new(hub: Arc<TopicHub>, provider: Arc<dyn SnapshotProvider>) -> Self {
        Self::with_topics(hub, provider, Topic::ALL.to_vec())
    }

    pub fn with_topics(
        hub: Arc<TopicHub>,
        provider: Arc<dyn SnapshotProvider>,
        topics: Vec<Topic>,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Starting);
        Self {
            id: Uuid::new_v4(),
            hub,
            provider,
            topics,
            phase,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Watch the session move through its phases.
    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Drive the session to completion over a split connection.
    ///
    /// Subscribes first, then sends the initial snapshot, then runs the
    /// multiplexer in its own task while the liveness reader runs here. When
    /// the reader returns, every listener is released and the connection is
    /// closed, exactly once.
    pub async fn run<Tx, Rx, E>(self, sink: Tx, stream: Rx) -> SessionReport
    where
        Tx: Sink<Message> + Unpin + Send + 'static,
        Tx::Error: fmt::Display + Send,
        Rx: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: fmt::Display + Send,
    {
        let id = self.id;
        let writer = Writer::new(sink);

        let listeners: Vec<_> = self.topics.iter().map(|t| self.hub.subscribe(*t)).collect();
        let teardown = Teardown {
            session_id: id,
            hub: self.hub.clone(),
            keys: listeners.iter().map(|l| l.key()).collect(),
            writer: writer.clone(),
            phase: self.phase,
            finished: false,
        };

        for topic in self.topics.iter().filter(|t| t.carries_snapshot()) {
            let message = DisplayMessage::for_topic(*topic, self.provider.as_ref());
            if let Err(e) = writer.send(&message).await {
                let termination = Termination::HandshakeFailed(e.to_string());
                termination.log(id);
                let released = teardown.finish().await;
                return SessionReport {
                    id,
                    termination,
                    released,
                    multiplexer: None,
                };
            }
        }

        teardown.phase.send_replace(SessionPhase::Active);
        info!(session_id = %id, topics = self.topics.len(), "display session active");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let multiplexer = Multiplexer::new(id, listeners, self.provider.clone(), writer);
        let handle = tokio::spawn(async move {
            let termination = multiplexer.run().await;
            debug!(session_id = %id, reason = %termination, "multiplexer stopped");
            let _ = shutdown_tx.send(termination.clone());
            termination
        });

        let shutdown = async move { shutdown_rx.await.unwrap_or(Termination::Aborted) };
        let termination = reader::run(id, stream, shutdown).await;
        termination.log(id);

        let released = teardown.finish().await;
        SessionReport {
            id,
            termination,
            released,
            multiplexer: Some(handle),
        }
    }
}

/// Scoped release of a session's listeners and connection
struct Teardown<S> {
    session_id: Uuid,
    hub: Arc<TopicHub>,
    keys: Vec<ListenerKey>,
    writer: Writer<S>,
    phase: watch::Sender<SessionPhase>,
    finished: bool,
}

impl<S> Teardown<S> {
    fn release_all(&self) -> usize {
        self.keys.iter().filter(|key| self.hub.release(key)).count()
    }
}

impl<S> Teardown<S>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    async fn finish(mut self) -> usize {
        self.phase.send_replace(SessionPhase::Closing);
        let released = self.release_all();
        if let Err(e) = self.writer.close().await {
            debug!(session_id = %self.session_id, error = %e, "close on broken connection");
        }
        self.finished = true;
        self.phase.send_replace(SessionPhase::Closed);
        info!(session_id = %self.session_id, released, "display session closed");
        released
    }
}

impl<S> Drop for Teardown<S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // The session future was dropped or unwound before finishing.
        let released = self.release_all();
        self.writer.abandon();
        self.phase.send_replace(SessionPhase::Closed);
        debug!(session_id = %self.session_id, released, "display session dropped");
    }
}
