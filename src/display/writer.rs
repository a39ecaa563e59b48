use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;

use super::DisplayMessage;
use crate::error::SessionError;

/// How long `close` waits on the transport before giving up on it.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Serialized, single-in-flight write path for one connection.
///
/// Clones share the same sink. Once [`close`](Writer::close) runs, or a send
/// fails, every later send returns [`SessionError::ConnectionClosed`]. A send
/// already waiting on the transport is cut short by `close`.
pub struct Writer<S> {
    sink: Arc<Mutex<Option<S>>>,
    closing: Arc<watch::Sender<bool>>,
}

impl<S> Clone for Writer<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            closing: self.closing.clone(),
        }
    }
}

impl<S> Writer<S> {
    pub fn new(sink: S) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            sink: Arc::new(Mutex::new(Some(sink))),
            closing: Arc::new(closing),
        }
    }

    /// Whether the writer has been closed or its transport has failed.
    pub fn is_closed(&self) -> bool {
        *self.closing.borrow()
    }

    /// Drop the sink without a close handshake, if nobody is mid-send.
    pub(crate) fn abandon(&self) {
        self.closing.send_replace(true);
        if let Ok(mut guard) = self.sink.try_lock() {
            guard.take();
        }
    }
}

/// Resolves once the close flag is raised.
async fn closed(mut closing: watch::Receiver<bool>) {
    let _ = closing.wait_for(|closed| *closed).await;
}

impl<S> Writer<S>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    /// Encode and transmit one message as a single text frame.
    pub async fn send(&self, message: &DisplayMessage) -> Result<(), SessionError> {
        let text = message.to_json().map_err(|source| SessionError::Encode {
            topic: message.topic(),
            source,
        })?;

        let mut guard = tokio::select! {
            guard = self.sink.lock() => guard,
            _ = closed(self.closing.subscribe()) => return Err(SessionError::ConnectionClosed),
        };
        if self.is_closed() {
            return Err(SessionError::ConnectionClosed);
        }
        let sink = guard.as_mut().ok_or(SessionError::ConnectionClosed)?;

        let sent = tokio::select! {
            sent = sink.send(Message::Text(text.into())) => sent,
            _ = closed(self.closing.subscribe()) => return Err(SessionError::ConnectionClosed),
        };
        if let Err(e) = sent {
            guard.take();
            self.closing.send_replace(true);
            return Err(SessionError::Transport(e.to_string()));
        }
        Ok(())
    }

    /// Close the connection, cutting short any send in progress. Closing
    /// twice is a no-op.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.closing.send_replace(true);
        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        match timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(result) => result.map_err(|e| SessionError::Transport(e.to_string())),
            Err(_) => Err(SessionError::Transport("close timed out".to_string())),
        }
    }
}
