//! Session error types and the termination taxonomy
//!
//! Every way a display session can end is a [`Termination`]. Each one maps to
//! an [`ErrorCategory`] that decides whether the ending is worth a log line.
//! Nothing here ever crosses a session boundary: the client only sees the
//! connection drop.

use std::fmt;

use uuid::Uuid;

use crate::hub::Topic;

/// Failures raised inside a single session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The write half has already been closed by teardown or a prior failure.
    #[error("connection already closed")]
    ConnectionClosed,

    /// A message could not be serialized.
    #[error("failed to encode {topic} message: {source}")]
    Encode {
        topic: Topic,
        #[source]
        source: serde_json::Error,
    },

    /// The transport refused the frame.
    #[error("websocket send failed: {0}")]
    Transport(String),
}

/// Failures decoding an inbound display message on the viewer side
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed display message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} message is missing its payload")]
    MissingPayload(Topic),
}

/// How bad an ending is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Normal ways for a client to go away; not logged above debug.
    Silent,

    /// Unexpected transport failures; logged, then cleaned up like `Silent`.
    Logged,

    /// Failed before the session became active.
    ConnectionAttempt,
}

/// Why a session (or its multiplexer) stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// End-of-stream or a close frame from the client.
    ClientClosed,

    /// Any inbound failure other than a clean close.
    ReadFailed(String),

    /// An outbound frame could not be delivered.
    WriteFailed(String),

    /// The hub closed one of the session's listeners.
    SourceClosed(Topic),

    /// The multiplexer had no listeners to wait on.
    SourcesExhausted,

    /// The multiplexer task went away without reporting.
    Aborted,

    /// The initial snapshot could not be sent.
    HandshakeFailed(String),
}

impl Termination {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Termination::ClientClosed
            | Termination::WriteFailed(_)
            | Termination::SourceClosed(_)
            | Termination::SourcesExhausted => ErrorCategory::Silent,
            Termination::ReadFailed(_) | Termination::Aborted => ErrorCategory::Logged,
            Termination::HandshakeFailed(_) => ErrorCategory::ConnectionAttempt,
        }
    }

    /// Whether this ending deserves a log line above debug level
    pub fn is_logged(&self) -> bool {
        self.category() != ErrorCategory::Silent
    }

    /// Emit the ending at the level its category calls for.
    pub fn log(&self, session_id: Uuid) {
        match self.category() {
            ErrorCategory::Silent => {
                tracing::debug!(%session_id, reason = %self, "display session ending")
            }
            ErrorCategory::Logged => {
                tracing::warn!(%session_id, reason = %self, "websocket error")
            }
            ErrorCategory::ConnectionAttempt => {
                tracing::warn!(%session_id, reason = %self, "display session failed to start")
            }
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::ClientClosed => write!(f, "client closed the connection"),
            Termination::ReadFailed(e) => write!(f, "read failed: {e}"),
            Termination::WriteFailed(e) => write!(f, "write failed: {e}"),
            Termination::SourceClosed(topic) => write!(f, "{topic} listener closed by hub"),
            Termination::SourcesExhausted => write!(f, "no listeners left"),
            Termination::Aborted => write!(f, "multiplexer task aborted"),
            Termination::HandshakeFailed(e) => write!(f, "initial snapshot send failed: {e}"),
        }
    }
}
