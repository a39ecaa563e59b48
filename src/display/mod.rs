//! Display sessions: one per connected FTA display
//!
//! A session subscribes to the hub, sends the current snapshot, then runs two
//! activities over the same websocket:
//!
//! - the [`Multiplexer`] merges listener queues and is the only writer;
//! - the liveness [`reader`] discards inbound frames and notices disconnects.
//!
//! Whichever way the session ends, teardown releases every listener and then
//! closes the connection.

pub mod message;
pub mod multiplexer;
pub mod reader;
pub mod session;
pub mod writer;

pub use message::DisplayMessage;
pub use multiplexer::Multiplexer;
pub use session::{DisplaySession, SessionPhase, SessionReport};
pub use writer::Writer;
