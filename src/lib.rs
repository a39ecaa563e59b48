//! # Arena Display - live field status for FTA displays
//!
//! Pushes arena status to connected diagnostic displays over WebSocket as it
//! changes, instead of having them poll.
//!
//! ## Pieces
//!
//! - **Topic hub**: per-topic fan-out of notifications (`status`, `reload`)
//! - **Arena**: owns the live status and publishes on every change
//! - **Display sessions**: one per client, merging topics into a single
//!   outbound stream while watching the inbound side for disconnects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arena_display::{client, config::DisplayConfig, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DisplayConfig::default();
//!     tokio::spawn(async move { server::start(&config).await });
//!
//!     let mut viewer = client::connect("ws://127.0.0.1:8080/displays/fta/websocket").await?;
//!     while let Some(message) = viewer.next_message().await {
//!         println!("{}", message?.message_type());
//!     }
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod hub;
pub mod logging;
pub mod server;

// Re-export main types for library consumers
pub use arena::{Arena, ArenaStatus, SnapshotProvider};
pub use display::{DisplayMessage, DisplaySession, SessionPhase, SessionReport};
pub use error::{SessionError, Termination};
pub use hub::{Listener, Topic, TopicHub};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
