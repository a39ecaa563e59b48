//! Client side of the display feed: a websocket viewer and an admin HTTP client

pub mod admin;
pub mod viewer;

pub use admin::AdminClient;
pub use viewer::{connect, Viewer, ViewerState};
