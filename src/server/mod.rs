pub mod api;

use anyhow::{Context as _, Result};
use colored::*;

use crate::config::DisplayConfig;

pub use api::{router, serve, AppState, DISPLAY_WS_PATH};

/// Bind the configured address and serve until Ctrl-C.
pub async fn start(config: &DisplayConfig) -> Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!(
        "{} Server running at {}",
        "✓".green(),
        format!("http://{}", addr).bright_blue()
    );
    println!(
        "  FTA display feed: {}",
        format!("ws://{}{}", addr, DISPLAY_WS_PATH).bright_white()
    );

    let state = AppState::new(config);
    serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
