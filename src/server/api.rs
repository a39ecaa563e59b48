use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::ws::{WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::arena::{
    AllianceStation, Arena, ArenaStatus, MatchState, SnapshotProvider, StationStatus,
    StationUpdate,
};
use crate::config::DisplayConfig;
use crate::display::{DisplaySession, SessionPhase};
use crate::hub::{Topic, TopicHub};

pub const DISPLAY_WS_PATH: &str = "/displays/fta/websocket";

#[derive(Clone)]
pub struct AppState {
    pub arena: Arc<Arena>,
    pub hub: Arc<TopicHub>,
    pub sessions: Arc<DashMap<Uuid, watch::Receiver<SessionPhase>>>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(config: &DisplayConfig) -> Self {
        let hub = Arc::new(TopicHub::new());
        Self {
            arena: Arc::new(Arena::new(hub.clone())),
            hub,
            sessions: Arc::new(DashMap::new()),
            admin_token: config.admin_token.as_deref().map(Arc::from),
        }
    }

    /// Sessions that have sent their initial snapshot and not yet closed
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| *entry.value().borrow() == SessionPhase::Active)
            .count()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        let Some(expected) = self.admin_token.as_deref() else {
            return Ok(());
        };
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        match provided {
            Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Arena Display Server" }))
        .route("/health", get(health))
        .route(DISPLAY_WS_PATH, get(display_ws_handler))
        .route("/api/arena/status", get(arena_status))
        .route("/api/arena/stations/{station}", post(update_station))
        .route("/api/arena/match", post(update_match))
        .route("/api/displays/reload", post(reload_displays))
        .route("/api/displays/disconnect", post(disconnect_displays))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then close every listener so open
/// display sessions wind down.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let hub = state.hub.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            let closed = hub.close_all();
            info!(closed, "shutting down, disconnecting displays");
        })
        .await?;
    Ok(())
}

async fn display_ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_display_ws(state, socket))
}

async fn handle_display_ws(state: AppState, socket: WebSocket) {
    let provider: Arc<dyn SnapshotProvider> = state.arena.clone();
    let session = DisplaySession::new(state.hub.clone(), provider);
    let id = session.id();
    state.sessions.insert(id, session.phase());

    let (sender, receiver) = socket.split();
    let report = session.run(sender, receiver).await;

    state.sessions.remove(&id);
    // The multiplexer handle is dropped, not joined; the task exits on its own.
    debug!(session_id = %id, reason = %report.termination, released = report.released, "display websocket finished");
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub sessions: usize,
    pub status_listeners: usize,
    pub reload_listeners: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".to_string(),
        sessions: state.active_sessions(),
        status_listeners: state.hub.listener_count(Topic::Status),
        reload_listeners: state.hub.listener_count(Topic::Reload),
    })
}

async fn arena_status(State(state): State<AppState>) -> Json<ArenaStatus> {
    Json(state.arena.current_state())
}

async fn update_station(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(station): Path<AllianceStation>,
    Json(update): Json<StationUpdate>,
) -> Result<Json<StationStatus>, StatusCode> {
    state.authorize(&headers)?;
    Ok(Json(state.arena.update_station(station, &update)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub state: MatchState,
    #[serde(default)]
    pub match_number: Option<u32>,
}

async fn update_match(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<MatchUpdate>,
) -> Result<StatusCode, StatusCode> {
    state.authorize(&headers)?;
    state.arena.set_match_state(update.state, update.match_number);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisplayCommandReport {
    /// Listeners reached by the command
    pub listeners: usize,
}

async fn reload_displays(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DisplayCommandReport>, StatusCode> {
    state.authorize(&headers)?;
    let listeners = state.arena.reload_displays();
    info!(listeners, "reload requested");
    Ok(Json(DisplayCommandReport { listeners }))
}

async fn disconnect_displays(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DisplayCommandReport>, StatusCode> {
    state.authorize(&headers)?;
    let listeners = state.hub.close_all();
    info!(listeners, "disconnect-all requested");
    Ok(Json(DisplayCommandReport { listeners }))
}
