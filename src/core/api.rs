//! HTTP + WebSocket API for the kiosk front end
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /view - Current session view
//! - GET /sessions - Suspended VIP sessions
//! - POST /input - Touch-screen input
//! - DELETE /sessions/:vip_id - Forget a VIP
//! - WS /ws - Live views and flow events

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::core::sampler::KioskHandle;
use crate::error::KioskError;
use crate::types::{FlowEvent, FlowInput, SessionSnapshot, SessionView, VipId};

/// App state
pub struct AppState {
    pub kiosk: KioskHandle,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub owner: String,
    pub sessions_suspended: usize,
}

/// Suspended sessions response
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub count: usize,
    pub sessions: Vec<SessionSnapshot>,
}

/// Live update message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LiveUpdate {
    View(SessionView),
    Event(FlowEvent),
}

/// API error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for KioskError {
    fn into_response(self) -> Response {
        let status = match self {
            KioskError::LoopUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the API router
pub fn create_router(kiosk: KioskHandle) -> Router {
    let state = Arc::new(AppState { kiosk });

    Router::new()
        .route("/health", get(health))
        .route("/view", get(get_view))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:vip_id", delete(clear_session))
        .route("/input", post(post_input))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let view = state.kiosk.view();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        owner: view.owner_label(),
        sessions_suspended: view.suspended_count,
    })
}

/// Current view
async fn get_view(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(state.kiosk.view())
}

/// Suspended VIP sessions
async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionsResponse>, KioskError> {
    let sessions = state.kiosk.sessions().await?;
    Ok(Json(SessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}

/// Forget a VIP, suspended or active
async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(vip_id): Path<u32>,
) -> Result<Json<SessionView>, KioskError> {
    let view = state.kiosk.clear(VipId(vip_id)).await?;
    Ok(Json(view))
}

/// Touch-screen input
async fn post_input(
    State(state): State<Arc<AppState>>,
    Json(input): Json<FlowInput>,
) -> Result<Json<SessionView>, KioskError> {
    debug!(action = input.name(), "input received");
    let view = state.kiosk.input(input).await?;
    Ok(Json(view))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let kiosk = state.kiosk.clone();
    ws.on_upgrade(move |socket| handle_websocket(socket, kiosk))
}

/// Push the current view, then every view change and flow event
async fn handle_websocket(mut socket: WebSocket, kiosk: KioskHandle) {
    let mut views = kiosk.watch();
    let mut events = kiosk.subscribe();

    let initial = LiveUpdate::View(views.borrow_and_update().clone());
    if send_update(&mut socket, &initial).await.is_err() {
        return;
    }

    loop {
        let update = tokio::select! {
            changed = views.changed() => match changed {
                Ok(()) => LiveUpdate::View(views.borrow_and_update().clone()),
                Err(_) => break,
            },
            event = events.recv() => match event {
                Ok(event) => LiveUpdate::Event(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "websocket client lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };
        if send_update(&mut socket, &update).await.is_err() {
            break;
        }
    }
}

async fn send_update(socket: &mut WebSocket, update: &LiveUpdate) -> Result<(), axum::Error> {
    let json = serde_json::to_string(update).unwrap_or_default();
    socket.send(Message::Text(json)).await
}

/// Run the API server
pub async fn run_server(addr: &str, kiosk: KioskHandle) -> Result<(), std::io::Error> {
    let router = create_router(kiosk);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Kiosk API running on {}", addr);
    info!("  GET    /health            - Health check");
    info!("  GET    /view              - Current view");
    info!("  GET    /sessions          - Suspended sessions");
    info!("  POST   /input             - Touch input");
    info!("  DELETE /sessions/:vip_id  - Forget a VIP");
    info!("  WS     /ws                - Live updates");
    axum::serve(listener, router).await
}
