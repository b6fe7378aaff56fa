use axum::{
    Json, Router,
    extract::{State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::hub::HubHandle;
use crate::session::run_session;

pub const API_BASE_PATH: &str = "/api/v1";

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub outbound_capacity: usize,
}

/// Readiness payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyStatus {
    pub ok: bool,
    pub connections: usize,
    pub named: Vec<String>,
}

/// Room and health routes, mounted under [`API_BASE_PATH`].
pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/audio/room", get(audio_room_handler))
        .route("/health/live", get(live_handler))
        .route("/health/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    Router::new().nest(API_BASE_PATH, api)
}

async fn audio_room_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state.hub, state.outbound_capacity))
}

async fn live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn ready_handler(State(state): State<AppState>) -> Response {
    match state.hub.presence().await {
        Ok(presence) => Json(ReadyStatus {
            ok: true,
            connections: presence.count,
            named: presence.users,
        })
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.metrics().snapshot())
}
