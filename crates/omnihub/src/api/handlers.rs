//! API request handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::ws::AgentInfo;

use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Status snapshot served at the root path.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub agents: Vec<String>,
}

/// Root status endpoint: a synchronous snapshot of connected device ids.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "System Online".to_string(),
        agents: state.hub.registry().device_ids(),
    })
}

/// Registered-agent metadata captured from the registration handshake.
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentInfo>> {
    Json(state.hub.registry().agents())
}
