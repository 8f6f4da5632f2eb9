use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::tracking::ConnectionRegistry;

#[derive(Clone)]
pub struct StatusState {
    pub registry: ConnectionRegistry,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always "active" while the service is up
    pub status: String,
    /// Number of live streaming connections
    pub client_count: usize,
    pub clients: Vec<ClientStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    pub id: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Streaming subsystem status: registry size and per-connection activity
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Streaming connection status", body = StatusResponse)
    ),
    tag = "status"
)]
pub async fn get_status(State(state): State<StatusState>) -> Json<StatusResponse> {
    let connections = state.registry.list().await;

    let clients = connections
        .iter()
        .map(|conn| ClientStatus {
            id: conn.id.clone(),
            connected_at: conn.connected_at,
            last_activity: conn.last_activity,
        })
        .collect();

    Json(StatusResponse {
        status: "active".to_string(),
        client_count: connections.len(),
        clients,
    })
}

pub fn router(registry: ConnectionRegistry) -> Router {
    let state = StatusState { registry };
    Router::new().route("/", get(get_status)).with_state(state)
}
