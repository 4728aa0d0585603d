//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::JobId;

/// `GET /ws/{job_id}` — Upgrade to a WebSocket streaming the job's events.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let job_id = JobId::from(job_id);
    let hub = state.hub.clone();

    ws.on_upgrade(move |socket| run_connection(socket, job_id, hub))
}
