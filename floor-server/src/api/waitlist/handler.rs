//! Waitlist API Handlers

use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::floor::WaitlistEntry;
use crate::utils::AppResult;

/// GET /api/waitlist - 等位队列快照 (到达顺序)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<WaitlistEntry>>> {
    Ok(Json(state.coordinator.waitlist_snapshot().await))
}
