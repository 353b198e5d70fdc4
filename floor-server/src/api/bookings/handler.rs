//! Booking API Handlers
//!
//! 预订请求、签到。结果要么立即落座，要么进入等位队列。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use validator::Validate;

use crate::core::ServerState;
use crate::floor::BookingOutcome;
use crate::utils::{AppError, AppResult};

/// 预订请求
#[derive(Debug, Deserialize, Validate)]
pub struct BookingRequest {
    #[validate(length(min = 1))]
    pub guest_id: String,
    #[validate(range(min = 1))]
    pub party_size: i64,
}

/// POST /api/bookings - 请求预订
///
/// 响应: `{"status":"booked","table_no":5}` 或 `{"status":"waitlisted"}`
pub async fn request_booking(
    State(state): State<ServerState>,
    Json(payload): Json<BookingRequest>,
) -> AppResult<Json<BookingOutcome>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let outcome = state
        .coordinator
        .request_booking(&payload.guest_id, payload.party_size)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/bookings/{guest_id}/check-in - 客人到店签到
pub async fn check_in(
    State(state): State<ServerState>,
    Path(guest_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let table_no = state.coordinator.check_in(&guest_id).await?;
    Ok(Json(serde_json::json!({ "table_no": table_no })))
}
