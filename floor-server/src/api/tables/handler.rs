//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use validator::Validate;

use crate::core::ServerState;
use crate::db::models::{DiningTable, DiningTableCreate};
use crate::db::repository::DiningTableRepository;
use crate::floor::{ReleaseTrigger, TableState};
use crate::utils::{AppError, AppResult};

/// 桌台状态视图 (座位计划 + 实时预订状态)
#[derive(Debug, Serialize)]
pub struct TableView {
    pub table_no: i64,
    pub capacity: i64,
    pub booked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_at: Option<i64>,
}

impl From<TableState> for TableView {
    fn from(t: TableState) -> Self {
        Self {
            table_no: t.table_no,
            capacity: t.capacity,
            booked: t.booked_at.is_some(),
            booked_at: t.booked_at,
        }
    }
}

/// GET /api/tables - 获取所有桌台及预订状态
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<TableView>>> {
    let tables = state.coordinator.floor_snapshot().await;
    Ok(Json(tables.into_iter().map(TableView::from).collect()))
}

/// GET /api/tables/free - 获取空闲桌台
pub async fn list_free(State(state): State<ServerState>) -> AppResult<Json<Vec<TableView>>> {
    let tables = state.coordinator.free_tables().await;
    Ok(Json(tables.into_iter().map(TableView::from).collect()))
}

/// POST /api/tables - 登记桌台 (座位计划)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DiningTableCreate>,
) -> AppResult<Json<DiningTable>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let repo = DiningTableRepository::new(state.db.clone());
    let table = repo.create(payload).await?;

    // The registry learns about the table in the same request; a duplicate
    // number was already rejected by the repository.
    state
        .coordinator
        .provision_table(table.table_no, table.capacity)
        .await;

    Ok(Json(table))
}

/// POST /api/tables/{table_no}/release - 员工手动释放桌台
pub async fn release(
    State(state): State<ServerState>,
    Path(table_no): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .coordinator
        .release_table(table_no, ReleaseTrigger::Manual)
        .await?;
    Ok(Json(serde_json::json!({ "released": table_no })))
}

/// POST /api/tables/{table_no}/settle - 结账完成，释放桌台
///
/// 账单金额计算由订单/账务子系统负责；这里只承接
/// "支付完成即释放桌台" 这一个触发点。
pub async fn settle(
    State(state): State<ServerState>,
    Path(table_no): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .coordinator
        .release_table(table_no, ReleaseTrigger::Payment)
        .await?;
    Ok(Json(serde_json::json!({ "released": table_no })))
}
