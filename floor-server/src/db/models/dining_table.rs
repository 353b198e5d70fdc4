//! Dining Table Model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

/// Dining table entity, one provisioned physical table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// 桌号 (全店唯一)
    pub table_no: i64,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_capacity() -> i64 {
    4
}

fn default_true() -> bool {
    true
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiningTableCreate {
    #[validate(range(min = 1))]
    pub table_no: i64,
    #[validate(range(min = 1))]
    pub capacity: Option<i64>,
}
