//! Guest Model (booking projection)

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Guest entity: the booking-relevant projection only.
///
/// Invariant: `checked_in` is false whenever `assigned_table` is `None`.
/// Both fields are cleared together on every release path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub guest_id: String,
    #[serde(default)]
    pub assigned_table: Option<i64>,
    #[serde(default)]
    pub checked_in: bool,
    /// 预订请求时记录的用餐人数，等位补位时复用
    #[serde(default)]
    pub party_size: i64,
}
