//! Table Registry
//!
//! Authoritative in-memory record of the physical seating plan: which tables
//! exist, how many seats they have and whether they are currently booked.
//! The registry itself is not synchronized; it lives inside the
//! [`AllocationCoordinator`](super::AllocationCoordinator)'s critical section
//! and must only be mutated through it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::utils::time::now_millis;

/// 桌台状态 - 餐厅里一张实体桌子
///
/// `booked_at` 为 `Some` 当且仅当桌台已被预订。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableState {
    /// 桌号 (唯一)
    pub table_no: i64,
    /// 座位数
    pub capacity: i64,
    /// 预订时间戳 (Unix millis)，空闲时为 None
    pub booked_at: Option<i64>,
}

impl TableState {
    pub fn is_free(&self) -> bool {
        self.booked_at.is_none()
    }
}

/// In-memory seating plan keyed by table number.
///
/// Loaded from the `dining_table` store at startup and extended through
/// provisioning; tables are never removed during normal operation.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: BTreeMap<i64, TableState>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Add a table to the seating plan.
    ///
    /// Returns `false` (no-op) if the table number is already provisioned.
    pub fn insert(&mut self, table_no: i64, capacity: i64) -> bool {
        if self.tables.contains_key(&table_no) {
            return false;
        }
        self.tables.insert(
            table_no,
            TableState {
                table_no,
                capacity,
                booked_at: None,
            },
        );
        true
    }

    /// Best-fit lookup: the free table with the smallest capacity that still
    /// seats `required_seats`, ties broken by lowest table number.
    ///
    /// Read-only; returns `None` when no free table fits.
    pub fn find_best_fit(&self, required_seats: i64) -> Option<&TableState> {
        let mut best: Option<&TableState> = None;
        // BTreeMap iterates in ascending table_no order, so a strict `<`
        // comparison keeps the lowest-numbered table on capacity ties.
        for table in self.tables.values() {
            if !table.is_free() || table.capacity < required_seats {
                continue;
            }
            match best {
                Some(b) if table.capacity >= b.capacity => {}
                _ => best = Some(table),
            }
        }
        best
    }

    /// Transition a table from free to booked, stamping the current time.
    ///
    /// Fails closed: returns `false` without touching state when the table is
    /// unknown or already booked. Concurrent booking paths rely on this guard
    /// instead of an error.
    pub fn mark_booked(&mut self, table_no: i64) -> bool {
        match self.tables.get_mut(&table_no) {
            Some(table) if table.is_free() => {
                table.booked_at = Some(now_millis());
                true
            }
            _ => false,
        }
    }

    /// Transition a table from booked to free, clearing the timestamp.
    ///
    /// Idempotent: freeing an already-free table succeeds without effect.
    /// Multiple release paths (manual, payment, timeout) may race here, so a
    /// double free is deliberately soft. Returns `false` only for an unknown
    /// table number.
    pub fn mark_free(&mut self, table_no: i64) -> bool {
        match self.tables.get_mut(&table_no) {
            Some(table) => {
                table.booked_at = None;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, table_no: i64) -> Option<&TableState> {
        self.tables.get(&table_no)
    }

    /// Snapshot of the free tables, ordered by table number.
    pub fn list_free(&self) -> Vec<TableState> {
        self.tables
            .values()
            .filter(|t| t.is_free())
            .cloned()
            .collect()
    }

    /// Snapshot of the whole seating plan, ordered by table number.
    pub fn list_all(&self) -> Vec<TableState> {
        self.tables.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
