//! Guest Store Seam
//!
//! The coordinator never talks to the database directly; it goes through the
//! [`GuestStore`] trait. The production implementation is
//! [`GuestRepository`](crate::db::repository::GuestRepository) over embedded
//! SurrealDB; [`MemGuestStore`] is the in-memory double used by tests and
//! development tooling.
//!
//! The store must be strongly consistent with the coordinator's view: a
//! write performed inside a booking flow is visible to the next read of the
//! same flow.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

/// Guest store failures.
///
/// `Backend` is a genuine failure (store unreachable, corrupted row) and
/// propagates to the caller; everything softer is handled inside the
/// coordinator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Guest not found: {0}")]
    NotFound(String),

    #[error("Guest store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Booking-relevant projection of a guest, as seen by the coordinator.
///
/// Invariant: `checked_in` is false whenever `assigned_table` is `None`;
/// implementations clear both together.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Create the guest row if absent and stamp the required party size.
    /// Called at booking-request time so later waitlist re-matching can use
    /// the recorded size.
    async fn upsert_guest(&self, guest_id: &str, party_size: i64) -> StoreResult<()>;

    async fn assigned_table(&self, guest_id: &str) -> StoreResult<Option<i64>>;

    /// Link or clear the guest's table. Clearing (`None`) also resets the
    /// checked-in flag.
    async fn set_assigned_table(&self, guest_id: &str, table_no: Option<i64>) -> StoreResult<()>;

    async fn checked_in(&self, guest_id: &str) -> StoreResult<bool>;

    async fn set_checked_in(&self, guest_id: &str, checked_in: bool) -> StoreResult<()>;

    /// Reverse lookup used by release-by-table paths.
    async fn guest_at_table(&self, table_no: i64) -> StoreResult<Option<String>>;
}

#[derive(Debug, Clone, Default)]
struct GuestRecord {
    assigned_table: Option<i64>,
    checked_in: bool,
    #[allow(dead_code)]
    party_size: i64,
}

/// In-memory guest store for tests and development.
///
/// `fail_next_assign` lets a test inject a single link-write failure to
/// exercise the coordinator's rollback path.
#[derive(Debug, Default)]
pub struct MemGuestStore {
    guests: Mutex<HashMap<String, GuestRecord>>,
    fail_next_assign: AtomicBool,
}

impl MemGuestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `set_assigned_table` call fail with a backend error.
    pub fn fail_next_assign(&self) {
        self.fail_next_assign.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl GuestStore for MemGuestStore {
    async fn upsert_guest(&self, guest_id: &str, party_size: i64) -> StoreResult<()> {
        let mut guests = self.guests.lock().expect("guest store poisoned");
        guests
            .entry(guest_id.to_string())
            .or_default()
            .party_size = party_size;
        Ok(())
    }

    async fn assigned_table(&self, guest_id: &str) -> StoreResult<Option<i64>> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.get(guest_id).and_then(|g| g.assigned_table))
    }

    async fn set_assigned_table(&self, guest_id: &str, table_no: Option<i64>) -> StoreResult<()> {
        if self.fail_next_assign.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected link failure".into()));
        }
        let mut guests = self.guests.lock().expect("guest store poisoned");
        let record = guests
            .get_mut(guest_id)
            .ok_or_else(|| StoreError::NotFound(guest_id.to_string()))?;
        record.assigned_table = table_no;
        if table_no.is_none() {
            record.checked_in = false;
        }
        Ok(())
    }

    async fn checked_in(&self, guest_id: &str) -> StoreResult<bool> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests.get(guest_id).is_some_and(|g| g.checked_in))
    }

    async fn set_checked_in(&self, guest_id: &str, checked_in: bool) -> StoreResult<()> {
        let mut guests = self.guests.lock().expect("guest store poisoned");
        let record = guests
            .get_mut(guest_id)
            .ok_or_else(|| StoreError::NotFound(guest_id.to_string()))?;
        record.checked_in = checked_in;
        Ok(())
    }

    async fn guest_at_table(&self, table_no: i64) -> StoreResult<Option<String>> {
        let guests = self.guests.lock().expect("guest store poisoned");
        Ok(guests
            .iter()
            .find(|(_, g)| g.assigned_table == Some(table_no))
            .map(|(id, _)| id.clone()))
    }
}
