//! Guest Repository
//!
//! The production [`GuestStore`] implementation: the booking projection of a
//! guest persisted in SurrealDB, keyed by guest id. The coordinator
//! serializes all writes, so the repository performs no locking of its own.

use async_trait::async_trait;
use serde::Serialize;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use crate::db::models::Guest;
use crate::floor::{GuestStore, StoreError, StoreResult};

const TABLE: &str = "guest";

fn backend(e: surrealdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[derive(Clone)]
pub struct GuestRepository {
    db: Surreal<Db>,
}

#[derive(Serialize)]
struct AssignPatch {
    assigned_table: Option<i64>,
    checked_in: bool,
}

#[derive(Serialize)]
struct CheckInPatch {
    checked_in: bool,
}

#[derive(Serialize)]
struct PartySizePatch {
    party_size: i64,
}

impl GuestRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub async fn find_by_guest_id(&self, guest_id: &str) -> StoreResult<Option<Guest>> {
        let guest: Option<Guest> = self
            .db
            .select(RecordId::from_table_key(TABLE, guest_id))
            .await
            .map_err(backend)?;
        Ok(guest)
    }

    /// Guests currently linked to a table, used to restore bookings after a
    /// restart.
    pub async fn find_assigned(&self) -> StoreResult<Vec<Guest>> {
        let guests: Vec<Guest> = self
            .db
            .query("SELECT * FROM guest WHERE assigned_table != NONE ORDER BY assigned_table")
            .await
            .map_err(backend)?
            .take(0)
            .map_err(backend)?;
        Ok(guests)
    }
}

#[async_trait]
impl GuestStore for GuestRepository {
    async fn upsert_guest(&self, guest_id: &str, party_size: i64) -> StoreResult<()> {
        if self.find_by_guest_id(guest_id).await?.is_some() {
            let _: Option<Guest> = self
                .db
                .update(RecordId::from_table_key(TABLE, guest_id))
                .merge(PartySizePatch { party_size })
                .await
                .map_err(backend)?;
            return Ok(());
        }

        let guest = Guest {
            id: None,
            guest_id: guest_id.to_string(),
            assigned_table: None,
            checked_in: false,
            party_size,
        };
        let _: Option<Guest> = self
            .db
            .upsert(RecordId::from_table_key(TABLE, guest_id))
            .content(guest)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn assigned_table(&self, guest_id: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .find_by_guest_id(guest_id)
            .await?
            .and_then(|g| g.assigned_table))
    }

    async fn set_assigned_table(&self, guest_id: &str, table_no: Option<i64>) -> StoreResult<()> {
        // Linking starts a fresh pending booking and clearing releases one;
        // either way the checked-in flag resets with it.
        let updated: Option<Guest> = self
            .db
            .update(RecordId::from_table_key(TABLE, guest_id))
            .merge(AssignPatch {
                assigned_table: table_no,
                checked_in: false,
            })
            .await
            .map_err(backend)?;
        updated
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(guest_id.to_string()))
    }

    async fn checked_in(&self, guest_id: &str) -> StoreResult<bool> {
        Ok(self
            .find_by_guest_id(guest_id)
            .await?
            .is_some_and(|g| g.checked_in))
    }

    async fn set_checked_in(&self, guest_id: &str, checked_in: bool) -> StoreResult<()> {
        let updated: Option<Guest> = self
            .db
            .update(RecordId::from_table_key(TABLE, guest_id))
            .merge(CheckInPatch { checked_in })
            .await
            .map_err(backend)?;
        updated
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(guest_id.to_string()))
    }

    async fn guest_at_table(&self, table_no: i64) -> StoreResult<Option<String>> {
        let guests: Vec<Guest> = self
            .db
            .query("SELECT * FROM guest WHERE assigned_table = $table_no LIMIT 1")
            .bind(("table_no", table_no))
            .await
            .map_err(backend)?
            .take(0)
            .map_err(backend)?;
        Ok(guests.into_iter().next().map(|g| g.guest_id))
    }
}
