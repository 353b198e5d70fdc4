//! Allocation Coordinator
//!
//! The only component that mutates the table registry and the waitlist
//! together. Booking requests, releases, waitlist drains and check-ins all
//! serialize on one mutex over the floor plan, so every check-then-act
//! sequence (find a fit, mark it booked, link the guest) appears atomic to
//! concurrent callers.
//!
//! # Booking Flow
//!
//! ```text
//! request_booking(guest, seats)
//!     ├─ 1. Reject if the guest already holds a table
//!     ├─ 2. Upsert the guest projection (records party size)
//!     ├─ 3. find_best_fit → mark_booked (one retry on a lost race)
//!     ├─ 4. Link guest in the store; roll the table back on failure
//!     ├─ 5. Arm the reclaim monitor
//!     └─ 6. Broadcast Booked, or enqueue and broadcast Waitlisted
//! ```
//!
//! Releases (manual, payment, timeout) free the table, clear the guest link,
//! disarm the monitor, then drain the waitlist head against the free pool.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};

use super::events::{EVENT_CHANNEL_CAPACITY, FloorEvent, ReleaseTrigger};
use super::reclaim::ReclaimScheduler;
use super::registry::{TableRegistry, TableState};
use super::store::{GuestStore, StoreError};
use super::waitlist::{Waitlist, WaitlistEntry};

/// Allocation errors surfaced to callers.
///
/// Capacity misses are not errors (they produce
/// [`BookingOutcome::Waitlisted`]); the variants here are the genuine
/// failures plus the precondition rejections.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Guest already holds a table: {0}")]
    AlreadyBooked(String),

    #[error("No active booking for guest: {0}")]
    NotBooked(String),

    #[error("Guest store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal allocation failure: {0}")]
    Internal(String),
}

pub type AllocationResult<T> = Result<T, AllocationError>;

/// Outcome of a booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BookingOutcome {
    /// A table was assigned immediately.
    Booked { table_no: i64 },
    /// No fitting table; the guest joined the waiting line.
    Waitlisted,
}

/// Registry and waitlist, guarded together.
///
/// 两者必须在同一把锁下变更，否则并发的预订/释放会观察到
/// 半更新状态。
struct FloorPlan {
    registry: TableRegistry,
    waitlist: Waitlist,
}

/// Orchestrates table allocation: booking, release, waitlist drain,
/// check-in. Constructed once per process and shared behind an [`Arc`];
/// reclaim monitors hold only weak references back.
pub struct AllocationCoordinator {
    plan: Mutex<FloorPlan>,
    guests: Arc<dyn GuestStore>,
    reclaim: ReclaimScheduler,
    event_tx: broadcast::Sender<FloorEvent>,
    grace: Duration,
}

impl std::fmt::Debug for AllocationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationCoordinator")
            .field("grace", &self.grace)
            .field("armed_monitors", &self.reclaim.active())
            .finish()
    }
}

impl AllocationCoordinator {
    /// Create a coordinator over a pre-provisioned seating plan.
    pub fn new(
        registry: TableRegistry,
        guests: Arc<dyn GuestStore>,
        grace: Duration,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tracing::info!(
            tables = registry.len(),
            grace_secs = grace.as_secs(),
            "allocation coordinator ready"
        );
        Arc::new(Self {
            plan: Mutex::new(FloorPlan {
                registry,
                waitlist: Waitlist::new(),
            }),
            guests,
            reclaim: ReclaimScheduler::new(),
            event_tx,
            grace,
        })
    }

    /// Subscribe to floor events.
    pub fn subscribe(&self) -> broadcast::Receiver<FloorEvent> {
        self.event_tx.subscribe()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace
    }

    /// Book the best-fitting free table for a guest, or waitlist them.
    ///
    /// Rejects with [`AllocationError::AlreadyBooked`] when the guest already
    /// holds a table; the upstream flow checks this too, but the coordinator
    /// must not double-book when the precondition is violated.
    pub async fn request_booking(
        self: &Arc<Self>,
        guest_id: &str,
        party_size: i64,
    ) -> AllocationResult<BookingOutcome> {
        let mut plan = self.plan.lock().await;

        if self.guests.assigned_table(guest_id).await?.is_some() {
            tracing::warn!(guest_id, "booking rejected, guest already holds a table");
            return Err(AllocationError::AlreadyBooked(guest_id.to_string()));
        }

        self.guests.upsert_guest(guest_id, party_size).await?;

        match self.book_best_fit(&mut plan, guest_id, party_size).await? {
            Some(table_no) => {
                tracing::info!(guest_id, table_no, party_size, "table booked");
                self.emit(FloorEvent::Booked {
                    guest_id: guest_id.to_string(),
                    table_no,
                    party_size,
                });
                Ok(BookingOutcome::Booked { table_no })
            }
            None => {
                plan.waitlist.enqueue(guest_id, party_size);
                tracing::info!(guest_id, party_size, "no table fits, guest waitlisted");
                self.emit(FloorEvent::Waitlisted {
                    guest_id: guest_id.to_string(),
                    party_size,
                });
                Ok(BookingOutcome::Waitlisted)
            }
        }
    }

    /// Free a table and immediately try to seat the waitlist head.
    ///
    /// Callable from all three triggers (manual staff action, payment
    /// completion, timeout reclaim). Double frees and unknown tables are
    /// tolerated no-ops. A timeout release re-verifies the checked-in flag
    /// under the lock, so a guest who checked in while the monitor was
    /// waking keeps the table.
    pub async fn release_table(
        self: &Arc<Self>,
        table_no: i64,
        trigger: ReleaseTrigger,
    ) -> AllocationResult<()> {
        let mut plan = self.plan.lock().await;

        let linked = self.guests.guest_at_table(table_no).await?;
        if let Some(guest_id) = &linked {
            if trigger == ReleaseTrigger::Timeout && self.guests.checked_in(guest_id).await? {
                tracing::debug!(
                    guest_id = %guest_id,
                    table_no,
                    "timeout reclaim skipped, guest already checked in"
                );
                return Ok(());
            }
            self.reclaim.cancel(guest_id);
            self.guests.set_assigned_table(guest_id, None).await?;
        }

        if !plan.registry.mark_free(table_no) {
            tracing::debug!(table_no, "release of unknown table ignored");
        }

        match (&linked, trigger) {
            (Some(guest_id), ReleaseTrigger::Timeout) => {
                tracing::warn!(
                    guest_id = %guest_id,
                    table_no,
                    "table reclaimed, guest never checked in"
                );
                self.emit(FloorEvent::TimeoutReclaimed {
                    guest_id: guest_id.clone(),
                    table_no,
                });
            }
            _ => {
                tracing::info!(table_no, %trigger, "table released");
                self.emit(FloorEvent::Released { table_no, trigger });
            }
        }

        self.drain_waitlist(&mut plan).await;
        Ok(())
    }

    /// Confirm the guest's arrival and disarm their reclaim monitor.
    ///
    /// Returns the guest's table number.
    pub async fn check_in(&self, guest_id: &str) -> AllocationResult<i64> {
        // Lock even though only the store changes: check-in must serialize
        // with a concurrent timeout release for the same booking.
        let _plan = self.plan.lock().await;

        let Some(table_no) = self.guests.assigned_table(guest_id).await? else {
            return Err(AllocationError::NotBooked(guest_id.to_string()));
        };
        self.guests.set_checked_in(guest_id, true).await?;
        self.reclaim.cancel(guest_id);

        tracing::info!(guest_id, table_no, "guest checked in");
        self.emit(FloorEvent::CheckedIn {
            guest_id: guest_id.to_string(),
            table_no,
        });
        Ok(table_no)
    }

    /// Add a table to the seating plan. Returns `false` when the table
    /// number is already provisioned.
    pub async fn provision_table(&self, table_no: i64, capacity: i64) -> bool {
        self.plan.lock().await.registry.insert(table_no, capacity)
    }

    /// Re-arm a booking found in the store at startup (process restart with
    /// guests still linked to tables). Marks the table booked and, for
    /// guests who had not checked in yet, restarts their grace period.
    pub async fn restore_booking(
        self: &Arc<Self>,
        guest_id: &str,
        table_no: i64,
        checked_in: bool,
    ) -> bool {
        let mut plan = self.plan.lock().await;
        if !plan.registry.mark_booked(table_no) {
            tracing::warn!(
                guest_id,
                table_no,
                "stored booking references a table that is unknown or already booked"
            );
            return false;
        }
        if !checked_in {
            self.reclaim
                .schedule(self, Arc::clone(&self.guests), guest_id, table_no, self.grace);
        }
        tracing::info!(guest_id, table_no, checked_in, "restored booking from store");
        true
    }

    /// Snapshot of the whole seating plan, ordered by table number.
    pub async fn floor_snapshot(&self) -> Vec<TableState> {
        self.plan.lock().await.registry.list_all()
    }

    /// Snapshot of the free tables, ordered by table number.
    pub async fn free_tables(&self) -> Vec<TableState> {
        self.plan.lock().await.registry.list_free()
    }

    /// Snapshot of the waiting line in arrival order.
    pub async fn waitlist_snapshot(&self) -> Vec<WaitlistEntry> {
        self.plan.lock().await.waitlist.entries()
    }

    /// Disarm all reclaim monitors (graceful shutdown).
    pub fn shutdown(&self) {
        self.reclaim.shutdown();
    }

    // ========================================================================
    // Internals (called with the plan lock held)
    // ========================================================================

    /// Find, book and link the best-fitting table; `Ok(None)` on a capacity
    /// miss. On a store-link failure the table is rolled back to free before
    /// the error surfaces, so a booked table is never left without a linked
    /// guest.
    async fn book_best_fit(
        self: &Arc<Self>,
        plan: &mut FloorPlan,
        guest_id: &str,
        party_size: i64,
    ) -> AllocationResult<Option<i64>> {
        // One bounded retry: mark_booked failing means another path won the
        // table between find and mark.
        for attempt in 0..2 {
            let Some(table_no) = plan
                .registry
                .find_best_fit(party_size)
                .map(|t| t.table_no)
            else {
                return Ok(None);
            };

            if !plan.registry.mark_booked(table_no) {
                tracing::debug!(table_no, attempt, "lost table to a concurrent booking");
                continue;
            }

            return match self.guests.set_assigned_table(guest_id, Some(table_no)).await {
                Ok(()) => {
                    self.reclaim.schedule(
                        self,
                        Arc::clone(&self.guests),
                        guest_id,
                        table_no,
                        self.grace,
                    );
                    Ok(Some(table_no))
                }
                Err(e) => {
                    plan.registry.mark_free(table_no);
                    tracing::error!(
                        error = %e,
                        guest_id,
                        table_no,
                        "guest link failed, booking rolled back"
                    );
                    Err(AllocationError::Internal(format!(
                        "guest link failed for table {table_no}: {e}"
                    )))
                }
            };
        }
        Err(AllocationError::Internal(
            "table acquisition kept racing".to_string(),
        ))
    }

    /// Seat as many consecutive waitlist heads as the free pool fits.
    ///
    /// Head-only matching: if the head does not fit, the drain stops and a
    /// later, smaller party never jumps the line. Matching deeper into the
    /// queue when several tables are free at once is a possible enhancement,
    /// deliberately not done here.
    async fn drain_waitlist(self: &Arc<Self>, plan: &mut FloorPlan) {
        while let Some((guest_id, party_size)) = plan
            .waitlist
            .peek_head()
            .map(|e| (e.guest_id.clone(), e.party_size))
        {
            match self.book_best_fit(plan, &guest_id, party_size).await {
                Ok(Some(table_no)) => {
                    plan.waitlist.dequeue_head();
                    tracing::info!(
                        guest_id = %guest_id,
                        table_no,
                        party_size,
                        "seated guest from waitlist"
                    );
                    self.emit(FloorEvent::DrainMatched {
                        guest_id,
                        table_no,
                        party_size,
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    // The table was rolled back; the head stays queued for
                    // the next release.
                    tracing::error!(error = %e, guest_id = %guest_id, "waitlist drain aborted");
                    break;
                }
            }
        }
    }

    fn emit(&self, event: FloorEvent) {
        // No receivers is fine; events are best-effort observability.
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::floor::store::MemGuestStore;

    const GRACE: Duration = Duration::from_secs(300);

    async fn coordinator_with(
        tables: &[(i64, i64)],
    ) -> (Arc<AllocationCoordinator>, Arc<MemGuestStore>) {
        let mut registry = TableRegistry::new();
        for &(no, cap) in tables {
            registry.insert(no, cap);
        }
        let store = Arc::new(MemGuestStore::new());
        let guests: Arc<dyn GuestStore> = store.clone();
        let coordinator = AllocationCoordinator::new(registry, guests, GRACE);
        (coordinator, store)
    }

    async fn free_table_nos(coordinator: &Arc<AllocationCoordinator>) -> Vec<i64> {
        coordinator
            .free_tables()
            .await
            .iter()
            .map(|t| t.table_no)
            .collect()
    }

    /// Let spawned reclaim monitors run to completion under a paused clock.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn books_smallest_fitting_table() {
        let (coordinator, store) = coordinator_with(&[(1, 2), (2, 4)]).await;

        let outcome = coordinator.request_booking("ana", 3).await.unwrap();
        assert_eq!(outcome, BookingOutcome::Booked { table_no: 2 });
        assert_eq!(store.assigned_table("ana").await.unwrap(), Some(2));
        assert_eq!(free_table_nos(&coordinator).await, vec![1]);
    }

    #[tokio::test]
    async fn capacity_miss_waitlists_the_guest() {
        let (coordinator, store) = coordinator_with(&[(1, 2)]).await;

        let outcome = coordinator.request_booking("ana", 5).await.unwrap();
        assert_eq!(outcome, BookingOutcome::Waitlisted);
        assert_eq!(store.assigned_table("ana").await.unwrap(), None);

        let waitlist = coordinator.waitlist_snapshot().await;
        assert_eq!(waitlist.len(), 1);
        assert_eq!(waitlist[0].guest_id, "ana");
        assert_eq!(waitlist[0].party_size, 5);
    }

    #[tokio::test]
    async fn double_booking_is_rejected_not_crashed() {
        let (coordinator, _) = coordinator_with(&[(1, 2), (2, 2)]).await;

        coordinator.request_booking("ana", 2).await.unwrap();
        let second = coordinator.request_booking("ana", 2).await;
        assert!(matches!(second, Err(AllocationError::AlreadyBooked(_))));
        // The second table must still be free.
        assert_eq!(free_table_nos(&coordinator).await, vec![2]);
    }

    #[tokio::test]
    async fn release_seats_waitlist_head_in_fifo_order() {
        let (coordinator, store) = coordinator_with(&[(1, 2), (2, 4)]).await;

        coordinator.request_booking("seated-a", 2).await.unwrap();
        coordinator.request_booking("seated-b", 4).await.unwrap();
        // Line: ana (2 seats) ahead of bruno (4 seats).
        coordinator.request_booking("ana", 2).await.unwrap();
        coordinator.request_booking("bruno", 4).await.unwrap();

        coordinator
            .release_table(1, ReleaseTrigger::Manual)
            .await
            .unwrap();

        assert_eq!(store.assigned_table("ana").await.unwrap(), Some(1));
        assert_eq!(store.assigned_table("bruno").await.unwrap(), None);
        let waitlist = coordinator.waitlist_snapshot().await;
        assert_eq!(waitlist.len(), 1);
        assert_eq!(waitlist[0].guest_id, "bruno");

        // The second release seats the remaining head.
        coordinator
            .release_table(2, ReleaseTrigger::Payment)
            .await
            .unwrap();
        assert_eq!(store.assigned_table("bruno").await.unwrap(), Some(2));
        assert!(coordinator.waitlist_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn head_that_does_not_fit_blocks_the_line() {
        let (coordinator, store) = coordinator_with(&[(1, 2)]).await;

        coordinator.request_booking("seated", 2).await.unwrap();
        // Head wants 4 seats, second in line would fit the 2-top.
        coordinator.request_booking("big-party", 4).await.unwrap();
        coordinator.request_booking("small-party", 2).await.unwrap();

        coordinator
            .release_table(1, ReleaseTrigger::Manual)
            .await
            .unwrap();

        // Nobody is seated: the head is never skipped.
        assert_eq!(store.assigned_table("big-party").await.unwrap(), None);
        assert_eq!(store.assigned_table("small-party").await.unwrap(), None);
        assert_eq!(coordinator.waitlist_snapshot().await.len(), 2);
        assert_eq!(free_table_nos(&coordinator).await, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reclaims_and_reseats_from_waitlist() {
        let (coordinator, store) = coordinator_with(&[(1, 2)]).await;

        coordinator.request_booking("no-show", 2).await.unwrap();
        coordinator.request_booking("waiting", 2).await.unwrap();

        tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(store.assigned_table("no-show").await.unwrap(), None);
        assert_eq!(store.assigned_table("waiting").await.unwrap(), Some(1));
        assert!(coordinator.waitlist_snapshot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn check_in_before_expiry_keeps_the_table() {
        let (coordinator, store) = coordinator_with(&[(1, 2)]).await;

        coordinator.request_booking("ana", 2).await.unwrap();
        let table_no = coordinator.check_in("ana").await.unwrap();
        assert_eq!(table_no, 1);

        tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(store.assigned_table("ana").await.unwrap(), Some(1));
        assert!(store.checked_in("ana").await.unwrap());
        assert!(free_table_nos(&coordinator).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drained_guest_gets_a_grace_period_too() {
        let (coordinator, store) = coordinator_with(&[(1, 2)]).await;

        coordinator.request_booking("first", 2).await.unwrap();
        coordinator.request_booking("second", 2).await.unwrap();

        coordinator
            .release_table(1, ReleaseTrigger::Payment)
            .await
            .unwrap();
        assert_eq!(store.assigned_table("second").await.unwrap(), Some(1));

        // The drained booking is watched as well; no check-in frees it.
        tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(store.assigned_table("second").await.unwrap(), None);
        assert_eq!(free_table_nos(&coordinator).await, vec![1]);
    }

    #[tokio::test]
    async fn double_release_is_a_noop_and_drains_nothing_phantom() {
        let (coordinator, store) = coordinator_with(&[(1, 4)]).await;

        coordinator.request_booking("ana", 4).await.unwrap();
        // Six seats fit nothing on this floor.
        coordinator.request_booking("big-party", 6).await.unwrap();

        coordinator
            .release_table(1, ReleaseTrigger::Manual)
            .await
            .unwrap();
        // Released again while already free, plus an unknown table number.
        coordinator
            .release_table(1, ReleaseTrigger::Manual)
            .await
            .unwrap();
        coordinator
            .release_table(99, ReleaseTrigger::Manual)
            .await
            .unwrap();

        assert_eq!(store.assigned_table("big-party").await.unwrap(), None);
        assert_eq!(coordinator.waitlist_snapshot().await.len(), 1);
        assert_eq!(free_table_nos(&coordinator).await, vec![1]);
    }

    #[tokio::test]
    async fn store_link_failure_rolls_the_table_back() {
        let (coordinator, store) = coordinator_with(&[(1, 2)]).await;

        store.fail_next_assign();
        let result = coordinator.request_booking("ana", 2).await;
        assert!(matches!(result, Err(AllocationError::Internal(_))));

        // Never a booked table without a linked guest.
        assert_eq!(free_table_nos(&coordinator).await, vec![1]);
        assert_eq!(store.assigned_table("ana").await.unwrap(), None);
        assert!(coordinator.waitlist_snapshot().await.is_empty());

        // The failure was transient, not retried automatically; a fresh
        // request succeeds.
        let outcome = coordinator.request_booking("ana", 2).await.unwrap();
        assert_eq!(outcome, BookingOutcome::Booked { table_no: 1 });
    }

    #[tokio::test]
    async fn check_in_without_booking_is_rejected() {
        let (coordinator, _) = coordinator_with(&[(1, 2)]).await;
        let result = coordinator.check_in("stranger").await;
        assert!(matches!(result, Err(AllocationError::NotBooked(_))));
    }

    #[tokio::test]
    async fn events_carry_guest_table_and_seats() {
        let (coordinator, _) = coordinator_with(&[(1, 2)]).await;
        let mut events = coordinator.subscribe();

        coordinator.request_booking("ana", 2).await.unwrap();
        coordinator.request_booking("bruno", 2).await.unwrap();
        coordinator
            .release_table(1, ReleaseTrigger::Payment)
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            FloorEvent::Booked {
                guest_id: "ana".into(),
                table_no: 1,
                party_size: 2
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            FloorEvent::Waitlisted {
                guest_id: "bruno".into(),
                party_size: 2
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            FloorEvent::Released {
                table_no: 1,
                trigger: ReleaseTrigger::Payment
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            FloorEvent::DrainMatched {
                guest_id: "bruno".into(),
                table_no: 1,
                party_size: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restore_rearms_the_grace_period() {
        let (coordinator, store) = coordinator_with(&[(1, 2), (2, 4)]).await;
        store.upsert_guest("ana", 2).await.unwrap();
        store.set_assigned_table("ana", Some(1)).await.unwrap();
        store.upsert_guest("bruno", 4).await.unwrap();
        store.set_assigned_table("bruno", Some(2)).await.unwrap();
        store.set_checked_in("bruno", true).await.unwrap();

        assert!(coordinator.restore_booking("ana", 1, false).await);
        assert!(coordinator.restore_booking("bruno", 2, true).await);
        assert!(free_table_nos(&coordinator).await.is_empty());

        tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
        settle().await;

        // ana had never checked in and is reclaimed; bruno keeps the table.
        assert_eq!(store.assigned_table("ana").await.unwrap(), None);
        assert_eq!(store.assigned_table("bruno").await.unwrap(), Some(2));
        assert_eq!(free_table_nos(&coordinator).await, vec![1]);
    }
}
