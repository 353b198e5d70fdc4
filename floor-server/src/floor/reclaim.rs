//! Reservation Reclaim Scheduler
//!
//! One cancellable timer task per active booking: a tokio task keyed by
//! guest id that can be disarmed eagerly on check-in or release, with a
//! parent token that tears all of them down on shutdown.
//!
//! A monitor that reaches its grace expiry re-reads the guest's checked-in
//! flag and only then reclaims the table; a checked-in guest makes the
//! monitor exit without side effect.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::coordinator::AllocationCoordinator;
use super::events::ReleaseTrigger;
use super::store::GuestStore;

struct MonitorHandle {
    /// Distinguishes this monitor from a later one for the same guest, so a
    /// fired monitor never removes its successor's token.
    generation: u64,
    token: CancellationToken,
}

/// 预订回收调度器 - 管理每个预订的宽限期看门狗
pub struct ReclaimScheduler {
    monitors: Arc<DashMap<String, MonitorHandle>>,
    seq: AtomicU64,
    shutdown: CancellationToken,
}

impl ReclaimScheduler {
    pub fn new() -> Self {
        Self {
            monitors: Arc::new(DashMap::new()),
            seq: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Arm a reclaim monitor for a fresh booking.
    ///
    /// Sleeps for `grace`, then reclaims `table_no` through the coordinator
    /// unless the guest checked in or the monitor was cancelled meanwhile.
    /// The task holds only a weak coordinator reference.
    pub(crate) fn schedule(
        &self,
        coordinator: &Arc<AllocationCoordinator>,
        guests: Arc<dyn GuestStore>,
        guest_id: &str,
        table_no: i64,
        grace: Duration,
    ) {
        let generation = self.seq.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();

        if let Some(previous) = self.monitors.insert(
            guest_id.to_string(),
            MonitorHandle {
                generation,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
        }

        let monitors = Arc::clone(&self.monitors);
        let weak = Arc::downgrade(coordinator);
        let guest = guest_id.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(guest_id = %guest, table_no, "reclaim monitor disarmed");
                    return;
                }
                _ = tokio::time::sleep(grace) => {}
            }

            if let Some(coordinator) = weak.upgrade() {
                match guests.checked_in(&guest).await {
                    Ok(true) => {
                        tracing::debug!(
                            guest_id = %guest,
                            table_no,
                            "grace period elapsed but guest is checked in, leaving table booked"
                        );
                    }
                    Ok(false) => {
                        tracing::warn!(
                            guest_id = %guest,
                            table_no,
                            "guest never checked in, reclaiming table"
                        );
                        if let Err(e) = coordinator
                            .release_table(table_no, ReleaseTrigger::Timeout)
                            .await
                        {
                            tracing::error!(error = %e, table_no, "timeout reclaim failed");
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            guest_id = %guest,
                            table_no,
                            "could not verify check-in state, leaving table booked"
                        );
                    }
                }
            }

            monitors.remove_if(&guest, |_, handle| handle.generation == generation);
        });
    }

    /// Disarm the guest's monitor, if any. Returns whether one was armed.
    pub fn cancel(&self, guest_id: &str) -> bool {
        match self.monitors.remove(guest_id) {
            Some((_, handle)) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of currently armed monitors.
    pub fn active(&self) -> usize {
        self.monitors.len()
    }

    /// Cancel every armed monitor (graceful shutdown).
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.monitors.clear();
    }
}

impl Default for ReclaimScheduler {
    fn default() -> Self {
        Self::new()
    }
}
