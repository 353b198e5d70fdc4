//! Waitlist Queue
//!
//! FIFO line of guests waiting for a table. Strictly arrival-ordered: no
//! priority reordering and no expiry. The queue shares the coordinator's
//! critical section with the registry, so callers never observe it
//! mid-update.

use std::collections::VecDeque;

use serde::Serialize;

use crate::utils::time::now_millis;

/// 等位条目 - 排队的客人及其所需座位数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistEntry {
    pub guest_id: String,
    pub party_size: i64,
    /// 入队时间 (Unix millis)
    pub enqueued_at: i64,
}

/// First-in-first-out holding area for demand that cannot be seated yet.
///
/// The queue performs no deduplication; booking requests are gated upstream
/// by the "already has a table" check, and the queue itself stays tolerant.
#[derive(Debug, Default)]
pub struct Waitlist {
    entries: VecDeque<WaitlistEntry>,
}

impl Waitlist {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append a guest to the tail of the line.
    pub fn enqueue(&mut self, guest_id: impl Into<String>, party_size: i64) {
        self.entries.push_back(WaitlistEntry {
            guest_id: guest_id.into(),
            party_size,
            enqueued_at: now_millis(),
        });
    }

    pub fn peek_head(&self) -> Option<&WaitlistEntry> {
        self.entries.front()
    }

    /// Remove the head of the line; no-op when empty.
    pub fn dequeue_head(&mut self) -> Option<WaitlistEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot in arrival order.
    pub fn entries(&self) -> Vec<WaitlistEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let mut waitlist = Waitlist::new();
        waitlist.enqueue("ana", 2);
        waitlist.enqueue("bruno", 4);

        assert_eq!(waitlist.peek_head().unwrap().guest_id, "ana");
        assert_eq!(waitlist.dequeue_head().unwrap().guest_id, "ana");
        assert_eq!(waitlist.peek_head().unwrap().guest_id, "bruno");
    }

    #[test]
    fn dequeue_on_empty_is_noop() {
        let mut waitlist = Waitlist::new();
        assert!(waitlist.dequeue_head().is_none());
        assert!(waitlist.is_empty());
    }

    #[test]
    fn duplicate_enqueue_is_permitted_at_queue_level() {
        // The queue itself does not enforce uniqueness; the upstream
        // already-booked gate is what keeps duplicates out in practice.
        let mut waitlist = Waitlist::new();
        waitlist.enqueue("ana", 2);
        waitlist.enqueue("ana", 2);
        assert_eq!(waitlist.len(), 2);
        assert_eq!(waitlist.dequeue_head().unwrap().guest_id, "ana");
        assert_eq!(waitlist.dequeue_head().unwrap().guest_id, "ana");
    }

    #[test]
    fn entries_snapshot_in_arrival_order() {
        let mut waitlist = Waitlist::new();
        waitlist.enqueue("ana", 2);
        waitlist.enqueue("bruno", 4);
        waitlist.enqueue("carla", 3);
        let guests: Vec<String> = waitlist
            .entries()
            .into_iter()
            .map(|e| e.guest_id)
            .collect();
        assert_eq!(guests, vec!["ana", "bruno", "carla"]);
    }
}
