//! Floor Events
//!
//! Every table-state transition is published on a broadcast channel so that
//! collaborators (presentation layer, audit consumers) can observe why a
//! table changed hands. Events carry guest id, table number and party size
//! where applicable.

use serde::Serialize;

/// Event broadcast channel capacity (一个晚市的事件量远小于此)
pub const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// What caused a table to be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseTrigger {
    /// Staff freed the table by hand.
    Manual,
    /// Payment completed for the table's bill.
    Payment,
    /// The reservation grace period expired without a check-in.
    Timeout,
}

impl std::fmt::Display for ReleaseTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseTrigger::Manual => write!(f, "manual"),
            ReleaseTrigger::Payment => write!(f, "payment"),
            ReleaseTrigger::Timeout => write!(f, "timeout"),
        }
    }
}

/// 桌台状态变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FloorEvent {
    /// A booking request was satisfied immediately.
    Booked {
        guest_id: String,
        table_no: i64,
        party_size: i64,
    },
    /// No table fitted; the guest joined the waiting line.
    Waitlisted { guest_id: String, party_size: i64 },
    /// The guest confirmed arrival, disarming the reclaim monitor.
    CheckedIn { guest_id: String, table_no: i64 },
    /// A table returned to the free pool (manual or payment trigger).
    Released {
        table_no: i64,
        trigger: ReleaseTrigger,
    },
    /// The grace period expired and the table was reclaimed.
    TimeoutReclaimed { guest_id: String, table_no: i64 },
    /// A freed table was matched against the head of the waitlist.
    DrainMatched {
        guest_id: String,
        table_no: i64,
        party_size: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = FloorEvent::Booked {
            guest_id: "ana".into(),
            table_no: 3,
            party_size: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "booked");
        assert_eq!(json["table_no"], 3);

        let event = FloorEvent::Released {
            table_no: 3,
            trigger: ReleaseTrigger::Payment,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["trigger"], "payment");
    }
}
