//! End-to-end allocation flows against the persistent guest store.
//!
//! The coordinator unit tests cover the allocation rules with the in-memory
//! store double; these tests run the same flows over embedded SurrealDB,
//! including the restart-restore path.

use std::sync::Arc;
use std::time::Duration;

use floor_server::db::DbService;
use floor_server::db::models::DiningTableCreate;
use floor_server::db::repository::{DiningTableRepository, GuestRepository};
use floor_server::floor::{
    AllocationCoordinator, BookingOutcome, GuestStore, ReleaseTrigger, TableRegistry,
};

const GRACE: Duration = Duration::from_secs(1200);

/// Provision a floor in the database and build a coordinator over it the
/// same way server startup does.
async fn setup(tables: &[(i64, i64)]) -> (Arc<AllocationCoordinator>, GuestRepository, DbService) {
    let service = DbService::new_in_memory().await.unwrap();

    let table_repo = DiningTableRepository::new(service.db.clone());
    for &(no, cap) in tables {
        table_repo
            .create(DiningTableCreate {
                table_no: no,
                capacity: Some(cap),
            })
            .await
            .unwrap();
    }

    let mut registry = TableRegistry::new();
    for table in table_repo.find_all().await.unwrap() {
        registry.insert(table.table_no, table.capacity);
    }

    let guest_repo = GuestRepository::new(service.db.clone());
    let guests: Arc<dyn GuestStore> = Arc::new(guest_repo.clone());
    let coordinator = AllocationCoordinator::new(registry, guests, GRACE);
    (coordinator, guest_repo, service)
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn book_waitlist_release_drain_cycle() {
    let (coordinator, guests, _db) = setup(&[(1, 2), (2, 4)]).await;

    // A party of three gets the four-top, not the two-top.
    let outcome = coordinator.request_booking("ana", 3).await.unwrap();
    assert_eq!(outcome, BookingOutcome::Booked { table_no: 2 });

    // The two-top cannot seat four; bruno queues.
    let outcome = coordinator.request_booking("bruno", 4).await.unwrap();
    assert_eq!(outcome, BookingOutcome::Waitlisted);
    assert_eq!(coordinator.waitlist_snapshot().await.len(), 1);

    // The store reflects the link.
    let stored = guests.find_by_guest_id("ana").await.unwrap().unwrap();
    assert_eq!(stored.assigned_table, Some(2));
    assert!(!stored.checked_in);
    assert_eq!(stored.party_size, 3);

    // Check-in sticks.
    assert_eq!(coordinator.check_in("ana").await.unwrap(), 2);
    assert!(guests.checked_in("ana").await.unwrap());

    // Payment frees the four-top and bruno is seated from the line.
    coordinator
        .release_table(2, ReleaseTrigger::Payment)
        .await
        .unwrap();

    assert_eq!(guests.assigned_table("ana").await.unwrap(), None);
    assert!(!guests.checked_in("ana").await.unwrap());
    assert_eq!(guests.assigned_table("bruno").await.unwrap(), Some(2));
    assert!(coordinator.waitlist_snapshot().await.is_empty());
}

#[tokio::test]
async fn earlier_big_party_is_not_skipped_by_a_later_small_one() {
    let (coordinator, guests, _db) = setup(&[(1, 2), (2, 4)]).await;

    coordinator.request_booking("seated-a", 2).await.unwrap();
    coordinator.request_booking("seated-b", 4).await.unwrap();
    coordinator.request_booking("big-party", 4).await.unwrap();
    coordinator.request_booking("small-party", 2).await.unwrap();

    // Freeing the two-top fits only the later small party, but the head of
    // the line is the big party: nobody is seated.
    coordinator
        .release_table(1, ReleaseTrigger::Manual)
        .await
        .unwrap();
    assert_eq!(guests.assigned_table("big-party").await.unwrap(), None);
    assert_eq!(guests.assigned_table("small-party").await.unwrap(), None);
    assert_eq!(coordinator.waitlist_snapshot().await.len(), 2);

    // Freeing the four-top seats the head, then the small party takes the
    // still-free two-top in the same drain.
    coordinator
        .release_table(2, ReleaseTrigger::Manual)
        .await
        .unwrap();
    assert_eq!(guests.assigned_table("big-party").await.unwrap(), Some(2));
    assert_eq!(guests.assigned_table("small-party").await.unwrap(), Some(1));
    assert!(coordinator.waitlist_snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_show_is_reclaimed_and_replaced_from_the_line() {
    let (coordinator, guests, _db) = setup(&[(1, 2)]).await;

    coordinator.request_booking("no-show", 2).await.unwrap();
    coordinator.request_booking("waiting", 2).await.unwrap();

    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(guests.assigned_table("no-show").await.unwrap(), None);
    assert_eq!(guests.assigned_table("waiting").await.unwrap(), Some(1));
    assert!(coordinator.waitlist_snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn checked_in_guest_survives_the_grace_period() {
    let (coordinator, guests, _db) = setup(&[(1, 2)]).await;

    coordinator.request_booking("ana", 2).await.unwrap();
    coordinator.check_in("ana").await.unwrap();

    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(guests.assigned_table("ana").await.unwrap(), Some(1));
    let free: Vec<i64> = coordinator
        .free_tables()
        .await
        .iter()
        .map(|t| t.table_no)
        .collect();
    assert!(free.is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_restores_bookings_and_rearms_monitors() {
    let (coordinator, guests, db) = setup(&[(1, 2), (2, 4)]).await;

    coordinator.request_booking("pending", 2).await.unwrap();
    coordinator.request_booking("arrived", 4).await.unwrap();
    coordinator.check_in("arrived").await.unwrap();

    // Simulate a restart: a fresh coordinator over the same database, built
    // the way server startup rebuilds it.
    coordinator.shutdown();
    drop(coordinator);

    let table_repo = DiningTableRepository::new(db.db.clone());
    let mut registry = TableRegistry::new();
    for table in table_repo.find_all().await.unwrap() {
        registry.insert(table.table_no, table.capacity);
    }
    let store: Arc<dyn GuestStore> = Arc::new(guests.clone());
    let restarted = AllocationCoordinator::new(registry, store, GRACE);

    for guest in guests.find_assigned().await.unwrap() {
        let table_no = guest.assigned_table.unwrap();
        assert!(
            restarted
                .restore_booking(&guest.guest_id, table_no, guest.checked_in)
                .await
        );
    }
    assert!(restarted.free_tables().await.is_empty());

    // The pending guest's grace period restarted with the process; the
    // checked-in guest is left alone.
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(guests.assigned_table("pending").await.unwrap(), None);
    assert_eq!(guests.assigned_table("arrived").await.unwrap(), Some(2));
    let free: Vec<i64> = restarted
        .free_tables()
        .await
        .iter()
        .map(|t| t.table_no)
        .collect();
    assert_eq!(free, vec![1]);
}
