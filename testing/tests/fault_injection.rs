//! Tests for the fault-injecting store wrapper and seeding fixtures.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use campus_ledger_core::{ErrorKind, LedgerStore};
use campus_ledger_runtime::InMemoryLedgerStore;
use campus_ledger_testing::{UnavailableStore, seed_campus};
use std::sync::Arc;

fn wrapped() -> UnavailableStore {
    UnavailableStore::new(Arc::new(InMemoryLedgerStore::new()))
}

#[tokio::test]
async fn test_seed_campus_creates_students_in_order() {
    let store = wrapped();
    let campus = seed_campus(&store, "North", &["Asha", "Ben"]).await.unwrap();

    assert_eq!(campus.college.name, "North");
    let names: Vec<_> = campus.students.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Asha", "Ben"]);
    assert!(campus.students.iter().all(|s| s.college_id == campus.college.id));
    assert_eq!(store.calls(), 3);
}

#[tokio::test]
async fn test_fail_next_recovers_after_count() {
    let store = wrapped();
    store.fail_next(2);

    for _ in 0..2 {
        let err = store.ping().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
    store.ping().await.unwrap();
    assert_eq!(store.calls(), 3);
}

#[tokio::test]
async fn test_down_until_restored() {
    let store = UnavailableStore::down(Arc::new(InMemoryLedgerStore::new()));
    let err = store.insert_college("South".to_string()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

    store.set_down(false);
    store.insert_college("South".to_string()).await.unwrap();
    assert_eq!(store.list_colleges().await.unwrap().len(), 1);
}
