//! Concurrent and racing writers, and abandoned callers.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

mod common;

use accounts_core::{Account, Clock};
use accounts_lifecycle::AccountError;
use accounts_testing::test_clock;
use chrono::Duration;
use common::Harness;
use std::time::Duration as StdDuration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_insert_exactly_once() {
    let h = Harness::new();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let manager = h.manager.clone();
        tasks.push(tokio::spawn(async move {
            manager.create("acct-1", &format!("Name {i}"), None).await
        }));
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.expect("join").expect("create"));
    }

    let created: Vec<_> = outcomes.iter().filter(|o| o.created).collect();
    assert_eq!(created.len(), 1);
    assert!(outcomes.iter().all(|o| o.account == created[0].account));
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.event_types_for("acct-1").await, vec!["AccountCreated.v1"]);
}

#[tokio::test]
async fn losing_an_insert_race_returns_the_winner() {
    let h = Harness::new();
    let winner = Account::new("acct-1", "Winner", None, test_clock().now());
    h.store.inject_racing_insert(winner.clone());

    let outcome = h.manager.create("acct-1", "Loser", None).await.expect("create");

    assert!(!outcome.created);
    assert_eq!(outcome.account, winner);
    assert!(h.events().await.is_empty());
}

#[tokio::test]
async fn update_retries_on_top_of_concurrent_write() {
    let h = Harness::new();
    let created = h.manager.create("acct-1", "Acme", None).await.expect("create").account;

    let mut concurrent = created.clone();
    concurrent.active = false;
    concurrent.updated_at = created.updated_at + Duration::seconds(30);
    h.store.inject_racing_save(concurrent.clone());

    let updated = h.manager.update("acct-1", "Acme Corp", None).await.expect("update");

    assert_eq!(updated.name, "Acme Corp");
    assert!(!updated.active, "concurrent inactivation must not be lost");
    assert!(updated.updated_at > concurrent.updated_at);
    assert_eq!(h.manager.get("acct-1").await.expect("get"), updated);
}

#[tokio::test]
async fn inactivate_sees_concurrent_inactivation_as_idempotent() {
    let h = Harness::new();
    let created = h.manager.create("acct-1", "Acme", None).await.expect("create").account;

    let mut concurrent = created.clone();
    concurrent.active = false;
    concurrent.updated_at = created.updated_at + Duration::seconds(1);
    h.store.inject_racing_save(concurrent);

    let result = h.manager.inactivate("acct-1", "x").await.expect("inactivate");

    assert!(result.success);
    assert_eq!(result.message, "Account already inactive");
    assert_eq!(h.event_types_for("acct-1").await, vec!["AccountCreated.v1"]);
}

#[tokio::test]
async fn persistent_contention_is_internal() {
    let h = Harness::new();
    let created = h.manager.create("acct-1", "Acme", None).await.expect("create").account;
    let manager = h.manager.clone().with_max_write_attempts(1);

    let mut concurrent = created.clone();
    concurrent.name = "Other writer".to_string();
    concurrent.updated_at = created.updated_at + Duration::seconds(1);
    h.store.inject_racing_save(concurrent);

    let result = manager.update("acct-1", "Acme Corp", None).await;

    assert!(matches!(result, Err(AccountError::Internal(_))));
    assert_eq!(h.event_types_for("acct-1").await, vec!["AccountCreated.v1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_status_changes_serialize() {
    let h = Harness::new();
    h.manager.create("acct-1", "Acme", None).await.expect("create");
    let contended = h.manager.clone().with_max_write_attempts(1_000);

    let mut tasks = Vec::new();
    for i in 0..20 {
        let manager = contended.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                manager.inactivate("acct-1", "flip").await
            } else {
                manager.reactivate("acct-1", "flop").await
            }
        }));
    }
    for task in tasks {
        let change = task.await.expect("join").expect("status change");
        assert!(change.success);
    }

    let types = h.event_types_for("acct-1").await;
    let final_state = h.manager.get("acct-1").await.expect("get");

    // Accepted transitions alternate starting from active, so the final state
    // follows from how many of each were emitted.
    let inactivated = types.iter().filter(|t| *t == "AccountInactivated.v1").count();
    let reactivated = types.iter().filter(|t| *t == "AccountReactivated.v1").count();
    if final_state.active {
        assert_eq!(inactivated, reactivated);
    } else {
        assert_eq!(inactivated, reactivated + 1);
    }
}

#[tokio::test]
async fn abandoned_create_still_completes() {
    let h = Harness::new();

    // The caller stops waiting right after the operation has been dispatched.
    let abandoned = tokio::time::timeout(
        StdDuration::ZERO,
        h.manager.create("acct-1", "Acme", None),
    )
    .await;
    drop(abandoned);

    let mut stored = None;
    for _ in 0..100 {
        stored = h.store.snapshot().into_iter().next();
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }

    assert_eq!(stored.map(|a| a.name), Some("Acme".to_string()));
    assert_eq!(h.event_types_for("acct-1").await, vec!["AccountCreated.v1"]);
}

#[tokio::test]
async fn different_accounts_do_not_interfere() {
    let h = Harness::new();

    let (a, b) = tokio::join!(
        h.manager.create("acct-a", "A", None),
        h.manager.create("acct-b", "B", None)
    );

    assert!(a.expect("create a").created);
    assert!(b.expect("create b").created);
    assert_eq!(h.manager.count(None, false).await.expect("count"), 2);
}
