//! Integration tests for the `tasks` broker table.

mod common;

use chrono::{Duration, Utc};
use common::setup_store;
use corebank_core::task::{TaskOptions, TaskState};
use corebank_db::Store;
use corebank_shared::ListParams;
use serde_json::json;

async fn enqueue(store: &Store, queue: &str, max_retry: i32) -> i64 {
    store
        .enqueue(
            "task:test",
            json!({"queue": queue}),
            TaskOptions::default().queue(queue).max_retry(max_retry),
        )
        .await
        .unwrap()
        .id
}

fn lease() -> chrono::DateTime<Utc> {
    Utc::now() + Duration::seconds(60)
}

#[tokio::test]
async fn test_claim_in_fifo_order_per_queue() {
    let store = setup_store().await;
    let first = enqueue(&store, "default", 3).await;
    let second = enqueue(&store, "default", 3).await;
    let other = enqueue(&store, "critical", 3).await;
    let q = store.queries();

    let claimed = q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    assert_eq!(claimed.id, first);
    assert_eq!(claimed.state, TaskState::InProgress.as_str());
    assert!(claimed.lease_expires_at.is_some());

    let next = q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    assert_eq!(next.id, second);

    assert!(q.claim_task("default", Utc::now(), lease()).await.unwrap().is_none());

    let critical = q.claim_task("critical", Utc::now(), lease()).await.unwrap().unwrap();
    assert_eq!(critical.id, other);
}

#[tokio::test]
async fn test_future_tasks_are_not_claimed() {
    let store = setup_store().await;
    store
        .enqueue(
            "task:test",
            json!({}),
            TaskOptions::default().delay(Duration::hours(1)),
        )
        .await
        .unwrap();

    let claimed = store
        .queries()
        .claim_task("default", Utc::now(), lease())
        .await
        .unwrap();
    assert!(claimed.is_none());
}

#[tokio::test]
async fn test_complete_retry_and_dead_letter() {
    let store = setup_store().await;
    let id = enqueue(&store, "default", 3).await;
    let q = store.queries();

    q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    assert!(q.retry_task(id, Utc::now(), "smtp down").await.unwrap());

    let retrying = q.get_task(id).await.unwrap();
    assert_eq!(retrying.state, TaskState::Retrying.as_str());
    assert_eq!(retrying.retried, 1);
    assert_eq!(retrying.last_error.as_deref(), Some("smtp down"));
    assert!(retrying.lease_expires_at.is_none());

    q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    assert!(q.complete_task(id).await.unwrap());
    let done = q.get_task(id).await.unwrap();
    assert_eq!(done.state, TaskState::Completed.as_str());
    assert!(done.completed_at.is_some());

    // Only in-progress tasks can transition
    assert!(!q.complete_task(id).await.unwrap());
    assert!(!q.dead_letter_task(id, "late").await.unwrap());

    let other = enqueue(&store, "default", 3).await;
    q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    assert!(q.dead_letter_task(other, "bad payload").await.unwrap());
    let dead = q
        .list_tasks_by_state(TaskState::DeadLettered, ListParams::default())
        .await
        .unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, other);
}

#[tokio::test]
async fn test_recover_expired_leases() {
    let store = setup_store().await;
    let with_budget = enqueue(&store, "default", 5).await;
    let exhausted = enqueue(&store, "default", 0).await;
    let q = store.queries();

    let expired_lease = Utc::now() - Duration::seconds(1);
    q.claim_task("default", Utc::now(), expired_lease).await.unwrap().unwrap();
    q.claim_task("default", Utc::now(), expired_lease).await.unwrap().unwrap();

    assert_eq!(q.recover_expired_leases(Utc::now()).await.unwrap(), 2);

    let recovered = q.get_task(with_budget).await.unwrap();
    assert_eq!(recovered.state, TaskState::Retrying.as_str());
    assert_eq!(recovered.retried, 1);

    let dead = q.get_task(exhausted).await.unwrap();
    assert_eq!(dead.state, TaskState::DeadLettered.as_str());

    // Active leases are left alone
    enqueue(&store, "default", 5).await;
    q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    assert_eq!(q.recover_expired_leases(Utc::now()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_requeue_dead_letter() {
    let store = setup_store().await;
    let id = enqueue(&store, "default", 0).await;
    let q = store.queries();

    q.claim_task("default", Utc::now(), lease()).await.unwrap().unwrap();
    q.dead_letter_task(id, "unknown task type").await.unwrap();

    assert!(q.requeue_dead_task(id).await.unwrap());
    let requeued = q.get_task(id).await.unwrap();
    assert_eq!(requeued.state, TaskState::Queued.as_str());
    assert_eq!(requeued.retried, 0);

    // Not dead anymore
    assert!(!q.requeue_dead_task(id).await.unwrap());
}
