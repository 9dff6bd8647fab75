//! Shared fixtures for processor integration tests.

#![allow(dead_code)]

use std::time::Duration;

use corebank_core::task::{QueueWeight, RetryPolicy};
use corebank_db::Store;
use corebank_db::entities::tasks;
use corebank_db::migration::{Migrator, MigratorTrait};
use corebank_worker::ProcessorConfig;
use sea_orm::{ConnectOptions, Database};

pub async fn setup_store() -> Store {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    Store::new(db)
}

/// Fast settings so retries and shutdown finish within a test.
pub fn test_config() -> ProcessorConfig {
    ProcessorConfig {
        concurrency: 2,
        queues: vec![
            QueueWeight::new("critical", 10),
            QueueWeight::new("default", 5),
        ],
        poll_interval: Duration::from_millis(20),
        task_timeout: Duration::from_secs(2),
        lease: Duration::from_secs(30),
        shutdown_timeout: Duration::from_secs(2),
        retry: RetryPolicy::new(5, 20),
        recover_interval: Duration::from_secs(1),
    }
}

/// Polls until the task reaches `state` and returns it.
pub async fn wait_for_state(store: &Store, id: i64, state: &str) -> tasks::Model {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let task = store.queries().get_task(id).await.expect("task exists");
        if task.state == state {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} stuck in state {} (waiting for {state})",
            task.state
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
