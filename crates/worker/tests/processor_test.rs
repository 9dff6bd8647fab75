//! Task processor integration tests.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{setup_store, test_config, wait_for_state};
use corebank_core::task::TaskOptions;
use corebank_db::entities::tasks;
use corebank_worker::{HandlerError, HandlerRegistry, TaskHandler, TaskProcessor};
use serde_json::json;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Fails the first `failures` attempts, then succeeds.
#[derive(Clone)]
struct Flaky {
    attempts: Arc<AtomicUsize>,
    failures: usize,
    permanent: bool,
}

impl Flaky {
    fn new(failures: usize) -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            failures,
            permanent: false,
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for Flaky {
    async fn handle(&self, _task: &tasks::Model) -> Result<(), HandlerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            if self.permanent {
                return Err(HandlerError::skip_retry("bad input"));
            }
            return Err(HandlerError::retry(format!("attempt {attempt} failed")));
        }
        Ok(())
    }
}

/// Signals once it starts, then sleeps.
struct Slow {
    started: Arc<Notify>,
    finished: Arc<AtomicUsize>,
    duration: Duration,
}

#[async_trait]
impl TaskHandler for Slow {
    async fn handle(&self, _task: &tasks::Model) -> Result<(), HandlerError> {
        self.started.notify_one();
        tokio::time::sleep(self.duration).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Panics on every attempt.
struct Panics;

#[async_trait]
impl TaskHandler for Panics {
    async fn handle(&self, task: &tasks::Model) -> Result<(), HandlerError> {
        panic!("handler bug on task {}", task.id);
    }
}

fn spawn(
    processor: TaskProcessor,
) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(processor.run(shutdown.clone()));
    (shutdown, handle)
}

#[tokio::test]
async fn test_flaky_task_completes_after_retries() {
    let store = setup_store().await;
    let handler = Flaky::new(2);
    let registry = HandlerRegistry::new().register("task:flaky", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let task = store
        .enqueue("task:flaky", json!({"n": 1}), TaskOptions::default().max_retry(5))
        .await
        .unwrap();

    let done = wait_for_state(&store, task.id, "completed").await;
    assert_eq!(handler.attempts(), 3);
    assert_eq!(done.retried, 2);
    assert!(done.completed_at.is_some());
    assert!(done.lease_expires_at.is_none());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_unknown_task_type_is_dead_lettered() {
    let store = setup_store().await;
    let (shutdown, handle) = spawn(TaskProcessor::new(
        store.clone(),
        HandlerRegistry::new(),
        test_config(),
    ));

    let task = store
        .enqueue("task:nobody_handles_this", json!({}), TaskOptions::default())
        .await
        .unwrap();

    let dead = wait_for_state(&store, task.id, "dead").await;
    assert_eq!(dead.last_error.as_deref(), Some("unknown task type"));
    assert_eq!(dead.retried, 0);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_exhausted_retries_are_dead_lettered() {
    let store = setup_store().await;
    let handler = Flaky::new(usize::MAX);
    let registry = HandlerRegistry::new().register("task:broken", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let task = store
        .enqueue("task:broken", json!({}), TaskOptions::default().max_retry(2))
        .await
        .unwrap();

    let dead = wait_for_state(&store, task.id, "dead").await;
    assert_eq!(handler.attempts(), 3);
    assert_eq!(dead.retried, 2);
    assert_eq!(dead.last_error.as_deref(), Some("attempt 2 failed"));

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_skip_retry_dead_letters_immediately() {
    let store = setup_store().await;
    let handler = Flaky {
        permanent: true,
        ..Flaky::new(usize::MAX)
    };
    let registry = HandlerRegistry::new().register("task:invalid", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let task = store
        .enqueue("task:invalid", json!({}), TaskOptions::default().max_retry(10))
        .await
        .unwrap();

    let dead = wait_for_state(&store, task.id, "dead").await;
    assert_eq!(handler.attempts(), 1);
    assert_eq!(dead.retried, 0);
    assert_eq!(dead.last_error.as_deref(), Some("bad input"));

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_tasks_on_every_queue_are_processed() {
    let store = setup_store().await;
    let handler = Flaky::new(0);
    let registry = HandlerRegistry::new().register("task:any", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let mut ids = Vec::new();
    for queue in ["critical", "default", "critical", "default"] {
        let task = store
            .enqueue("task:any", json!({}), TaskOptions::default().queue(queue))
            .await
            .unwrap();
        ids.push(task.id);
    }

    for id in ids {
        wait_for_state(&store, id, "completed").await;
    }
    assert_eq!(handler.attempts(), 4);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_delayed_task_waits_until_due() {
    let store = setup_store().await;
    let handler = Flaky::new(0);
    let registry = HandlerRegistry::new().register("task:later", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let task = store
        .enqueue(
            "task:later",
            json!({}),
            TaskOptions::default().delay(chrono::Duration::milliseconds(300)),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handler.attempts(), 0);

    wait_for_state(&store, task.id, "completed").await;
    assert_eq!(handler.attempts(), 1);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_task() {
    let store = setup_store().await;
    let started = Arc::new(Notify::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let registry = HandlerRegistry::new().register(
        "task:slow",
        Slow {
            started: Arc::clone(&started),
            finished: Arc::clone(&finished),
            duration: Duration::from_millis(200),
        },
    );
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let task = store
        .enqueue("task:slow", json!({}), TaskOptions::default())
        .await
        .unwrap();
    started.notified().await;

    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    let done = store.queries().get_task(task.id).await.unwrap();
    assert_eq!(done.state, "completed");
}

#[tokio::test]
async fn test_shutdown_timeout_aborts_in_flight_task() {
    let store = setup_store().await;
    let started = Arc::new(Notify::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let registry = HandlerRegistry::new().register(
        "task:stuck",
        Slow {
            started: Arc::clone(&started),
            finished: Arc::clone(&finished),
            duration: Duration::from_secs(60),
        },
    );
    let mut config = test_config();
    config.task_timeout = Duration::from_secs(120);
    config.shutdown_timeout = Duration::from_millis(100);
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, config));

    let task = store
        .enqueue("task:stuck", json!({}), TaskOptions::default())
        .await
        .unwrap();
    started.notified().await;

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("processor should stop after the shutdown timeout")
        .unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), 0);
    let leased = store.queries().get_task(task.id).await.unwrap();
    assert_eq!(leased.state, "active");
    assert!(leased.lease_expires_at.is_some());
}

#[tokio::test]
async fn test_handler_timeout_counts_as_retry() {
    let store = setup_store().await;
    let started = Arc::new(Notify::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let registry = HandlerRegistry::new().register(
        "task:hangs",
        Slow {
            started,
            finished: Arc::clone(&finished),
            duration: Duration::from_secs(60),
        },
    );
    let mut config = test_config();
    config.task_timeout = Duration::from_millis(50);
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, config));

    let task = store
        .enqueue("task:hangs", json!({}), TaskOptions::default().max_retry(1))
        .await
        .unwrap();

    let dead = wait_for_state(&store, task.id, "dead").await;
    assert_eq!(dead.retried, 1);
    assert_eq!(dead.last_error.as_deref(), Some("handler timed out"));
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_workers() {
    let store = setup_store().await;
    let handler = Flaky::new(0);
    let registry = HandlerRegistry::new()
        .register("task:panics", Panics)
        .register("task:ok", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    // One panicking task per worker, then a healthy one
    let mut panicking = Vec::new();
    for _ in 0..2 {
        let task = store
            .enqueue("task:panics", json!({}), TaskOptions::default().max_retry(1))
            .await
            .unwrap();
        panicking.push(task.id);
    }
    let ok = store
        .enqueue("task:ok", json!({}), TaskOptions::default())
        .await
        .unwrap();

    wait_for_state(&store, ok.id, "completed").await;
    assert_eq!(handler.attempts(), 1);

    for id in panicking {
        let dead = wait_for_state(&store, id, "dead").await;
        assert_eq!(dead.retried, 1);
        assert_eq!(dead.last_error.as_deref(), Some("handler panicked"));
    }

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_expired_lease_is_recovered() {
    let store = setup_store().await;
    let task = store
        .enqueue("task:orphan", json!({}), TaskOptions::default())
        .await
        .unwrap();

    // Simulate a worker that claimed the task and died
    let now = chrono::Utc::now();
    let claimed = store
        .queries()
        .claim_task("default", now, now - chrono::Duration::seconds(1))
        .await
        .unwrap()
        .expect("task is due");
    assert_eq!(claimed.id, task.id);

    let handler = Flaky::new(0);
    let registry = HandlerRegistry::new().register("task:orphan", handler.clone());
    let (shutdown, handle) = spawn(TaskProcessor::new(store.clone(), registry, test_config()));

    let done = wait_for_state(&store, task.id, "completed").await;
    assert_eq!(done.retried, 1);
    assert_eq!(handler.attempts(), 1);

    shutdown.cancel();
    handle.await.unwrap();
}
