//! Worker pool.
//!
//! Each worker loops: order the queues by weight, claim the first due task,
//! run its handler under a deadline, record the outcome. When nothing is due
//! it sleeps until a commit wakes it, the poll interval elapses or shutdown
//! is requested. A separate recoverer returns tasks whose lease expired
//! (their worker died mid-attempt) to the queue.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use corebank_core::task::{QueueWeight, RetryPolicy, weighted_order};
use corebank_db::entities::tasks;
use corebank_db::{Store, StoreError};
use corebank_shared::WorkerConfig;
use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::handler::{HandlerError, HandlerRegistry};

const MIN_RECOVER_INTERVAL: Duration = Duration::from_secs(1);

/// Headroom a lease keeps over the handler deadline, so a running attempt is
/// never recovered from under its worker.
const LEASE_MARGIN: Duration = Duration::from_secs(5);

/// Runtime settings of the processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Queues and their priority weights.
    pub queues: Vec<QueueWeight>,
    /// Idle poll interval.
    pub poll_interval: Duration,
    /// Deadline for one handler invocation.
    pub task_timeout: Duration,
    /// Lease granted on claim. Always outlives `task_timeout`.
    pub lease: Duration,
    /// How long shutdown waits for in-flight handlers.
    pub shutdown_timeout: Duration,
    /// Backoff between attempts.
    pub retry: RetryPolicy,
    /// How often expired leases are recovered.
    pub recover_interval: Duration,
}

impl From<&WorkerConfig> for ProcessorConfig {
    fn from(config: &WorkerConfig) -> Self {
        let task_timeout = Duration::from_secs(config.task_timeout_secs);
        let lease = Duration::from_secs(config.lease_secs).max(task_timeout + LEASE_MARGIN);
        Self {
            concurrency: config.concurrency.max(1),
            queues: config
                .queues
                .iter()
                .map(|(name, weight)| QueueWeight::new(name.clone(), *weight))
                .collect(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            task_timeout,
            lease,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            retry: RetryPolicy::new(config.retry_base_ms, config.retry_max_ms),
            recover_interval: (lease / 2).max(MIN_RECOVER_INTERVAL),
        }
    }
}

/// Pool of workers executing queued tasks.
#[derive(Debug, Clone)]
pub struct TaskProcessor {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Store,
    registry: HandlerRegistry,
    config: ProcessorConfig,
}

impl TaskProcessor {
    /// Creates a processor over `store` dispatching to `registry`.
    #[must_use]
    pub fn new(store: Store, registry: HandlerRegistry, config: ProcessorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                registry,
                config,
            }),
        }
    }

    /// Runs the pool until `shutdown` is cancelled.
    ///
    /// After cancellation no new task is claimed; in-flight handlers get
    /// `shutdown_timeout` to finish before they are aborted. An aborted task
    /// keeps its lease and is recovered once it expires.
    pub async fn run(self, shutdown: CancellationToken) {
        let config = &self.inner.config;
        info!(
            concurrency = config.concurrency,
            queues = ?config.queues.iter().map(|q| q.name.as_str()).collect::<Vec<_>>(),
            kinds = ?self.inner.registry.kinds(),
            "task processor started"
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..config.concurrency {
            workers.spawn(Arc::clone(&self.inner).work(worker_id, shutdown.clone()));
        }
        workers.spawn(Arc::clone(&self.inner).recover_leases(shutdown.clone()));

        shutdown.cancelled().await;
        info!("task processor shutting down");

        if tokio::time::timeout(config.shutdown_timeout, drain(&mut workers))
            .await
            .is_err()
        {
            warn!(
                in_flight = workers.len(),
                "shutdown timeout elapsed, aborting in-flight tasks"
            );
            workers.abort_all();
            drain(&mut workers).await;
        }

        info!("task processor stopped");
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            if err.is_panic() {
                error!(error = %err, "worker panicked");
            }
        }
    }
}

impl Inner {
    async fn work(self: Arc<Self>, worker_id: usize, shutdown: CancellationToken) {
        debug!(worker_id, "worker started");

        while !shutdown.is_cancelled() {
            // Subscribe before polling so a commit between poll and wait is not missed
            let notified = self.store.distributor().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => warn!(worker_id, error = %err, "failed to claim task"),
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = notified.as_mut() => {}
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        debug!(worker_id, "worker stopped");
    }

    /// Claims and processes at most one task. Returns whether one was found.
    async fn process_next(&self) -> Result<bool, StoreError> {
        let order = weighted_order(&self.config.queues, &mut rand::rng());
        let now = Utc::now();
        let lease_until = now + TimeDelta::from_std(self.config.lease).unwrap_or(TimeDelta::hours(1));

        for queue in order {
            let claimed = self
                .store
                .queries()
                .claim_task(&queue, now, lease_until)
                .await?;

            if let Some(task) = claimed {
                let span = info_span!(
                    "task",
                    task_id = task.id,
                    task_type = %task.kind,
                    queue = %task.queue,
                    retried = task.retried,
                );
                self.process(task).instrument(span).await;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn process(&self, task: tasks::Model) {
        let q = self.store.queries();

        let Some(handler) = self.registry.get(&task.kind) else {
            warn!("no handler registered for task type, dead-lettering");
            log_transition(q.dead_letter_task(task.id, "unknown task type").await);
            return;
        };

        // A panicking handler must not take its worker down with it
        let attempt = AssertUnwindSafe(handler.handle(&task)).catch_unwind();
        let outcome = match tokio::time::timeout(self.config.task_timeout, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => {
                error!(panic = panic_message(panic.as_ref()), "task handler panicked");
                Err(HandlerError::Retry("handler panicked".to_string()))
            }
            Err(_) => Err(HandlerError::Retry("handler timed out".to_string())),
        };

        let transition = match outcome {
            Ok(()) => {
                info!("task completed");
                q.complete_task(task.id).await
            }
            Err(HandlerError::SkipRetry(reason)) => {
                warn!(error = %reason, "task failed permanently, dead-lettering");
                q.dead_letter_task(task.id, &reason).await
            }
            Err(HandlerError::Retry(reason)) if task.retries_exhausted() => {
                error!(
                    error = %reason,
                    max_retry = task.max_retry,
                    "task retries exhausted, dead-lettering"
                );
                q.dead_letter_task(task.id, &reason).await
            }
            Err(HandlerError::Retry(reason)) => {
                let retried = u32::try_from(task.retried).unwrap_or_default();
                let delay = self.config.retry.delay(retried, &mut rand::rng());
                let next_at =
                    Utc::now() + TimeDelta::from_std(delay).unwrap_or(TimeDelta::zero());
                warn!(error = %reason, retry_in = ?delay, "task failed, scheduling retry");
                q.retry_task(task.id, next_at, &reason).await
            }
        };

        log_transition(transition);
    }

    async fn recover_leases(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.recover_interval);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.store.queries().recover_expired_leases(Utc::now()).await {
                Ok(0) => {}
                Ok(recovered) => {
                    warn!(recovered, "recovered tasks with expired leases");
                    self.store.distributor().committed();
                }
                Err(err) => warn!(error = %err, "failed to recover expired leases"),
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn log_transition(result: Result<bool, StoreError>) {
    match result {
        Ok(true) => {}
        Ok(false) => warn!("task lease lost before its outcome was recorded"),
        Err(err) => error!(error = %err, "failed to record task outcome"),
    }
}
