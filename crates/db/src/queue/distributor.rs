//! Producer side of the task queue.

use std::sync::Arc;

use chrono::Utc;
use corebank_core::task::TaskOptions;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tokio::sync::{Notify, futures::Notified};

use crate::entities::tasks;
use crate::error::StoreError;
use crate::repositories::{NewTask, Queries};

/// Enqueues typed tasks and wakes idle workers once they are committed.
///
/// Tasks are written through the caller's [`Queries`], so inside
/// [`Store::execute`](crate::Store::execute) they become visible exactly when
/// the surrounding unit of work commits and vanish if it rolls back.
#[derive(Debug, Clone, Default)]
pub struct TaskDistributor {
    wakeup: Arc<Notify>,
}

impl TaskDistributor {
    /// Creates a distributor with its own wake-up channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `payload` and inserts it as a task of type `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Enqueue` if the payload cannot be serialized or
    /// the insert fails; inside a unit of work this aborts the transaction.
    pub async fn distribute<C, P>(
        &self,
        queries: &Queries<'_, C>,
        kind: &str,
        payload: &P,
        options: TaskOptions,
    ) -> Result<tasks::Model, StoreError>
    where
        C: ConnectionTrait,
        P: Serialize + Sync,
    {
        let payload =
            serde_json::to_vec(payload).map_err(|e| StoreError::Enqueue(e.to_string()))?;
        let process_at = options.scheduled_at(Utc::now());

        let task = queries
            .insert_task(NewTask {
                kind: kind.to_string(),
                payload,
                queue: options.queue,
                max_retry: options.max_retry,
                process_at,
            })
            .await
            .map_err(|e| StoreError::Enqueue(e.to_string()))?;

        tracing::debug!(
            task_id = task.id,
            task_type = %task.kind,
            queue = %task.queue,
            max_retry = task.max_retry,
            "enqueued task"
        );

        Ok(task)
    }

    /// Wakes every worker currently waiting for work.
    pub fn committed(&self) {
        self.wakeup.notify_waiters();
    }

    /// Future resolving on the next [`TaskDistributor::committed`] call.
    pub fn notified(&self) -> Notified<'_> {
        self.wakeup.notified()
    }
}
