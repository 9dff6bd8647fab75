//! Task broker operations.
//!
//! The `tasks` table is the queue. Producers insert rows through the same
//! handle as their business writes; workers claim rows with an optimistic
//! state check so a task is leased by at most one worker at a time.

use chrono::{DateTime, Utc};
use corebank_core::task::TaskState;
use corebank_shared::ListParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, prelude::DateTimeWithTimeZone, sea_query::Expr,
};

use super::Queries;
use crate::entities::tasks;
use crate::error::StoreError;

/// Candidates tried per claim before giving up on a contended queue.
const CLAIM_ATTEMPTS: usize = 3;

/// A task ready to be inserted into the broker.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Routing name.
    pub kind: String,
    /// Serialized payload.
    pub payload: Vec<u8>,
    /// Target queue.
    pub queue: String,
    /// Retry budget.
    pub max_retry: i32,
    /// Earliest execution time.
    pub process_at: DateTime<Utc>,
}

fn no_time() -> Option<DateTimeWithTimeZone> {
    None
}

/// Storage strings of the states `next` may legally be entered from.
fn entered_from(next: TaskState) -> Vec<&'static str> {
    TaskState::predecessors(next).map(TaskState::as_str).collect()
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Inserts a task in the `Queued` state.
    pub async fn insert_task(&self, task: NewTask) -> Result<tasks::Model, StoreError> {
        let now = Utc::now().into();
        let model = tasks::ActiveModel {
            kind: Set(task.kind),
            payload: Set(task.payload),
            queue: Set(task.queue),
            state: Set(TaskState::Queued.as_str().to_string()),
            retried: Set(0),
            max_retry: Set(task.max_retry),
            last_error: Set(None),
            process_at: Set(task.process_at.into()),
            lease_expires_at: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model.insert(self.conn).await?;
        self.record_enqueue();
        Ok(inserted)
    }

    /// Gets a task by id.
    pub async fn get_task(&self, id: i64) -> Result<tasks::Model, StoreError> {
        tasks::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("task", id))
    }

    /// Lists tasks in a given state, oldest first.
    pub async fn list_tasks_by_state(
        &self,
        state: TaskState,
        params: ListParams,
    ) -> Result<Vec<tasks::Model>, StoreError> {
        Ok(tasks::Entity::find()
            .filter(tasks::Column::State.eq(state.as_str()))
            .order_by_asc(tasks::Column::Id)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.conn)
            .await?)
    }

    /// Claims the next due task of `queue`, leasing it until `lease_until`.
    ///
    /// Returns `None` when the queue has nothing due. The claim only succeeds
    /// if the row is still in the state it was read in, so two workers racing
    /// for the same row cannot both win.
    pub async fn claim_task(
        &self,
        queue: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<Option<tasks::Model>, StoreError> {
        let now: DateTimeWithTimeZone = now.into();
        let lease_until: DateTimeWithTimeZone = lease_until.into();

        for _ in 0..CLAIM_ATTEMPTS {
            let Some(candidate) = tasks::Entity::find()
                .filter(tasks::Column::Queue.eq(queue))
                .filter(
                    tasks::Column::State.is_in(TaskState::claimable().map(TaskState::as_str)),
                )
                .filter(tasks::Column::ProcessAt.lte(now))
                .order_by_asc(tasks::Column::ProcessAt)
                .order_by_asc(tasks::Column::Id)
                .one(self.conn)
                .await?
            else {
                return Ok(None);
            };

            debug_assert!(
                candidate
                    .task_state()
                    .is_ok_and(|state| state.can_transition_to(TaskState::InProgress))
            );

            let result = tasks::Entity::update_many()
                .col_expr(tasks::Column::State, Expr::value(TaskState::InProgress.as_str()))
                .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(Some(lease_until)))
                .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
                .filter(tasks::Column::Id.eq(candidate.id))
                .filter(tasks::Column::State.eq(candidate.state.as_str()))
                .filter(tasks::Column::ProcessAt.lte(now))
                .exec(self.conn)
                .await?;

            if result.rows_affected == 1 {
                return self.get_task(candidate.id).await.map(Some);
            }
        }

        Ok(None)
    }

    /// Marks an in-progress task completed. Returns `false` if the lease was lost.
    pub async fn complete_task(&self, id: i64) -> Result<bool, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::Completed.as_str()))
            .col_expr(tasks::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(no_time()))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.is_in(entered_from(TaskState::Completed)))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Reschedules an in-progress task after a failed attempt.
    pub async fn retry_task(
        &self,
        id: i64,
        next_at: DateTime<Utc>,
        error: &str,
    ) -> Result<bool, StoreError> {
        let next_at: DateTimeWithTimeZone = next_at.into();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::Retrying.as_str()))
            .col_expr(tasks::Column::Retried, Expr::col(tasks::Column::Retried).add(1))
            .col_expr(tasks::Column::ProcessAt, Expr::value(next_at))
            .col_expr(tasks::Column::LastError, Expr::value(Some(error.to_string())))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(no_time()))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.is_in(entered_from(TaskState::Retrying)))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Moves an in-progress task to the dead-letter state.
    pub async fn dead_letter_task(&self, id: i64, error: &str) -> Result<bool, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::DeadLettered.as_str()))
            .col_expr(tasks::Column::LastError, Expr::value(Some(error.to_string())))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(no_time()))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.is_in(entered_from(TaskState::DeadLettered)))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Returns tasks whose lease expired to the queue.
    ///
    /// A task whose worker died counts the lost attempt: it is dead-lettered if
    /// the budget is spent, otherwise made due again immediately. Returns the
    /// number of recovered tasks.
    pub async fn recover_expired_leases(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let now: DateTimeWithTimeZone = now.into();
        let lease_lost = Some("lease expired".to_string());

        let dead = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::DeadLettered.as_str()))
            .col_expr(tasks::Column::LastError, Expr::value(lease_lost.clone()))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(no_time()))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
            .filter(tasks::Column::State.is_in(entered_from(TaskState::DeadLettered)))
            .filter(tasks::Column::LeaseExpiresAt.lt(now))
            .filter(Expr::col(tasks::Column::Retried).gte(Expr::col(tasks::Column::MaxRetry)))
            .exec(self.conn)
            .await?;

        let retried = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::Retrying.as_str()))
            .col_expr(tasks::Column::Retried, Expr::col(tasks::Column::Retried).add(1))
            .col_expr(tasks::Column::ProcessAt, Expr::value(now))
            .col_expr(tasks::Column::LastError, Expr::value(lease_lost))
            .col_expr(tasks::Column::LeaseExpiresAt, Expr::value(no_time()))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
            .filter(tasks::Column::State.is_in(entered_from(TaskState::Retrying)))
            .filter(tasks::Column::LeaseExpiresAt.lt(now))
            .exec(self.conn)
            .await?;

        Ok(dead.rows_affected + retried.rows_affected)
    }

    /// Puts a dead-lettered task back on its queue with a fresh retry budget.
    pub async fn requeue_dead_task(&self, id: i64) -> Result<bool, StoreError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = tasks::Entity::update_many()
            .col_expr(tasks::Column::State, Expr::value(TaskState::Queued.as_str()))
            .col_expr(tasks::Column::Retried, Expr::value(0))
            .col_expr(tasks::Column::ProcessAt, Expr::value(now))
            .col_expr(tasks::Column::UpdatedAt, Expr::value(now))
            .filter(tasks::Column::Id.eq(id))
            .filter(tasks::Column::State.is_in(entered_from(TaskState::Queued)))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
