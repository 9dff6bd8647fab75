//! Per-task enqueue options.

use chrono::{DateTime, Duration, Utc};

use super::payload::QUEUE_DEFAULT;

/// Retry budget used when none is given.
pub const DEFAULT_MAX_RETRY: i32 = 25;

/// Options attached to a task when it is enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    /// Maximum number of retries before the task is dead-lettered.
    pub max_retry: i32,
    /// Queue the task is placed on.
    pub queue: String,
    /// Earliest time the task may run.
    pub process_at: Option<DateTime<Utc>>,
    /// Delay relative to enqueue time; ignored when `process_at` is set.
    pub delay: Option<Duration>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            queue: QUEUE_DEFAULT.to_string(),
            process_at: None,
            delay: None,
        }
    }
}

impl TaskOptions {
    /// Sets the retry budget. Negative values are clamped to zero.
    #[must_use]
    pub fn max_retry(mut self, max_retry: i32) -> Self {
        self.max_retry = max_retry.max(0);
        self
    }

    /// Sets the queue.
    #[must_use]
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Schedules the task at an absolute time.
    #[must_use]
    pub const fn process_at(mut self, at: DateTime<Utc>) -> Self {
        self.process_at = Some(at);
        self
    }

    /// Schedules the task `delay` after it is enqueued.
    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Resolves the time the task becomes eligible, given the enqueue time.
    #[must_use]
    pub fn scheduled_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match (self.process_at, self.delay) {
            (Some(at), _) => at,
            (None, Some(delay)) => now + delay,
            (None, None) => now,
        }
    }
}
