//! Background task model.
//!
//! Tasks are durable records produced inside business transactions and
//! consumed by the worker pool. This module describes them without touching
//! storage: the routing names and payloads, enqueue options, the lifecycle
//! state machine, the retry backoff and the weighted queue order.

mod options;
mod payload;
mod queue;
mod retry;
mod state;

#[cfg(test)]
mod retry_props;

pub use options::{DEFAULT_MAX_RETRY, TaskOptions};
pub use payload::{QUEUE_CRITICAL, QUEUE_DEFAULT, SendVerifyEmailPayload, TASK_SEND_VERIFY_EMAIL};
pub use queue::{QueueWeight, weighted_order};
pub use retry::RetryPolicy;
pub use state::{TaskState, UnknownTaskState};
