//! Task type names and their payloads.

use serde::{Deserialize, Serialize};

/// Routing name of the verification email task.
pub const TASK_SEND_VERIFY_EMAIL: &str = "task:send_verify_email";

/// Queue for tasks a user is actively waiting on.
pub const QUEUE_CRITICAL: &str = "critical";

/// Queue used when no queue is requested.
pub const QUEUE_DEFAULT: &str = "default";

/// Payload of [`TASK_SEND_VERIFY_EMAIL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendVerifyEmailPayload {
    /// User to send the verification email to.
    pub username: String,
}
