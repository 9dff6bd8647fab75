//! Task lifecycle.
//!
//! ```text
//! Queued -> InProgress -> Completed
//!              |  ^
//!              v  |
//!           Retrying ---> DeadLettered
//! ```
//!
//! A task leaves `InProgress` exactly once per attempt: it completes, it is
//! rescheduled (`Retrying`, picked up again when due) or it is dead-lettered.
//! Dead letters are never dropped; an operator can requeue them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stored state string that is not a known state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task state: {0}")]
pub struct UnknownTaskState(pub String);

/// State of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting to be claimed.
    Queued,
    /// Claimed by a worker and leased.
    InProgress,
    /// Failed and scheduled for another attempt.
    Retrying,
    /// Handler succeeded.
    Completed,
    /// Retries exhausted or not retryable.
    DeadLettered,
}

impl TaskState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Queued,
        Self::InProgress,
        Self::Retrying,
        Self::Completed,
        Self::DeadLettered,
    ];

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "active",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::DeadLettered => "dead",
        }
    }

    /// States a worker may claim from.
    #[must_use]
    pub const fn is_claimable(self) -> bool {
        matches!(self, Self::Queued | Self::Retrying)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued | Self::Retrying, Self::InProgress)
                | (Self::InProgress, Self::Completed | Self::Retrying | Self::DeadLettered)
                | (Self::DeadLettered, Self::Queued)
        )
    }

    /// States a worker may claim from.
    pub fn claimable() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(|state| state.is_claimable())
    }

    /// States from which `next` may be entered.
    pub fn predecessors(next: Self) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |state| state.can_transition_to(next))
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = UnknownTaskState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "active" => Ok(Self::InProgress),
            "retrying" => Ok(Self::Retrying),
            "completed" => Ok(Self::Completed),
            "dead" => Ok(Self::DeadLettered),
            other => Err(UnknownTaskState(other.to_string())),
        }
    }
}
