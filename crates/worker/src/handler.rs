//! Task handler contract.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use corebank_db::entities::tasks;
use thiserror::Error;

/// Outcome of a failed handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Transient failure; the task is retried with backoff while budget remains.
    #[error("{0}")]
    Retry(String),

    /// Permanent failure; the task is dead-lettered without further attempts.
    #[error("skip retry: {0}")]
    SkipRetry(String),
}

impl HandlerError {
    /// Builds a retryable error from any displayable failure.
    pub fn retry(err: impl fmt::Display) -> Self {
        Self::Retry(err.to_string())
    }

    /// Builds a permanent error from any displayable failure.
    pub fn skip_retry(err: impl fmt::Display) -> Self {
        Self::SkipRetry(err.to_string())
    }
}

/// Executes one kind of task.
///
/// Delivery is at-least-once, so handlers must be idempotent.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Handles one attempt of `task`.
    async fn handle(&self, task: &tasks::Model) -> Result<(), HandlerError>;
}

/// Handlers keyed by task type.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for tasks of type `kind`, replacing any previous one.
    #[must_use]
    pub fn register(mut self, kind: impl Into<String>, handler: impl TaskHandler + 'static) -> Self {
        self.handlers.insert(kind.into(), Arc::new(handler));
        self
    }

    /// Looks up the handler for `kind`.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(kind).cloned()
    }

    /// Registered task types, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
