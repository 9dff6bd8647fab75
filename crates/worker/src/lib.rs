//! Background task processing for Corebank.
//!
//! Producers enqueue tasks through [`corebank_db::TaskDistributor`];
//! [`TaskProcessor`] claims them from the broker and dispatches each one to
//! the [`TaskHandler`] registered for its type.

pub mod handler;
pub mod handlers;
pub mod processor;

pub use handler::{HandlerError, HandlerRegistry, TaskHandler};
pub use handlers::SendVerifyEmailHandler;
pub use processor::{ProcessorConfig, TaskProcessor};
