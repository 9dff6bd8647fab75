//! Shared types, errors, and configuration for Corebank.
//!
//! This crate provides common types used across all other crates:
//! - Application configuration
//! - Application-wide error types
//! - The mail delivery capability and its SMTP implementation
//! - List and pagination parameters

pub mod config;
pub mod email;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, EmailConfig, ServerConfig, WorkerConfig};
pub use email::{EmailError, EmailMessage, Mailer, SmtpMailer};
pub use error::{AppError, AppResult};
pub use types::{ListParams, PageRequest, PageResponse};
