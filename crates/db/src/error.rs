//! Store error taxonomy.
//!
//! Every failure surfaced by the store, the executor and the orchestrators is
//! a [`StoreError`]. Raw [`DbErr`]s are classified on the way out so callers
//! can tell a missing row from a duplicate key from a retryable lock conflict.

use corebank_core::transfer::TransferValidationError;
use corebank_core::user::UserInputError;
use corebank_core::verification::VerificationError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// Postgres SQLSTATEs worth retrying: serialization failure, deadlock, lock not available.
const PG_TRANSIENT_CODES: [&str; 3] = ["40001", "40P01", "55P03"];

/// Unique violation codes: Postgres, SQLite primary key, SQLite unique.
const UNIQUE_CODES: [&str; 3] = ["23505", "1555", "2067"];

/// Foreign key violation codes: Postgres, SQLite.
const FOREIGN_KEY_CODES: [&str; 2] = ["23503", "787"];

/// SQLite result codes for a busy or locked database.
const SQLITE_TRANSIENT_CODES: [&str; 4] = ["5", "6", "261", "517"];

/// Errors returned by store operations and units of work.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected before a transaction was opened.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Verification code refused.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Referenced row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Connection loss, serialization failure, deadlock or lock timeout.
    /// The caller may retry the whole unit of work.
    #[error("transient database error: {0}")]
    Transient(DbErr),

    /// A task could not be enqueued; the enclosing unit of work is aborted.
    #[error("failed to enqueue task: {0}")]
    Enqueue(String),

    /// The unit of work was cancelled or exceeded its deadline and was rolled back.
    #[error("unit of work cancelled")]
    Cancelled,

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(DbErr),
}

impl StoreError {
    /// Builds a `NotFound` error for `entity` identified by `key`.
    pub fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {key}"))
    }

    /// Returns true if retrying the same unit of work may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => return Self::Conflict(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return Self::NotFound(msg),
            _ => {}
        }

        match database_code(&err).as_deref() {
            Some(code) if UNIQUE_CODES.contains(&code) => return Self::Conflict(err.to_string()),
            Some(code) if FOREIGN_KEY_CODES.contains(&code) => {
                return Self::NotFound(err.to_string());
            }
            _ => {}
        }

        if is_transient(&err) {
            return Self::Transient(err);
        }

        match err {
            DbErr::RecordNotFound(msg) => Self::NotFound(msg),
            DbErr::RecordNotUpdated => Self::NotFound("record".to_string()),
            other => Self::Database(other),
        }
    }
}

impl From<TransferValidationError> for StoreError {
    fn from(err: TransferValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<UserInputError> for StoreError {
    fn from(err: UserInputError) -> Self {
        Self::Validation(err.to_string())
    }
}

fn database_code(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err))) => {
            db_err.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime) => {
            is_transient_runtime(runtime)
        }
        _ => false,
    }
}

fn is_transient_runtime(err: &RuntimeErr) -> bool {
    let RuntimeErr::SqlxError(sqlx_err) = err else {
        return false;
    };

    match sqlx_err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            PG_TRANSIENT_CODES.contains(&code.as_ref())
                || SQLITE_TRANSIENT_CODES.contains(&code.as_ref())
        }),
        _ => false,
    }
}
