//! Ledger store, transaction executor and task broker.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and migrations
//! - [`Queries`], the store handle with entity operations for one connection
//!   or transaction
//! - [`Store`], the executor running units of work atomically, and the
//!   transfer, create-user and verify-email orchestrators built on it
//! - [`TaskDistributor`], which enqueues tasks into the `tasks` table from
//!   inside a unit of work

pub mod entities;
pub mod error;
pub mod migration;
pub mod queue;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use queue::TaskDistributor;
pub use repositories::{
    CreateAccountParams, CreateEntryParams, CreateTransferParams, CreateUserParams,
    CreateVerifyEmailParams, EntryFilter, NewTask, Queries, UpdateUserParams,
};
pub use store::{
    CreateUserTxParams, Store, TransferTxResult, TxQueries, VerifyEmailTxParams,
    VerifyEmailTxResult,
};

use std::time::Duration;

use corebank_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
