//! Transaction executor.
//!
//! [`Store`] owns the connection pool and runs units of work atomically. A
//! unit of work is a closure receiving a transaction-scoped [`Queries`]; every
//! store operation and task enqueue it performs commits or rolls back as one.

mod tx_create_user;
mod tx_transfer;
mod tx_verify_email;

use std::time::Duration;

use corebank_core::task::TaskOptions;
use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub use tx_create_user::CreateUserTxParams;
pub use tx_transfer::TransferTxResult;
pub use tx_verify_email::{VerifyEmailTxParams, VerifyEmailTxResult};

use crate::entities::tasks;
use crate::error::StoreError;
use crate::queue::TaskDistributor;
use crate::repositories::Queries;

/// Transaction-scoped store handle passed to units of work.
pub type TxQueries<'c> = Queries<'c, DatabaseTransaction>;

/// Ledger store and transaction executor.
#[derive(Debug, Clone)]
pub struct Store {
    db: DatabaseConnection,
    distributor: TaskDistributor,
    tx_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Store {
    /// Creates a store over a connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            distributor: TaskDistributor::new(),
            tx_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bounds how long one unit of work may run before it is rolled back.
    #[must_use]
    pub const fn with_tx_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tx_timeout = timeout;
        self
    }

    /// Rolls back in-flight and future units of work once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The underlying pool.
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The distributor whose wake-ups fire after each committing enqueue.
    pub const fn distributor(&self) -> &TaskDistributor {
        &self.distributor
    }

    /// Pool-backed store handle; each operation runs in its own implicit transaction.
    pub fn queries(&self) -> Queries<'_, DatabaseConnection> {
        Queries::new(&self.db)
    }

    /// Runs `unit` inside one database transaction.
    ///
    /// On `Ok` the transaction is committed and, if the unit enqueued tasks,
    /// idle workers are woken. On `Err` it is rolled back and the error is
    /// returned unchanged. A commit failure is returned as an error and the
    /// unit's value is discarded. The executor never retries.
    ///
    /// If the store's timeout elapses or its cancellation token fires while
    /// the unit runs, the unit is dropped, the transaction rolled back and
    /// `StoreError::Cancelled` returned.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let account = store
    ///     .execute(|q| Box::pin(async move { q.add_account_balance(1, 50).await }))
    ///     .await?;
    /// ```
    pub async fn execute<T, F>(&self, unit: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c TxQueries<'c>) -> BoxFuture<'c, Result<T, StoreError>> + Send,
    {
        let txn = self.db.begin().await?;
        let queries = Queries::new(&txn);

        let outcome = self.guard(unit(&queries)).await;
        let enqueued = queries.enqueued();
        drop(queries);

        match outcome {
            Ok(value) => {
                txn.commit().await?;
                if enqueued > 0 {
                    self.distributor.committed();
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Enqueues a single task in its own transaction.
    pub async fn enqueue<P>(
        &self,
        kind: &str,
        payload: P,
        options: TaskOptions,
    ) -> Result<tasks::Model, StoreError>
    where
        P: Serialize + Send + Sync + 'static,
    {
        let distributor = self.distributor.clone();
        let kind = kind.to_string();
        self.execute(move |q| {
            Box::pin(async move { distributor.distribute(q, &kind, &payload, options).await })
        })
        .await
    }

    /// Races the unit against the deadline and the cancellation token.
    async fn guard<T>(&self, unit: BoxFuture<'_, Result<T, StoreError>>) -> Result<T, StoreError> {
        let bounded = async {
            match self.tx_timeout {
                Some(limit) => tokio::time::timeout(limit, unit)
                    .await
                    .unwrap_or(Err(StoreError::Cancelled)),
                None => unit.await,
            }
        };

        tokio::select! {
            () = self.cancel.cancelled() => Err(StoreError::Cancelled),
            result = bounded => result,
        }
    }
}
