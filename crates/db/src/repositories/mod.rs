//! Ledger store entity operations.
//!
//! All operations live on [`Queries`], a handle generic over the connection it
//! runs on. `Queries<DatabaseConnection>` talks to the pool directly;
//! `Queries<DatabaseTransaction>` is what a unit of work receives from
//! [`Store::execute`](crate::Store::execute), so every write of one business
//! operation goes through the same transaction.

mod account;
mod entry;
mod task;
mod transfer;
mod user;
mod verify_email;

use std::sync::atomic::{AtomicUsize, Ordering};

use sea_orm::ConnectionTrait;

pub use account::CreateAccountParams;
pub use entry::{CreateEntryParams, EntryFilter};
pub use task::NewTask;
pub use transfer::CreateTransferParams;
pub use user::{CreateUserParams, UpdateUserParams};
pub use verify_email::CreateVerifyEmailParams;

/// Store handle bound to one connection or transaction.
#[derive(Debug)]
pub struct Queries<'c, C> {
    conn: &'c C,
    enqueued: AtomicUsize,
}

impl<'c, C: ConnectionTrait> Queries<'c, C> {
    /// Wraps a connection or transaction.
    pub const fn new(conn: &'c C) -> Self {
        Self {
            conn,
            enqueued: AtomicUsize::new(0),
        }
    }

    /// The underlying connection.
    pub const fn conn(&self) -> &'c C {
        self.conn
    }

    /// Number of tasks inserted through this handle.
    pub fn enqueued(&self) -> usize {
        self.enqueued.load(Ordering::Relaxed)
    }

    fn record_enqueue(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }
}
