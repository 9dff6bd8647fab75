//! Task distribution.
//!
//! The broker is the `tasks` table (see [`Queries::insert_task`] and friends);
//! this module holds the producer side.
//!
//! [`Queries::insert_task`]: crate::Queries::insert_task

mod distributor;

pub use distributor::TaskDistributor;
