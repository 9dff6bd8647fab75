//! Money movement between two accounts.
//!
//! A transfer is recorded as one transfer row plus two offsetting entries,
//! and applied as two balance deltas. This module holds the parts that need
//! no database: request validation and the order in which the two account
//! rows must be updated.

mod lock_order;
mod validation;

#[cfg(test)]
mod lock_order_props;

pub use lock_order::{BalanceDelta, balance_updates, lock_order};
pub use validation::{TransferRequest, TransferValidationError, validate_transfer};
