//! Transfer preconditions checked before any transaction is opened.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for a transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferValidationError {
    /// Debit and credit side are the same account.
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(i64),

    /// Amount is zero or negative.
    #[error("Transfer amount must be positive, got {0}")]
    NonPositiveAmount(i64),
}

/// A request to move `amount` from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Account to debit.
    pub from_account_id: i64,
    /// Account to credit.
    pub to_account_id: i64,
    /// Amount in the smallest currency unit.
    pub amount: i64,
}

impl TransferRequest {
    /// Creates a new transfer request.
    #[must_use]
    pub const fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }
}

/// Checks that a transfer moves a positive amount between two distinct accounts.
///
/// # Errors
///
/// Returns the first violated precondition.
pub fn validate_transfer(request: &TransferRequest) -> Result<(), TransferValidationError> {
    if request.from_account_id == request.to_account_id {
        return Err(TransferValidationError::SameAccount(request.from_account_id));
    }

    if request.amount <= 0 {
        return Err(TransferValidationError::NonPositiveAmount(request.amount));
    }

    Ok(())
}
