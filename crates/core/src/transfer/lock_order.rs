//! Deadlock-free update order for the two sides of a transfer.
//!
//! Every transfer touching accounts `a` and `b` updates the lower id first,
//! whichever direction the money flows. Two transactions over the same pair
//! therefore request row locks in the same order and can never wait on each
//! other in a cycle.

/// One balance adjustment to apply to an account row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    /// Account to adjust.
    pub account_id: i64,
    /// Signed amount to add to the balance.
    pub delta: i64,
}

/// Returns the two account ids in the order their rows must be locked.
#[must_use]
pub const fn lock_order(a: i64, b: i64) -> (i64, i64) {
    if a < b { (a, b) } else { (b, a) }
}

/// Returns the debit and credit of a transfer, ordered by ascending account id.
///
/// The debit carries `-amount` and the credit `+amount`; the pair always sums
/// to zero.
#[must_use]
pub const fn balance_updates(from_account_id: i64, to_account_id: i64, amount: i64) -> [BalanceDelta; 2] {
    let debit = BalanceDelta {
        account_id: from_account_id,
        delta: -amount,
    };
    let credit = BalanceDelta {
        account_id: to_account_id,
        delta: amount,
    };

    if from_account_id < to_account_id {
        [debit, credit]
    } else {
        [credit, debit]
    }
}
