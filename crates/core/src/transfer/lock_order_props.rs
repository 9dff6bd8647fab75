//! Property-based tests for transfer update ordering.

use proptest::prelude::*;

use super::lock_order::{balance_updates, lock_order};
use super::validation::{TransferRequest, validate_transfer};

/// Two distinct positive account ids.
fn distinct_ids() -> impl Strategy<Value = (i64, i64)> {
    (1i64..1_000_000, 1i64..1_000_000).prop_filter("ids must differ", |(a, b)| a != b)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Updates are always applied in ascending account id order.
    #[test]
    fn prop_updates_ascend((from, to) in distinct_ids(), amount in 1i64..1_000_000_000) {
        let [first, second] = balance_updates(from, to, amount);
        prop_assert!(first.account_id < second.account_id);
    }

    /// Reversing the direction of a transfer does not change the lock order.
    #[test]
    fn prop_order_ignores_direction((a, b) in distinct_ids(), amount in 1i64..1_000_000_000) {
        let forward = balance_updates(a, b, amount);
        let backward = balance_updates(b, a, amount);

        prop_assert_eq!(forward[0].account_id, backward[0].account_id);
        prop_assert_eq!(forward[1].account_id, backward[1].account_id);
        prop_assert_eq!(lock_order(a, b), lock_order(b, a));
    }

    /// The two deltas cancel out; money is neither created nor destroyed.
    #[test]
    fn prop_deltas_sum_to_zero((from, to) in distinct_ids(), amount in 1i64..1_000_000_000) {
        let [first, second] = balance_updates(from, to, amount);
        prop_assert_eq!(first.delta + second.delta, 0);
    }

    /// The debit lands on the source account regardless of id order.
    #[test]
    fn prop_debit_on_source((from, to) in distinct_ids(), amount in 1i64..1_000_000_000) {
        let updates = balance_updates(from, to, amount);
        let debit = updates.iter().find(|u| u.account_id == from).unwrap();
        let credit = updates.iter().find(|u| u.account_id == to).unwrap();

        prop_assert_eq!(debit.delta, -amount);
        prop_assert_eq!(credit.delta, amount);
    }

    /// Any request with distinct accounts and a positive amount validates.
    #[test]
    fn prop_valid_requests_accepted((from, to) in distinct_ids(), amount in 1i64..i64::MAX) {
        prop_assert!(validate_transfer(&TransferRequest::new(from, to, amount)).is_ok());
    }

    /// Non-positive amounts are always rejected.
    #[test]
    fn prop_non_positive_rejected((from, to) in distinct_ids(), amount in i64::MIN..=0) {
        prop_assert!(validate_transfer(&TransferRequest::new(from, to, amount)).is_err());
    }
}
