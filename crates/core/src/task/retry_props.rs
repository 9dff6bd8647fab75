//! Property-based tests for retry backoff and queue ordering.

use std::time::Duration;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::queue::{QueueWeight, weighted_order};
use super::retry::RetryPolicy;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Base delay never decreases as the retry count grows.
    #[test]
    fn prop_base_delay_monotonic(base in 1u64..10_000, max in 1u64..10_000_000, n in 0u32..100) {
        let policy = RetryPolicy::new(base, max);
        prop_assert!(policy.base_delay(n) <= policy.base_delay(n + 1));
    }

    /// Jittered delay stays within [base, base * 1.5].
    #[test]
    fn prop_jitter_bounds(base in 0u64..10_000, max in 0u64..10_000_000, n in 0u32..100, seed in any::<u64>()) {
        let policy = RetryPolicy::new(base, max);
        let mut rng = StdRng::seed_from_u64(seed);
        let delay = policy.delay(n, &mut rng);
        let floor = policy.base_delay(n);

        prop_assert!(delay >= floor);
        prop_assert!(delay <= floor + floor / 2);
        prop_assert!(delay <= policy.max_delay());
    }

    /// Delays never exceed the configured ceiling before jitter.
    #[test]
    fn prop_capped(base in 1u64..10_000, max in 1u64..100_000, n in 0u32..1_000) {
        let policy = RetryPolicy::new(base, max);
        prop_assert!(policy.base_delay(n) <= Duration::from_millis(max.max(base)));
    }

    /// Weighted order is always a permutation of the configured queues.
    #[test]
    fn prop_weighted_order_is_permutation(
        weights in proptest::collection::vec(0u32..100, 0..8),
        seed in any::<u64>(),
    ) {
        let queues: Vec<QueueWeight> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| QueueWeight::new(format!("q{i}"), *w))
            .collect();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut order = weighted_order(&queues, &mut rng);
        let mut expected: Vec<String> = queues.iter().map(|q| q.name.clone()).collect();
        order.sort();
        expected.sort();

        prop_assert_eq!(order, expected);
    }
}
