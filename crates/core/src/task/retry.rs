//! Exponential backoff for failed tasks.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter.
///
/// Attempt `n` (zero-based count of previous retries) waits
/// `min(max, base * 2^n)` plus a random jitter of up to half that value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_ms: u64,
    max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1_000, 600_000)
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_ms` is raised to `base_ms` if lower.
    #[must_use]
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
        }
    }

    /// Delay before jitter for the given retry count.
    #[must_use]
    pub fn base_delay(&self, retried: u32) -> Duration {
        let factor = 2u64.checked_pow(retried).unwrap_or(u64::MAX);
        let millis = self.base_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(millis)
    }

    /// Delay including jitter for the given retry count.
    pub fn delay<R: Rng + ?Sized>(&self, retried: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(retried);
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = rng.random_range(0..=base_ms / 2);
        base + Duration::from_millis(jitter_ms)
    }

    /// Upper bound of [`RetryPolicy::delay`] for any retry count.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms.saturating_add(self.max_ms / 2))
    }
}
