//! Weighted queue priority.

use rand::Rng;

/// A queue name and its relative priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueWeight {
    /// Queue name.
    pub name: String,
    /// Relative weight; zero is treated as one.
    pub weight: u32,
}

impl QueueWeight {
    /// Creates a weighted queue entry.
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Orders queues for one poll by weighted random sampling without replacement.
///
/// A queue with weight 10 is polled first twice as often as one with weight 5,
/// and every queue appears exactly once so lower priorities are never starved
/// when higher ones are empty.
pub fn weighted_order<R: Rng + ?Sized>(queues: &[QueueWeight], rng: &mut R) -> Vec<String> {
    let mut remaining: Vec<(&str, u64)> = queues
        .iter()
        .map(|q| (q.name.as_str(), u64::from(q.weight.max(1))))
        .collect();
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let total: u64 = remaining.iter().map(|(_, w)| w).sum();
        let mut pick = rng.random_range(0..total);

        let index = remaining
            .iter()
            .position(|(_, weight)| {
                if pick < *weight {
                    true
                } else {
                    pick -= weight;
                    false
                }
            })
            .unwrap_or(remaining.len() - 1);

        order.push(remaining.remove(index).0.to_string());
    }

    order
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn queues() -> Vec<QueueWeight> {
        vec![QueueWeight::new("critical", 10), QueueWeight::new("default", 5)]
    }

    #[test]
    fn test_every_queue_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = weighted_order(&queues(), &mut rng);
        order.sort();
        assert_eq!(order, vec!["critical".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_empty() {
        assert!(weighted_order(&[], &mut rand::rng()).is_empty());
    }

    #[test]
    fn test_heavier_queue_usually_first() {
        let mut rng = StdRng::seed_from_u64(42);
        let critical_first = (0..3_000)
            .filter(|_| weighted_order(&queues(), &mut rng)[0] == "critical")
            .count();

        // Expected share is 2/3.
        assert!((1_700..=2_300).contains(&critical_first), "got {critical_first}");
    }
}
