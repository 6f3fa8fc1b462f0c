//! Random reviewer selection.
//!
//! The assignment engine draws reviewers through the [`ReviewerPicker`]
//! trait so tests can pin the outcome. [`RandomPicker`] is the production
//! implementation: a `StdRng` seeded from OS entropy, or from a fixed seed.

use crate::models::UserId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Picks reviewers out of an eligible pool.
pub trait ReviewerPicker: Send + Sync {
    /// Return up to `count` distinct members of `pool`.
    fn pick(&self, pool: Vec<UserId>, count: usize) -> Vec<UserId>;
}

/// Choose `min(count, pool.len())` distinct elements uniformly at random.
///
/// Partial Fisher-Yates: position `i` is swapped with a uniform index in
/// `i..n`, so every element has the same chance of landing in the prefix.
/// When the pool is no larger than `count` the result is a full shuffle.
pub fn select_random<T, R: Rng + ?Sized>(rng: &mut R, mut pool: Vec<T>, count: usize) -> Vec<T> {
    let n = pool.len();
    let take = count.min(n);

    for i in 0..take {
        let j = rng.gen_range(i..n);
        pool.swap(i, j);
    }

    pool.truncate(take);
    pool
}

/// Uniform picker backed by a shared `StdRng`.
pub struct RandomPicker {
    rng: Mutex<StdRng>,
}

impl RandomPicker {
    /// Seed from system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic picker for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl ReviewerPicker for RandomPicker {
    fn pick(&self, pool: Vec<UserId>, count: usize) -> Vec<UserId> {
        // The generator state is valid even if a previous holder panicked.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        select_random(&mut *rng, pool, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn ids(keys: &[i64]) -> Vec<UserId> {
        keys.iter().copied().map(UserId::new).collect()
    }

    #[test]
    fn test_select_takes_count_distinct_members() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = ids(&[2, 3, 4, 5]);

        for _ in 0..100 {
            let picked = select_random(&mut rng, pool.clone(), 2);
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
            assert!(picked.iter().all(|id| pool.contains(id)));
        }
    }

    #[test]
    fn test_small_pool_returns_permutation() {
        let mut rng = StdRng::seed_from_u64(11);

        assert!(select_random(&mut rng, Vec::<UserId>::new(), 2).is_empty());
        assert_eq!(select_random(&mut rng, ids(&[9]), 2), ids(&[9]));

        let picked: HashSet<UserId> = select_random(&mut rng, ids(&[1, 2]), 2).into_iter().collect();
        let expected: HashSet<UserId> = ids(&[1, 2]).into_iter().collect();
        assert_eq!(picked, expected);
    }

    #[test]
    fn test_small_pool_order_is_randomized() {
        let mut rng = StdRng::seed_from_u64(3);
        let orders: HashSet<Vec<UserId>> = (0..50)
            .map(|_| select_random(&mut rng, ids(&[1, 2]), 2))
            .collect();
        assert_eq!(orders.len(), 2, "both orders should appear");
    }

    #[test]
    fn test_inclusion_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = ids(&[1, 2, 3, 4, 5]);
        let trials = 20_000;
        let mut hits: HashMap<UserId, usize> = HashMap::new();

        for _ in 0..trials {
            for id in select_random(&mut rng, pool.clone(), 2) {
                *hits.entry(id).or_default() += 1;
            }
        }

        // Each member is included with probability 2/5.
        let expected = trials as f64 * 2.0 / 5.0;
        for id in &pool {
            let got = hits[id] as f64;
            assert!(
                (got - expected).abs() < expected * 0.05,
                "{id} included {got} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn test_seeded_picker_is_reproducible() {
        let pool = ids(&[1, 2, 3, 4, 5, 6]);
        let a = RandomPicker::seeded(99);
        let b = RandomPicker::seeded(99);

        for _ in 0..10 {
            assert_eq!(a.pick(pool.clone(), 2), b.pick(pool.clone(), 2));
        }
    }
}
