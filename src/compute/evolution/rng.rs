//! Seedable random source shared by all search operators.

use rand::prelude::*;

/// Random number generator wrapper for search operations.
pub struct SearchRng {
    rng: StdRng,
}

impl SearchRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        if p >= 1.0 {
            true
        } else if p <= 0.0 {
            false
        } else {
            self.next_f64() < p
        }
    }

    /// Uniform index in `0..len`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform integer in the inclusive range.
    pub fn range_i64(&mut self, bounds: (i64, i64)) -> i64 {
        self.rng.gen_range(bounds.0..=bounds.1)
    }

    /// Uniform length in the inclusive range.
    pub fn range_usize(&mut self, bounds: (usize, usize)) -> usize {
        self.rng.gen_range(bounds.0..=bounds.1)
    }

    /// Pick one of two values with equal probability.
    pub fn choose<T>(&mut self, first: T, second: T) -> T {
        if self.rng.gen_bool(0.5) { first } else { second }
    }

    /// Standard normal sample.
    pub fn gaussian(&mut self) -> f64 {
        self.rng.sample(rand_distr::StandardNormal)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}
