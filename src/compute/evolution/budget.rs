//! Budget tracking for generation, evaluation and wall-clock limits.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::schema::{BudgetConfig, BudgetKind};

/// Remaining-budget queries shared by the engine and run driver.
///
/// Counters are atomic so evaluations may be recorded from worker threads and
/// queries only need `&self`.
#[derive(Debug)]
pub struct BudgetTracker {
    config: BudgetConfig,
    started: Instant,
    deadline: Option<Instant>,
    generations: AtomicUsize,
    evaluations: AtomicU64,
}

impl BudgetTracker {
    /// Start the clock.
    pub fn start(config: &BudgetConfig) -> Self {
        let started = Instant::now();
        let deadline = config
            .max_time_ms
            .map(|ms| started + Duration::from_millis(ms));

        Self {
            config: config.clone(),
            started,
            deadline,
            generations: AtomicUsize::new(0),
            evaluations: AtomicU64::new(0),
        }
    }

    pub fn record_evaluations(&self, n: u64) {
        self.evaluations.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_generation(&self) {
        self.generations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::Relaxed)
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Hard deadline, if a time limit is configured.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Target fitness that ends the run early.
    pub fn target_fitness(&self) -> Option<f64> {
        self.config.target_fitness
    }

    /// The first exhausted limit, if any.
    pub fn is_exhausted(&self) -> Option<BudgetKind> {
        if let Some(max) = self.config.max_generations
            && self.generations() >= max
        {
            return Some(BudgetKind::Generations);
        }

        if let Some(max) = self.config.max_evaluations
            && self.evaluations() >= max
        {
            return Some(BudgetKind::Evaluations);
        }

        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Some(BudgetKind::Time);
        }

        None
    }

    pub fn is_finished(&self) -> bool {
        self.is_exhausted().is_some()
    }

    /// Consumed fraction of the tightest limit, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let mut progress: f64 = 0.0;

        if let Some(max) = self.config.max_generations {
            progress = progress.max(fraction(self.generations() as f64, max as f64));
        }
        if let Some(max) = self.config.max_evaluations {
            progress = progress.max(fraction(self.evaluations() as f64, max as f64));
        }
        if let Some(ms) = self.config.max_time_ms {
            progress = progress.max(fraction(self.elapsed().as_millis() as f64, ms as f64));
        }

        progress
    }
}

fn fraction(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        1.0
    } else {
        (used / limit).clamp(0.0, 1.0)
    }
}
