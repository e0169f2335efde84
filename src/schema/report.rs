//! Statistics rows, progress snapshots and run results.

use serde::{Deserialize, Serialize};

/// One row of `fitnesses.csv`, recorded at every generation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessRow {
    pub iteration: usize,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub population_size: usize,
}

/// One row of `parentToOffspring.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParentOffspringRow {
    pub iteration: usize,
    /// Whether the operator linking this parent to this offspring was applied.
    pub operator_applied: bool,
    pub parent_fitness: f64,
    pub offspring_fitness: f64,
}

/// Append-only statistics gathered during a run.
#[derive(Debug, Clone, Default)]
pub struct StatisticsLog {
    fitness: Vec<FitnessRow>,
    parent_offspring: Vec<ParentOffspringRow>,
}

impl StatisticsLog {
    /// Create an empty log with room for `capacity` generations.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fitness: Vec::with_capacity(capacity),
            parent_offspring: Vec::with_capacity(capacity * 4),
        }
    }

    pub fn push_fitness(&mut self, row: FitnessRow) {
        self.fitness.push(row);
    }

    pub fn push_parent_offspring(&mut self, row: ParentOffspringRow) {
        self.parent_offspring.push(row);
    }

    pub fn fitness_rows(&self) -> &[FitnessRow] {
        &self.fitness
    }

    pub fn parent_offspring_rows(&self) -> &[ParentOffspringRow] {
        &self.parent_offspring
    }

    pub fn clear(&mut self) {
        self.fitness.clear();
        self.parent_offspring.clear();
    }
}

/// Counters owned by the run driver and shared with the engine per generation.
#[derive(Debug, Clone, Default)]
pub struct RunRecord {
    /// Completed generations; incremented once at the end of every `evolve()`.
    pub generation: usize,
    /// Consecutive iterations with a bit-identical best fitness.
    pub starvation: usize,
    /// Fitness and parent/offspring statistics.
    pub log: StatisticsLog,
}

/// Phase of the run state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Init,
    Evolving,
    Finalizing,
    Done,
}

/// Which budget limit ended the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BudgetKind {
    Generations,
    Evaluations,
    Time,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// A budget limit was reached.
    BudgetExhausted(BudgetKind),
    /// Best fitness reached the configured target.
    TargetReached,
    /// Cancelled through the cancel handle.
    Cancelled,
}

/// Progress snapshot passed to run callbacks after every iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    pub generation: usize,
    pub phase: RunPhase,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub mean_fitness: f64,
    pub population_size: usize,
    pub starvation: usize,
    pub evaluations: u64,
    pub elapsed_ms: u64,
    pub active_secondaries: usize,
}

/// Statistics from a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Completed generations.
    pub generations: usize,
    /// Candidate evaluations performed.
    pub total_evaluations: u64,
    /// Best fitness of the final population.
    pub best_fitness: f64,
    /// Mean fitness of the final population.
    pub final_mean_fitness: f64,
    /// Wall-clock duration in seconds.
    pub elapsed_seconds: f64,
    /// Best-fitness regressions observed with strict invariants disabled.
    pub invariant_violations: usize,
    /// Starvation counter when the run ended.
    pub final_starvation: usize,
    /// Secondary objectives active at the end.
    pub active_secondaries: usize,
    /// Whether the archive replaced the best individual at finalization.
    pub archive_merged: bool,
    /// Why the run ended.
    pub stop_reason: StopReason,
}
