//! Configuration types for the steady-state search.
//!
//! Every knob of the run is collected in [`SearchConfig`], which is loaded
//! from JSON by the CLI and validated before an engine is built.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a steady-state search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of individuals kept alive between generations.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Number of best individuals carried over unchanged.
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,
    /// Probability of attempting crossover on an offspring pair (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Replace the second parent by a fresh random candidate.
    #[serde(default)]
    pub headless_chicken: bool,
    /// Offspring longer than this are rejected.
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Parent selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Offspring replacement rule.
    #[serde(default)]
    pub replacement: ReplacementMethod,
    /// Termination budget.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Secondary-objective escalation thresholds.
    #[serde(default)]
    pub escalation: EscalationConfig,
    /// Local search settings.
    #[serde(default)]
    pub local_search: LocalSearchConfig,
    /// End-of-run report settings.
    #[serde(default)]
    pub report: ReportConfig,
    /// Time allowance for pulling the archive best into the population.
    #[serde(default = "default_archive_merge_timeout_ms")]
    pub archive_merge_timeout_ms: u64,
    /// Numerical slack allowed when checking that best fitness never regresses.
    #[serde(default = "default_fitness_tolerance")]
    pub fitness_tolerance: f64,
    /// Consecutive crossover failures tolerated before a pair skips crossover.
    #[serde(default = "default_max_crossover_retries")]
    pub max_crossover_retries: usize,
    /// Factory attempts per population slot during initialization.
    #[serde(default = "default_factory_attempts")]
    pub factory_attempts_per_slot: usize,
    /// Panic on a best-fitness regression instead of logging it.
    #[serde(default = "default_strict_invariants")]
    pub strict_invariants: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            elite_count: default_elite_count(),
            crossover_rate: default_crossover_rate(),
            headless_chicken: false,
            max_length: None,
            selection: SelectionMethod::default(),
            replacement: ReplacementMethod::default(),
            budget: BudgetConfig::default(),
            escalation: EscalationConfig::default(),
            local_search: LocalSearchConfig::default(),
            report: ReportConfig::default(),
            archive_merge_timeout_ms: default_archive_merge_timeout_ms(),
            fitness_tolerance: default_fitness_tolerance(),
            max_crossover_retries: default_max_crossover_retries(),
            factory_attempts_per_slot: default_factory_attempts(),
            strict_invariants: default_strict_invariants(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_elite_count() -> usize {
    1
}
fn default_crossover_rate() -> f64 {
    0.75
}
fn default_archive_merge_timeout_ms() -> u64 {
    5_000
}
fn default_fitness_tolerance() -> f64 {
    1e-9
}
fn default_max_crossover_retries() -> usize {
    100
}
fn default_factory_attempts() -> usize {
    10
}
fn default_strict_invariants() -> bool {
    cfg!(debug_assertions)
}

/// Selection method for picking parents out of the sorted population.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Linear rank selection; `bias` in (1.0, 2.0] favours the best ranks.
    RankBased {
        #[serde(default = "default_rank_bias")]
        bias: f64,
    },
    /// Roulette wheel (fitness-proportionate) selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::RankBased {
            bias: default_rank_bias(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}
fn default_rank_bias() -> f64 {
    1.7
}

/// Rule deciding whether an offspring pair supersedes its parents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReplacementMethod {
    /// Keep the offspring if the better one is not worse than the better parent.
    #[default]
    NotWorseThanBestParent,
    /// Always keep the offspring.
    Always,
}

/// Search budget. The run finishes as soon as any configured limit is hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetConfig {
    /// Maximum number of completed generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: Option<usize>,
    /// Maximum number of candidate evaluations.
    #[serde(default)]
    pub max_evaluations: Option<u64>,
    /// Wall-clock limit in milliseconds.
    #[serde(default)]
    pub max_time_ms: Option<u64>,
    /// Stop early once the best fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            max_evaluations: None,
            max_time_ms: None,
            target_fitness: None,
        }
    }
}

fn default_max_generations() -> Option<usize> {
    Some(100)
}

impl BudgetConfig {
    /// Budget bounded only by a number of generations.
    pub fn generations(n: usize) -> Self {
        Self {
            max_generations: Some(n),
            max_evaluations: None,
            max_time_ms: None,
            target_fitness: None,
        }
    }

    /// Whether at least one hard limit is configured.
    pub fn is_bounded(&self) -> bool {
        self.max_generations.is_some() || self.max_evaluations.is_some() || self.max_time_ms.is_some()
    }
}

/// Thresholds for switching on secondary objectives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EscalationConfig {
    /// Fraction of the budget (0.0-1.0) after which secondaries may activate.
    /// Zero together with no starvation requirement activates them at start.
    #[serde(default)]
    pub enable_after: f64,
    /// Additionally require this many generations without best-fitness change.
    #[serde(default)]
    pub starvation_after: Option<usize>,
}

/// Local search settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalSearchConfig {
    /// Probability of running the refiner after a generation.
    #[serde(default)]
    pub rate: f64,
    /// Mutate-and-evaluate attempts per refined candidate.
    #[serde(default = "default_local_search_budget")]
    pub budget: usize,
    /// Number of best candidates refined.
    #[serde(default = "default_local_search_top_n")]
    pub top_n: usize,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            rate: 0.0,
            budget: default_local_search_budget(),
            top_n: default_local_search_top_n(),
        }
    }
}

fn default_local_search_budget() -> usize {
    10
}
fn default_local_search_top_n() -> usize {
    1
}

/// End-of-run report settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Directory receiving `fitnesses.csv` and `parentToOffspring.csv`.
    #[serde(default = "default_report_dir")]
    pub output_dir: String,
    /// Whether to write the reports at all.
    #[serde(default = "default_report_enabled")]
    pub enabled: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_report_dir(),
            enabled: default_report_enabled(),
        }
    }
}

fn default_report_dir() -> String {
    "search-report".to_string()
}
fn default_report_enabled() -> bool {
    true
}

/// Parameters of the integer-vector genome used by the CLI and benchmarks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorGenomeConfig {
    /// Length bounds for freshly created vectors.
    #[serde(default = "default_length_bounds")]
    pub length_bounds: (usize, usize),
    /// Value bounds for every gene.
    #[serde(default = "default_value_bounds")]
    pub value_bounds: (i64, i64),
    /// Per-call mutation intensity: each gene is perturbed with probability
    /// `mutation_rate / len`.
    #[serde(default = "default_vector_mutation_rate")]
    pub mutation_rate: f64,
    /// Standard deviation of a gene perturbation, relative to the value range.
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f64,
    /// Probability of inserting a gene during mutation.
    #[serde(default = "default_insert_probability")]
    pub insert_probability: f64,
    /// Probability of deleting a gene during mutation.
    #[serde(default = "default_delete_probability")]
    pub delete_probability: f64,
}

impl Default for VectorGenomeConfig {
    fn default() -> Self {
        Self {
            length_bounds: default_length_bounds(),
            value_bounds: default_value_bounds(),
            mutation_rate: default_vector_mutation_rate(),
            mutation_strength: default_mutation_strength(),
            insert_probability: default_insert_probability(),
            delete_probability: default_delete_probability(),
        }
    }
}

fn default_length_bounds() -> (usize, usize) {
    (1, 20)
}
fn default_value_bounds() -> (i64, i64) {
    (-100, 100)
}
fn default_vector_mutation_rate() -> f64 {
    1.0
}
fn default_mutation_strength() -> f64 {
    0.1
}
fn default_insert_probability() -> f64 {
    0.1
}
fn default_delete_probability() -> f64 {
    0.1
}

/// CLI configuration: the search plus the demo genome and scope file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemoConfig {
    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Demo genome settings.
    #[serde(default)]
    pub genome: VectorGenomeConfig,
    /// Name of the primary artifact under test.
    #[serde(default)]
    pub target: String,
    /// File listing additional artifacts to instrument, one per line.
    #[serde(default)]
    pub scope_file: Option<String>,
    /// Directory for DOT artifacts; none are written when unset.
    #[serde(default)]
    pub artifact_dir: Option<String>,
}

// ============================================================================
// Validation
// ============================================================================

/// Search configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elite count must be at least 1 and below the population size, got {0}")]
    InvalidEliteCount(usize),
    #[error("Invalid probability for {name}: {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Tournament size must be positive")]
    InvalidTournamentSize,
    #[error("Rank bias must be in [1.0, 2.0], got {0}")]
    InvalidRankBias(f64),
    #[error("At least one budget limit (generations, evaluations, time) is required")]
    UnboundedBudget,
    #[error("Maximum length must be positive")]
    InvalidMaxLength,
    #[error("Fitness tolerance must be non-negative and finite, got {0}")]
    InvalidTolerance(f64),
    #[error("Factory attempts per slot must be positive")]
    InvalidFactoryAttempts,
    #[error("No primary objectives specified")]
    NoObjectives,
    #[error("Primary objectives disagree on direction")]
    MixedDirections,
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
}

impl SearchConfig {
    /// Validate search configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }

        if self.elite_count == 0 || self.elite_count >= self.population_size {
            return Err(ConfigError::InvalidEliteCount(self.elite_count));
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };

        check_rate(self.crossover_rate, "crossover_rate")?;
        check_rate(self.local_search.rate, "local_search.rate")?;
        check_rate(self.escalation.enable_after, "escalation.enable_after")?;

        match self.selection {
            SelectionMethod::Tournament { size } if size == 0 => {
                return Err(ConfigError::InvalidTournamentSize);
            }
            SelectionMethod::RankBased { bias } if !(1.0..=2.0).contains(&bias) => {
                return Err(ConfigError::InvalidRankBias(bias));
            }
            _ => {}
        }

        if !self.budget.is_bounded() {
            return Err(ConfigError::UnboundedBudget);
        }

        if self.max_length == Some(0) {
            return Err(ConfigError::InvalidMaxLength);
        }

        if !self.fitness_tolerance.is_finite() || self.fitness_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.fitness_tolerance));
        }

        if self.factory_attempts_per_slot == 0 {
            return Err(ConfigError::InvalidFactoryAttempts);
        }

        Ok(())
    }
}

impl VectorGenomeConfig {
    /// Validate demo genome configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.length_bounds.0 > self.length_bounds.1 {
            return Err(ConfigError::InvalidBounds(format!(
                "length min ({}) > max ({})",
                self.length_bounds.0, self.length_bounds.1
            )));
        }
        if self.value_bounds.0 > self.value_bounds.1 {
            return Err(ConfigError::InvalidBounds(format!(
                "value min ({}) > max ({})",
                self.value_bounds.0, self.value_bounds.1
            )));
        }
        for (value, name) in [
            (self.mutation_rate, "genome.mutation_rate"),
            (self.insert_probability, "genome.insert_probability"),
            (self.delete_probability, "genome.delete_probability"),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}
