//! Steady GA - Steady-state genetic algorithm with monotonic best fitness.
//!
//! This crate provides a generic steady-state genetic algorithm whose best
//! fitness never regresses from one generation to the next, together with
//! the run driver, CSV statistics and a bounded side-channel for writing
//! diagnostic artifacts.
//!
//! # Architecture
//!
//! - `schema`: Configuration, report rows and the instrumentation scope
//! - `compute`: The evolution engine, its operators and the run driver
//! - `report`: CSV emission of the statistics log
//! - `artifact`: Background writer for diagnostic documents
//!
//! # Example
//!
//! ```rust,no_run
//! use steady_ga::{
//!     compute::evolution::{
//!         Direction, EvolutionEngine, GeneSum, IntVectorFactory, IntVectorMutation,
//!         ObjectiveSet, OperatorSet, RunDriver, SinglePointCrossover,
//!     },
//!     schema::{BudgetConfig, SearchConfig, VectorGenomeConfig},
//! };
//!
//! let config = SearchConfig {
//!     budget: BudgetConfig::generations(50),
//!     ..Default::default()
//! };
//! let genome = VectorGenomeConfig::default();
//!
//! let operators = OperatorSet::new(
//!     &config,
//!     SinglePointCrossover::new(config.max_length),
//!     IntVectorMutation::new(&genome),
//! );
//! let objectives = ObjectiveSet::single(GeneSum::new(Direction::Maximize));
//! let engine = EvolutionEngine::new(config, objectives, operators, IntVectorFactory::new(&genome))
//!     .unwrap();
//!
//! let result = RunDriver::new(engine).generate_solution().unwrap();
//! println!("Best fitness after {} generations: {}", result.stats.generations, result.best.fitness);
//! ```

pub mod artifact;
pub mod compute;
pub mod report;
pub mod schema;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactWriter, DotFileSink};
pub use compute::evolution::{EvolutionEngine, RunDriver, SearchError, SearchResult};
pub use schema::{SearchConfig, SearchStats, StopReason};
