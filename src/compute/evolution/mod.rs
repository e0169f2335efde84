//! Steady-state genetic algorithm with a monotonic best-fitness guarantee.
//!
//! The search is generic over the genome type. Callers supply a
//! [`CandidateFactory`], [`Crossover`] and [`Mutation`] operators for their
//! representation and one or more [`FitnessFunction`]s; selection and
//! replacement come from the [`SearchConfig`](crate::schema::SearchConfig).
//!
//! # Overview
//!
//! - **Engine** (`engine`): one generation per `evolve()`, with elitism and
//!   parent-versus-offspring replacement
//! - **Driver** (`driver`): initialization, the generation loop, starvation
//!   tracking and CSV reports
//! - **Budget** (`budget`): generation, evaluation and wall-clock limits
//! - **Escalation** (`escalation`): late activation of secondary objectives
//! - **Local search** (`local_search`) and **archive** (`archive`): optional
//!   refinement and best-known memory
//! - **Vectors** (`vector`): a variable-length integer genome used by the CLI
//!
//! # Example
//!
//! ```rust,no_run
//! use steady_ga::compute::evolution::{
//!     Direction, EvolutionEngine, GeneSum, IntVectorFactory, IntVectorMutation,
//!     ObjectiveSet, OperatorSet, RunDriver, SinglePointCrossover,
//! };
//! use steady_ga::schema::{SearchConfig, VectorGenomeConfig};
//!
//! let config = SearchConfig::default();
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
//! let result = RunDriver::new(engine)
//!     .run_with_callback(|progress| {
//!         println!("Generation {}: best fitness = {}", progress.generation, progress.best_fitness);
//!     })
//!     .unwrap();
//! println!("Best: {:?}", result.best.genome);
//! ```

mod archive;
mod budget;
mod candidate;
mod driver;
mod engine;
mod escalation;
mod factory;
mod local_search;
mod objective;
mod operators;
mod population;
mod rng;
mod vector;

pub use archive::{Archive, ArchiveError, BestArchive, MergeDeadline, NoArchive};
pub use budget::BudgetTracker;
pub use candidate::{Candidate, Genome};
pub use driver::{InvariantCheck, RunDriver, SearchResult};
pub use engine::{EvolutionEngine, SearchError};
pub use escalation::EscalationPolicy;
pub use factory::{CandidateFactory, FactoryError};
pub use local_search::{HillClimber, LocalSearch, LocalSearchContext, NoLocalSearch};
pub use objective::{Direction, FitnessFunction, ObjectiveSet};
pub use operators::{Crossover, CrossoverError, Mutation, OperatorSet, Replacement, Selection};
pub use population::Population;
pub use rng::SearchRng;
pub use vector::{
    GeneSum, IntVector, IntVectorFactory, IntVectorMutation, SinglePointCrossover, VectorLength,
};
