//! Candidate factory: source of fresh random genomes.

use super::rng::SearchRng;

/// Factory failure. The engine retries a bounded number of times per slot.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FactoryError {
    #[error("Candidate construction failed: {0}")]
    ConstructionFailed(String),
}

/// Produces random genomes for the initial population and for headless
/// chicken crossover.
pub trait CandidateFactory<G>: Send + Sync {
    fn create(&self, rng: &mut SearchRng) -> Result<G, FactoryError>;
}

impl<G, F> CandidateFactory<G> for F
where
    F: Fn(&mut SearchRng) -> Result<G, FactoryError> + Send + Sync,
{
    fn create(&self, rng: &mut SearchRng) -> Result<G, FactoryError> {
        self(rng)
    }
}
