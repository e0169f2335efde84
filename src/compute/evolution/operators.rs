//! Search operators: selection, crossover, mutation and replacement.
//!
//! Selection and replacement are representation independent and come with
//! config-driven implementations ([`SelectionMethod`], [`ReplacementMethod`]).
//! Crossover and mutation depend on the genome and are supplied by the caller.

use std::cmp::Ordering;

use crate::schema::{ReplacementMethod, SearchConfig, SelectionMethod};

use super::candidate::{Candidate, Genome};
use super::objective::{Direction, ObjectiveSet};
use super::population::Population;
use super::rng::SearchRng;

/// Crossover failure. The operands must be left untouched when returned.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CrossoverError {
    #[error("Crossover construction failed: {0}")]
    ConstructionFailed(String),
}

/// Picks a parent index out of a best-first sorted population.
pub trait Selection<G>: Send + Sync {
    fn select(
        &self,
        population: &Population<G>,
        objectives: &ObjectiveSet<G>,
        rng: &mut SearchRng,
    ) -> usize;
}

/// Recombines two genomes in place.
///
/// Implementations must either succeed or leave both genomes unchanged.
pub trait Crossover<G>: Send + Sync {
    fn crossover(&self, first: &mut G, second: &mut G, rng: &mut SearchRng)
    -> Result<(), CrossoverError>;
}

/// Perturbs a genome in place and reports whether anything changed.
pub trait Mutation<G>: Send + Sync {
    fn mutate(&self, genome: &mut G, rng: &mut SearchRng) -> bool;
}

/// Decides whether a pair of offspring supersedes its parents.
pub trait Replacement<G>: Send + Sync {
    fn keep_offspring(
        &self,
        parents: (&Candidate<G>, &Candidate<G>),
        offspring: (&Candidate<G>, &Candidate<G>),
        objectives: &ObjectiveSet<G>,
    ) -> bool;
}

impl<G: Genome> Selection<G> for SelectionMethod {
    fn select(
        &self,
        population: &Population<G>,
        objectives: &ObjectiveSet<G>,
        rng: &mut SearchRng,
    ) -> usize {
        let len = population.len();
        if len <= 1 {
            return 0;
        }

        match self {
            // Sorted best-first, so the smallest sampled index wins.
            SelectionMethod::Tournament { size } => {
                (0..(*size).max(1)).map(|_| rng.index(len)).min().unwrap_or(0)
            }
            SelectionMethod::RankBased { bias } => {
                if *bias <= 1.0 {
                    return rng.index(len);
                }
                let r = rng.next_f64();
                let d = (bias - (bias * bias - 4.0 * (bias - 1.0) * r).sqrt()) / 2.0 / (bias - 1.0);
                ((len as f64 * d) as usize).min(len - 1)
            }
            SelectionMethod::RouletteWheel => {
                let weight = |c: &Candidate<G>| match objectives.direction() {
                    Direction::Maximize => c.fitness.max(0.0),
                    Direction::Minimize => 1.0 / (1.0 + c.fitness.max(0.0)),
                };
                let total: f64 = population.iter().map(weight).sum();
                if total <= 0.0 || !total.is_finite() {
                    return rng.index(len);
                }

                let target = rng.next_f64() * total;
                let mut cumulative = 0.0;
                for (i, candidate) in population.iter().enumerate() {
                    cumulative += weight(candidate);
                    if cumulative >= target {
                        return i;
                    }
                }
                len - 1
            }
        }
    }
}

impl<G: Genome> Replacement<G> for ReplacementMethod {
    fn keep_offspring(
        &self,
        parents: (&Candidate<G>, &Candidate<G>),
        offspring: (&Candidate<G>, &Candidate<G>),
        objectives: &ObjectiveSet<G>,
    ) -> bool {
        match self {
            ReplacementMethod::Always => true,
            ReplacementMethod::NotWorseThanBestParent => {
                let best_parent = better_of(parents.0, parents.1, objectives);
                let best_offspring = better_of(offspring.0, offspring.1, objectives);
                objectives.compare(best_offspring, best_parent) != Ordering::Greater
            }
        }
    }
}

fn better_of<'a, G: Genome>(
    a: &'a Candidate<G>,
    b: &'a Candidate<G>,
    objectives: &ObjectiveSet<G>,
) -> &'a Candidate<G> {
    if objectives.compare(b, a) == Ordering::Less { b } else { a }
}

/// The four operators injected into the engine.
pub struct OperatorSet<G> {
    pub selection: Box<dyn Selection<G>>,
    pub crossover: Box<dyn Crossover<G>>,
    pub mutation: Box<dyn Mutation<G>>,
    pub replacement: Box<dyn Replacement<G>>,
}

impl<G: Genome + 'static> OperatorSet<G> {
    /// Selection and replacement from config, variation operators from the caller.
    pub fn new(
        config: &SearchConfig,
        crossover: impl Crossover<G> + 'static,
        mutation: impl Mutation<G> + 'static,
    ) -> Self {
        Self {
            selection: Box::new(config.selection.clone()),
            crossover: Box::new(crossover),
            mutation: Box::new(mutation),
            replacement: Box::new(config.replacement),
        }
    }

    pub fn with_selection(mut self, selection: impl Selection<G> + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    pub fn with_replacement(mut self, replacement: impl Replacement<G> + 'static) -> Self {
        self.replacement = Box::new(replacement);
        self
    }
}
