//! Candidate solutions and the genome abstraction they wrap.

use std::collections::BTreeMap;
use std::fmt::Debug;

/// Representation of a candidate solution.
///
/// The engine never looks inside a genome: it only needs to clone it and to
/// measure its size for the length constraint.
pub trait Genome: Clone + Debug + Send + Sync {
    /// Size measure used by the length constraint. Zero-size genomes are
    /// rejected when offered as offspring.
    fn size(&self) -> usize;
}

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Candidate<G> {
    /// Unique identifier.
    pub id: u64,
    /// The genome.
    pub genome: G,
    /// Aggregate fitness over the primary objectives.
    pub fitness: f64,
    /// Raw scores keyed by objective name.
    pub scores: BTreeMap<String, f64>,
    /// Set when mutation or crossover altered the genome.
    pub changed: bool,
    /// Generation at which the genome was last structurally changed.
    pub age: usize,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl<G: Genome> Candidate<G> {
    /// Wrap a freshly created genome. Fitness is filled in by evaluation.
    pub fn new(id: u64, genome: G, generation: usize) -> Self {
        Self {
            id,
            genome,
            fitness: 0.0,
            scores: BTreeMap::new(),
            changed: false,
            age: generation,
            generation,
            parents: Vec::new(),
        }
    }

    /// Deep copy used as the starting point of an offspring.
    pub fn offspring(&self, id: u64, generation: usize) -> Self {
        Self {
            id,
            genome: self.genome.clone(),
            fitness: self.fitness,
            scores: self.scores.clone(),
            changed: false,
            age: self.age,
            generation,
            parents: vec![self.id],
        }
    }

    pub fn size(&self) -> usize {
        self.genome.size()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn update_age(&mut self, generation: usize) {
        self.age = generation;
    }

    /// Score recorded for the named objective, if evaluated.
    pub fn score(&self, objective: &str) -> Option<f64> {
        self.scores.get(objective).copied()
    }
}
