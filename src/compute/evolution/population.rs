//! Population manager: the live, best-first ordered set of candidates.

use super::candidate::{Candidate, Genome};
use super::objective::ObjectiveSet;

/// Ordered collection of candidates. After [`Population::sort`], index 0 is
/// the best candidate and the last index the worst.
#[derive(Debug, Clone)]
pub struct Population<G> {
    members: Vec<Candidate<G>>,
}

impl<G> Default for Population<G> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<G: Genome> Population<G> {
    pub fn new(members: Vec<Candidate<G>>) -> Self {
        Self { members }
    }

    /// Stable sort, best first.
    pub fn sort(&mut self, objectives: &ObjectiveSet<G>) {
        self.members.sort_by(|a, b| objectives.compare(a, b));
    }

    /// Whether the members are in best-first order.
    pub fn is_sorted(&self, objectives: &ObjectiveSet<G>) -> bool {
        self.members
            .windows(2)
            .all(|w| objectives.compare(&w[0], &w[1]) != std::cmp::Ordering::Greater)
    }

    pub fn best(&self) -> Option<&Candidate<G>> {
        self.members.first()
    }

    pub fn worst(&self) -> Option<&Candidate<G>> {
        self.members.last()
    }

    /// Aggregate fitness of the first member.
    pub fn best_fitness(&self) -> Option<f64> {
        self.best().map(|c| c.fitness)
    }

    /// Aggregate fitness of the last member.
    pub fn worst_fitness(&self) -> Option<f64> {
        self.worst().map(|c| c.fitness)
    }

    pub fn mean_fitness(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|c| c.fitness).sum::<f64>() / self.members.len() as f64
    }

    /// Clones of the first `n` members.
    pub fn elite(&self, n: usize) -> Vec<Candidate<G>> {
        self.members.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate<G>> {
        self.members.get(index)
    }

    pub fn first_mut(&mut self) -> Option<&mut Candidate<G>> {
        self.members.first_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate<G>> {
        self.members.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Candidate<G>> {
        self.members.iter_mut()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Candidate<G>] {
        &mut self.members
    }

    /// Swap in a new generation.
    pub fn replace(&mut self, members: Vec<Candidate<G>>) {
        self.members = members;
    }

    pub fn into_members(self) -> Vec<Candidate<G>> {
        self.members
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}
