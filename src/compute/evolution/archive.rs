//! Best-known archive: remembers the best candidates ever seen so they can be
//! merged back into the final population.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::candidate::{Candidate, Genome};
use super::objective::ObjectiveSet;
use super::population::Population;

/// Archive failure during the end-of-run merge.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("Archive merge exceeded its deadline of {limit_ms} ms")]
    Timeout { limit_ms: u64 },
}

/// Time allowance for one archive merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeDeadline {
    /// `None` when the allowance overflows the clock.
    at: Option<Instant>,
    limit_ms: u64,
}

impl MergeDeadline {
    /// Deadline `limit_ms` from now.
    pub fn after_ms(limit_ms: u64) -> Self {
        Self {
            at: Instant::now().checked_add(Duration::from_millis(limit_ms)),
            limit_ms,
        }
    }

    pub fn limit_ms(&self) -> u64 {
        self.limit_ms
    }

    pub fn is_past(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// `Err(Timeout)` once the deadline has passed.
    pub fn check(&self) -> Result<(), ArchiveError> {
        if self.is_past() {
            return Err(ArchiveError::Timeout {
                limit_ms: self.limit_ms,
            });
        }
        Ok(())
    }
}

/// Store of best-known candidates, updated once per generation.
pub trait Archive<G>: Send {
    /// Record the current population.
    fn update(&mut self, population: &Population<G>, objectives: &ObjectiveSet<G>);

    /// Put the archived best back into the population if it beats the
    /// current best. Returns whether the population changed.
    fn merge_best_known(
        &mut self,
        population: &mut Population<G>,
        objectives: &ObjectiveSet<G>,
        deadline: MergeDeadline,
    ) -> Result<bool, ArchiveError>;
}

/// No archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoArchive;

impl<G> Archive<G> for NoArchive {
    fn update(&mut self, _population: &Population<G>, _objectives: &ObjectiveSet<G>) {}

    fn merge_best_known(
        &mut self,
        _population: &mut Population<G>,
        _objectives: &ObjectiveSet<G>,
        _deadline: MergeDeadline,
    ) -> Result<bool, ArchiveError> {
        Ok(false)
    }
}

/// Keeps the best candidate overall plus the best per primary objective.
#[derive(Debug, Clone)]
pub struct BestArchive<G> {
    best: Option<Candidate<G>>,
    by_objective: BTreeMap<String, Candidate<G>>,
}

impl<G> Default for BestArchive<G> {
    fn default() -> Self {
        Self {
            best: None,
            by_objective: BTreeMap::new(),
        }
    }
}

impl<G: Genome> BestArchive<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<&Candidate<G>> {
        self.best.as_ref()
    }

    /// Best candidate by the raw score of one primary objective.
    pub fn best_for(&self, objective: &str) -> Option<&Candidate<G>> {
        self.by_objective.get(objective)
    }

    pub fn len(&self) -> usize {
        self.by_objective.len() + usize::from(self.best.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none() && self.by_objective.is_empty()
    }

    pub fn clear(&mut self) {
        self.best = None;
        self.by_objective.clear();
    }
}

impl<G: Genome> Archive<G> for BestArchive<G> {
    fn update(&mut self, population: &Population<G>, objectives: &ObjectiveSet<G>) {
        if let Some(candidate) = population.best() {
            let replace = self
                .best
                .as_ref()
                .is_none_or(|stored| objectives.compare(candidate, stored) == Ordering::Less);
            if replace {
                self.best = Some(candidate.clone());
            }
        }

        let direction = objectives.direction();
        for name in objectives.primary_names() {
            let leader = population
                .iter()
                .filter_map(|c| c.score(name).map(|s| (c, s)))
                .min_by(|a, b| direction.compare(a.1, b.1));

            let Some((candidate, score)) = leader else {
                continue;
            };
            let replace = self
                .by_objective
                .get(name)
                .and_then(|stored| stored.score(name))
                .is_none_or(|stored| direction.is_better(score, stored));
            if replace {
                self.by_objective.insert(name.to_string(), candidate.clone());
            }
        }
    }

    fn merge_best_known(
        &mut self,
        population: &mut Population<G>,
        objectives: &ObjectiveSet<G>,
        deadline: MergeDeadline,
    ) -> Result<bool, ArchiveError> {
        deadline.check()?;

        let Some(archived) = self.best.as_ref() else {
            return Ok(false);
        };
        let Some(first) = population.first_mut() else {
            return Ok(false);
        };

        if objectives.compare(archived, first) == Ordering::Less {
            log::debug!(
                "Merging archived candidate {} ({}) over {} ({})",
                archived.id,
                archived.fitness,
                first.id,
                first.fitness
            );
            *first = archived.clone();
            return Ok(true);
        }

        Ok(false)
    }
}
