//! Objective evaluators: pluggable fitness functions and the ordered set the
//! engine scores candidates against.

use std::cmp::Ordering;

use crate::schema::ConfigError;

use super::candidate::{Candidate, Genome};

/// Optimization direction of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Order two values so that `Less` means `a` is better.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Direction::Maximize => ord.reverse(),
            Direction::Minimize => ord,
        }
    }

    /// Whether `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Whether `after` is worse than `before` by more than `tolerance`.
    pub fn regressed(self, before: f64, after: f64, tolerance: f64) -> bool {
        match self {
            Direction::Maximize => after < before - tolerance,
            Direction::Minimize => after > before + tolerance,
        }
    }

    /// Whether `value` meets or beats `target`.
    pub fn reached(self, value: f64, target: f64) -> bool {
        match self {
            Direction::Maximize => value >= target,
            Direction::Minimize => value <= target,
        }
    }
}

/// A scoring function over genomes.
///
/// Scoring the same genome twice must give the same value, so candidates can
/// be re-evaluated safely.
pub trait FitnessFunction<G>: Send + Sync {
    /// Name used as the key of the candidate's score map.
    fn name(&self) -> &str;
    /// Whether larger or smaller scores are better.
    fn direction(&self) -> Direction;
    /// Score a genome.
    fn score(&self, genome: &G) -> f64;
}

struct SecondaryObjective<G> {
    function: Box<dyn FitnessFunction<G>>,
    active: bool,
}

/// Ordered objectives applied to every candidate.
///
/// Primary objectives are summed into the aggregate fitness and must share a
/// direction. Secondary objectives only break ties, in order, and only while
/// active.
pub struct ObjectiveSet<G> {
    primary: Vec<Box<dyn FitnessFunction<G>>>,
    secondary: Vec<SecondaryObjective<G>>,
    direction: Direction,
}

impl<G: Genome> ObjectiveSet<G> {
    /// Create a set from its primary objectives.
    pub fn new(primary: Vec<Box<dyn FitnessFunction<G>>>) -> Result<Self, ConfigError> {
        let direction = primary
            .first()
            .map(|f| f.direction())
            .ok_or(ConfigError::NoObjectives)?;

        if primary.iter().any(|f| f.direction() != direction) {
            return Err(ConfigError::MixedDirections);
        }

        Ok(Self {
            primary,
            secondary: Vec::new(),
            direction,
        })
    }

    /// Convenience constructor for a single primary objective.
    pub fn single(function: impl FitnessFunction<G> + 'static) -> Self {
        let direction = function.direction();
        Self {
            primary: vec![Box::new(function)],
            secondary: Vec::new(),
            direction,
        }
    }

    /// Append a secondary objective, active by default.
    pub fn with_secondary(mut self, function: impl FitnessFunction<G> + 'static) -> Self {
        self.secondary.push(SecondaryObjective {
            function: Box::new(function),
            active: true,
        });
        self
    }

    /// Direction shared by the primary objectives.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Score a candidate against every primary and active secondary objective.
    pub fn evaluate(&self, candidate: &mut Candidate<G>) {
        let mut total = 0.0;
        for function in &self.primary {
            let score = function.score(&candidate.genome);
            candidate.scores.insert(function.name().to_string(), score);
            total += score;
        }
        candidate.fitness = total;

        for secondary in self.secondary.iter().filter(|s| s.active) {
            let score = secondary.function.score(&candidate.genome);
            candidate
                .scores
                .insert(secondary.function.name().to_string(), score);
        }
    }

    /// Order two candidates so that `Less` means `a` is better.
    pub fn compare(&self, a: &Candidate<G>, b: &Candidate<G>) -> Ordering {
        let primary = self.direction.compare(a.fitness, b.fitness);
        if primary != Ordering::Equal {
            return primary;
        }

        for secondary in self.secondary.iter().filter(|s| s.active) {
            let name = secondary.function.name();
            let ord = match (a.score(name), b.score(name)) {
                (Some(x), Some(y)) => secondary.function.direction().compare(x, y),
                _ => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }

        Ordering::Equal
    }

    /// Activate every inactive secondary objective. Returns how many changed.
    pub fn activate_secondaries(&mut self) -> usize {
        let mut activated = 0;
        for secondary in self.secondary.iter_mut().filter(|s| !s.active) {
            log::info!(
                "Enabling secondary objective {}",
                secondary.function.name()
            );
            secondary.active = true;
            activated += 1;
        }
        activated
    }

    /// Deactivate all secondary objectives.
    pub fn deactivate_secondaries(&mut self) {
        for secondary in &mut self.secondary {
            secondary.active = false;
        }
    }

    pub fn active_secondary_count(&self) -> usize {
        self.secondary.iter().filter(|s| s.active).count()
    }

    pub fn secondary_count(&self) -> usize {
        self.secondary.len()
    }

    /// Names of the primary objectives, in order.
    pub fn primary_names(&self) -> impl Iterator<Item = &str> {
        self.primary.iter().map(|f| f.name())
    }
}
