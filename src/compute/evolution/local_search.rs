//! Local search: optional refinement of the best candidates between
//! generations.

use std::cmp::Ordering;

use crate::schema::LocalSearchConfig;

use super::budget::BudgetTracker;
use super::candidate::Genome;
use super::objective::ObjectiveSet;
use super::operators::Mutation;
use super::population::Population;
use super::rng::SearchRng;

/// Everything a refiner may consult or consume.
pub struct LocalSearchContext<'a, G> {
    pub objectives: &'a ObjectiveSet<G>,
    pub budget: &'a BudgetTracker,
    pub rng: &'a mut SearchRng,
    pub generation: usize,
}

/// Refines population members in place.
///
/// Implementations re-evaluate every candidate they change and must never
/// make a candidate worse. Returns whether any member was modified.
pub trait LocalSearch<G>: Send + Sync {
    fn refine(&self, population: &mut Population<G>, ctx: &mut LocalSearchContext<'_, G>) -> bool;
}

/// Local search disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalSearch;

impl<G> LocalSearch<G> for NoLocalSearch {
    fn refine(&self, _population: &mut Population<G>, _ctx: &mut LocalSearchContext<'_, G>) -> bool {
        false
    }
}

/// First-improvement hill climbing with a mutation operator as the
/// neighbourhood.
pub struct HillClimber<G> {
    mutation: Box<dyn Mutation<G>>,
    attempts: usize,
    top_n: usize,
}

impl<G: Genome> HillClimber<G> {
    pub fn new(config: &LocalSearchConfig, mutation: impl Mutation<G> + 'static) -> Self {
        Self {
            mutation: Box::new(mutation),
            attempts: config.budget,
            top_n: config.top_n,
        }
    }
}

impl<G: Genome> LocalSearch<G> for HillClimber<G> {
    fn refine(&self, population: &mut Population<G>, ctx: &mut LocalSearchContext<'_, G>) -> bool {
        let mut modified = false;
        let top_n = self.top_n.min(population.len());

        for candidate in population.as_mut_slice().iter_mut().take(top_n) {
            for _ in 0..self.attempts {
                if ctx.budget.is_finished() {
                    return modified;
                }

                let mut neighbour = candidate.offspring(candidate.id, ctx.generation);
                if !self.mutation.mutate(&mut neighbour.genome, ctx.rng) {
                    continue;
                }
                ctx.objectives.evaluate(&mut neighbour);
                ctx.budget.record_evaluations(1);

                if ctx.objectives.compare(&neighbour, candidate) == Ordering::Less {
                    log::trace!(
                        "Local search improved candidate {}: {} -> {}",
                        candidate.id,
                        candidate.fitness,
                        neighbour.fitness
                    );
                    candidate.genome = neighbour.genome;
                    candidate.fitness = neighbour.fitness;
                    candidate.scores = neighbour.scores;
                    candidate.mark_changed();
                    candidate.update_age(ctx.generation);
                    modified = true;
                }
            }
        }

        modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::candidate::Candidate;
    use crate::compute::evolution::objective::Direction;
    use crate::compute::evolution::vector::{GeneSum, IntVector};
    use crate::schema::BudgetConfig;

    /// Adds one to the first gene.
    struct Increment;
    impl Mutation<IntVector> for Increment {
        fn mutate(&self, genome: &mut IntVector, _rng: &mut SearchRng) -> bool {
            match genome.genes.first_mut() {
                Some(g) => {
                    *g += 1;
                    true
                }
                None => false,
            }
        }
    }

    fn population(objectives: &ObjectiveSet<IntVector>, genes: &[i64]) -> Population<IntVector> {
        let mut pop = Population::new(
            genes
                .iter()
                .enumerate()
                .map(|(i, &g)| {
                    let mut c = Candidate::new(i as u64, IntVector::new(vec![g]), 0);
                    objectives.evaluate(&mut c);
                    c
                })
                .collect(),
        );
        pop.sort(objectives);
        pop
    }

    #[test]
    fn test_hill_climber_improves_top_n_only() {
        let objectives = ObjectiveSet::single(GeneSum::new(Direction::Maximize));
        let mut pop = population(&objectives, &[5, 3, 1]);
        let budget = BudgetTracker::start(&BudgetConfig::generations(10));
        let mut rng = SearchRng::new(0);
        let config = LocalSearchConfig {
            rate: 1.0,
            budget: 4,
            top_n: 1,
        };

        let climber = HillClimber::new(&config, Increment);
        let mut ctx = LocalSearchContext {
            objectives: &objectives,
            budget: &budget,
            rng: &mut rng,
            generation: 2,
        };
        assert!(climber.refine(&mut pop, &mut ctx));

        assert_eq!(pop.best_fitness(), Some(9.0));
        assert_eq!(pop.best().map(|c| c.age), Some(2));
        assert_eq!(pop.get(1).map(|c| c.fitness), Some(3.0));
        assert_eq!(budget.evaluations(), 4);
    }

    #[test]
    fn test_hill_climber_never_worsens() {
        // Incrementing hurts under minimization, so nothing is accepted.
        let objectives = ObjectiveSet::single(GeneSum::new(Direction::Minimize));
        let mut pop = population(&objectives, &[1, 3]);
        let budget = BudgetTracker::start(&BudgetConfig::generations(10));
        let mut rng = SearchRng::new(0);
        let climber = HillClimber::new(&LocalSearchConfig::default(), Increment);
        let mut ctx = LocalSearchContext {
            objectives: &objectives,
            budget: &budget,
            rng: &mut rng,
            generation: 1,
        };

        assert!(!climber.refine(&mut pop, &mut ctx));
        assert_eq!(pop.best_fitness(), Some(1.0));
    }

    #[test]
    fn test_hill_climber_stops_on_exhausted_budget() {
        let objectives = ObjectiveSet::single(GeneSum::new(Direction::Maximize));
        let mut pop = population(&objectives, &[0]);
        let budget = BudgetTracker::start(&BudgetConfig {
            max_generations: None,
            max_evaluations: Some(2),
            ..Default::default()
        });
        let mut rng = SearchRng::new(0);
        let config = LocalSearchConfig {
            rate: 1.0,
            budget: 10,
            top_n: 1,
        };
        let climber = HillClimber::new(&config, Increment);
        let mut ctx = LocalSearchContext {
            objectives: &objectives,
            budget: &budget,
            rng: &mut rng,
            generation: 0,
        };

        climber.refine(&mut pop, &mut ctx);
        assert_eq!(budget.evaluations(), 2);
        assert_eq!(pop.best_fitness(), Some(2.0));
    }
}
