//! Evolution engine: one steady-state generation per [`EvolutionEngine::evolve`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::schema::{ConfigError, ParentOffspringRow, RunRecord, SearchConfig, StopReason};

use super::archive::{Archive, MergeDeadline, NoArchive};
use super::budget::BudgetTracker;
use super::candidate::{Candidate, Genome};
use super::escalation::EscalationPolicy;
use super::factory::CandidateFactory;
use super::local_search::{LocalSearch, LocalSearchContext, NoLocalSearch};
use super::objective::ObjectiveSet;
use super::operators::OperatorSet;
use super::population::Population;
use super::rng::SearchRng;

/// Unrecoverable run failure.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Candidate factory produced no candidates in {attempts} attempts")]
    NoCandidates { attempts: usize },
    #[error("Population is empty")]
    EmptyPopulation,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Steady-state monotonic GA over genomes of type `G`.
pub struct EvolutionEngine<G> {
    config: SearchConfig,
    rng: SearchRng,
    operators: OperatorSet<G>,
    factory: Box<dyn CandidateFactory<G>>,
    objectives: ObjectiveSet<G>,
    population: Population<G>,
    budget: Arc<BudgetTracker>,
    escalation: EscalationPolicy,
    archive: Box<dyn Archive<G>>,
    local_search: Box<dyn LocalSearch<G>>,
    next_id: u64,
    cancelled: Arc<AtomicBool>,
}

impl<G: Genome + 'static> EvolutionEngine<G> {
    /// Validate the configuration and start the budget clock.
    pub fn new(
        config: SearchConfig,
        objectives: ObjectiveSet<G>,
        operators: OperatorSet<G>,
        factory: impl CandidateFactory<G> + 'static,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let budget = Arc::new(BudgetTracker::start(&config.budget));
        let escalation = EscalationPolicy::new(config.escalation.clone());

        Ok(Self {
            rng: SearchRng::new(seed),
            operators,
            factory: Box::new(factory),
            objectives,
            population: Population::default(),
            budget,
            escalation,
            archive: Box::new(NoArchive),
            local_search: Box::new(NoLocalSearch),
            next_id: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn with_archive(mut self, archive: impl Archive<G> + 'static) -> Self {
        self.archive = Box::new(archive);
        self
    }

    pub fn with_local_search(mut self, local_search: impl LocalSearch<G> + 'static) -> Self {
        self.local_search = Box::new(local_search);
        self
    }

    /// Start from the given candidates instead of factory output. They are
    /// evaluated and sorted during initialization.
    pub fn with_population(mut self, members: Vec<Candidate<G>>) -> Self {
        self.next_id = members.iter().map(|c| c.id + 1).max().unwrap_or(0);
        self.population = Population::new(members);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    pub fn objectives(&self) -> &ObjectiveSet<G> {
        &self.objectives
    }

    pub fn budget(&self) -> &Arc<BudgetTracker> {
        &self.budget
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.population.best_fitness()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Fill the population from the factory, evaluate it in parallel and sort.
    ///
    /// A population that is already seeded is only evaluated and sorted.
    pub fn initialize_population(&mut self) -> Result<(), SearchError> {
        let target = self.config.population_size;
        let max_attempts = target.saturating_mul(self.config.factory_attempts_per_slot);
        let mut members = std::mem::take(&mut self.population).into_members();
        let mut attempts = 0;

        while members.len() < target && attempts < max_attempts {
            attempts += 1;
            match self.factory.create(&mut self.rng) {
                Ok(genome) => {
                    let id = self.next_id();
                    members.push(Candidate::new(id, genome, 0));
                }
                Err(e) => log::debug!("Factory attempt {attempts} failed: {e}"),
            }
        }

        if members.is_empty() {
            return Err(SearchError::NoCandidates { attempts });
        }
        if members.len() < target {
            log::warn!(
                "Initial population has {} of {} candidates after {} attempts",
                members.len(),
                target,
                attempts
            );
        }

        self.population = Population::new(members);
        self.evaluate_population();
        log::info!(
            "Initialized population of {} (best {:?})",
            self.population.len(),
            self.best_fitness()
        );
        Ok(())
    }

    /// Evaluate every member in parallel, then restore the best-first order.
    pub fn evaluate_population(&mut self) {
        let objectives = &self.objectives;
        self.population
            .as_mut_slice()
            .par_iter_mut()
            .for_each(|candidate| objectives.evaluate(candidate));
        self.budget
            .record_evaluations(self.population.len() as u64);
        self.population.sort(&self.objectives);
    }

    /// Run-start escalation adjustment.
    pub fn prepare_escalation(&mut self) {
        self.escalation.prepare(&mut self.objectives);
    }

    /// Iteration-boundary escalation. Newly active objectives are scored on
    /// the whole population so tie-breaking sees them.
    pub fn escalate(&mut self, starvation: usize) -> usize {
        let activated =
            self.escalation
                .apply(&mut self.objectives, starvation, self.budget.progress());
        if activated > 0 {
            self.evaluate_population();
        }
        activated
    }

    /// Apply local search with the configured probability. Returns whether
    /// the population changed; the caller decides whether to resort.
    pub fn local_search(&mut self, generation: usize) -> bool {
        if !self.rng.chance(self.config.local_search.rate) {
            return false;
        }

        let mut ctx = LocalSearchContext {
            objectives: &self.objectives,
            budget: self.budget.as_ref(),
            rng: &mut self.rng,
            generation,
        };
        self.local_search.refine(&mut self.population, &mut ctx)
    }

    pub fn sort(&mut self) {
        self.population.sort(&self.objectives);
    }

    /// Pull the archived best back into the population within the configured
    /// allowance. Failures are logged and reported as "not merged".
    pub fn merge_archive(&mut self) -> bool {
        let deadline = MergeDeadline::after_ms(self.config.archive_merge_timeout_ms);
        match self
            .archive
            .merge_best_known(&mut self.population, &self.objectives, deadline)
        {
            Ok(merged) => {
                if merged {
                    self.population.sort(&self.objectives);
                }
                merged
            }
            Err(e) => {
                log::warn!("Archive merge skipped: {e}");
                false
            }
        }
    }

    fn target_reached(&self) -> bool {
        match (self.budget.target_fitness(), self.best_fitness()) {
            (Some(target), Some(best)) => self.objectives.direction().reached(best, target),
            _ => false,
        }
    }

    /// Why the search should stop, if it should.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if let Some(kind) = self.budget.is_exhausted() {
            return Some(StopReason::BudgetExhausted(kind));
        }
        if self.target_reached() {
            return Some(StopReason::TargetReached);
        }
        None
    }

    pub fn is_finished(&self) -> bool {
        self.stop_reason().is_some()
    }

    /// Fresh, evaluated factory candidate for headless chicken crossover.
    fn headless_parent(&mut self, generation: usize) -> Option<Candidate<G>> {
        match self.factory.create(&mut self.rng) {
            Ok(genome) => {
                let id = self.next_id();
                let mut candidate = Candidate::new(id, genome, generation);
                self.objectives.evaluate(&mut candidate);
                self.budget.record_evaluations(1);
                Some(candidate)
            }
            Err(e) => {
                log::warn!("Headless chicken draw failed, selecting instead: {e}");
                None
            }
        }
    }

    fn select_parent(&mut self) -> Option<Candidate<G>> {
        let index = self
            .operators
            .selection
            .select(&self.population, &self.objectives, &mut self.rng);
        self.population.get(index).cloned()
    }

    /// Build the next generation.
    ///
    /// The best member survives through elitism, every admitted pair is no
    /// worse than its parents under the replacement rule, and the new
    /// population never exceeds the target size.
    pub fn evolve(&mut self, run: &mut RunRecord) {
        let target = self.config.population_size;
        let current = run.generation;
        let elite_count = self.config.elite_count.min(self.population.len());

        let mut next = self.population.elite(elite_count);
        let mut crossover_failures = 0;

        while next.len() < target {
            if self.is_finished() {
                log::debug!(
                    "Generation {} preempted with {} of {} members",
                    current + 1,
                    next.len(),
                    target
                );
                break;
            }

            let Some(parent1) = self.select_parent() else {
                break;
            };
            let headless = if self.config.headless_chicken {
                self.headless_parent(current + 1)
            } else {
                None
            };
            let Some(parent2) = headless.or_else(|| self.select_parent()) else {
                break;
            };

            let mut offspring1 = parent1.offspring(self.next_id(), current + 1);
            let mut offspring2 = parent2.offspring(self.next_id(), current + 1);
            offspring1.parents.push(parent2.id);
            offspring2.parents.push(parent1.id);

            let mut crossover_applied = false;
            if self.rng.chance(self.config.crossover_rate) {
                if crossover_failures >= self.config.max_crossover_retries {
                    log::warn!(
                        "{crossover_failures} consecutive crossover failures, skipping crossover for one pair"
                    );
                    crossover_failures = 0;
                } else {
                    match self.operators.crossover.crossover(
                        &mut offspring1.genome,
                        &mut offspring2.genome,
                        &mut self.rng,
                    ) {
                        Ok(()) => {
                            crossover_failures = 0;
                            crossover_applied = true;
                            offspring1.mark_changed();
                            offspring2.mark_changed();
                        }
                        Err(e) => {
                            log::info!("{e}; reselecting parents");
                            crossover_failures += 1;
                            continue;
                        }
                    }
                }
            }

            for offspring in [&mut offspring1, &mut offspring2] {
                if self.operators.mutation.mutate(&mut offspring.genome, &mut self.rng) {
                    offspring.mark_changed();
                }
                if offspring.is_changed() {
                    offspring.update_age(current);
                }
                self.objectives.evaluate(offspring);
            }
            self.budget.record_evaluations(2);

            for (parent, child, applied) in [
                (&parent1, &offspring1, true),
                (&parent2, &offspring2, true),
                (&parent1, &offspring2, crossover_applied),
                (&parent2, &offspring1, crossover_applied),
            ] {
                run.log.push_parent_offspring(ParentOffspringRow {
                    iteration: current,
                    operator_applied: applied,
                    parent_fitness: parent.fitness,
                    offspring_fitness: child.fitness,
                });
            }

            let keep = self.operators.replacement.keep_offspring(
                (&parent1, &parent2),
                (&offspring1, &offspring2),
                &self.objectives,
            );
            log::debug!(
                "Pair {}+{} -> {} ({}), {} ({}): {}",
                parent1.id,
                parent2.id,
                offspring1.id,
                offspring1.fitness,
                offspring2.id,
                offspring2.fitness,
                if keep { "offspring" } else { "parents" }
            );

            if keep {
                next.extend(admit(
                    (parent1, parent2),
                    (offspring1, offspring2),
                    self.config.max_length,
                    &mut self.rng,
                ));
            } else {
                next.push(parent1);
                next.push(parent2);
            }
        }

        if next.len() < target {
            let missing = target - next.len();
            next.extend(
                self.population
                    .iter()
                    .skip(elite_count)
                    .take(missing)
                    .cloned(),
            );
        }
        next.truncate(target);

        self.population.replace(next);
        self.population.sort(&self.objectives);
        self.archive.update(&self.population, &self.objectives);

        run.generation += 1;
        self.budget.record_generation();
    }
}

/// Whether an offspring violates the length constraint or is empty.
fn is_rejected<G: Genome>(candidate: &Candidate<G>, max_length: Option<usize>) -> bool {
    let size = candidate.size();
    size == 0 || max_length.is_some_and(|max| size > max)
}

/// Members contributed by an accepted pair: offspring that pass the length
/// check, with rejected ones replaced by parents.
fn admit<G: Genome>(
    parents: (Candidate<G>, Candidate<G>),
    offspring: (Candidate<G>, Candidate<G>),
    max_length: Option<usize>,
    rng: &mut SearchRng,
) -> [Candidate<G>; 2] {
    let (parent1, parent2) = parents;
    let (offspring1, offspring2) = offspring;

    match (
        is_rejected(&offspring1, max_length),
        is_rejected(&offspring2, max_length),
    ) {
        (false, false) => [offspring1, offspring2],
        (false, true) => [offspring1, rng.choose(parent1, parent2)],
        (true, false) => [offspring2, rng.choose(parent1, parent2)],
        (true, true) => [parent1, parent2],
    }
}
