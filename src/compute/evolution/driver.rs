//! Run driver: initialization, the generation loop and end-of-run reporting.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::report::ReportWriter;
use crate::schema::{
    FitnessRow, RunPhase, RunRecord, SearchProgress, SearchStats, StatisticsLog,
};

use super::candidate::{Candidate, Genome};
use super::engine::{EvolutionEngine, SearchError};
use super::objective::Direction;
use super::population::Population;

/// Outcome of a completed search.
#[derive(Debug, Clone)]
pub struct SearchResult<G> {
    /// Best candidate of the final population.
    pub best: Candidate<G>,
    /// Final population, best first.
    pub population: Population<G>,
    pub stats: SearchStats,
    /// Fitness and parent/offspring rows gathered during the run.
    pub log: StatisticsLog,
}

/// Best-fitness monotonicity check, strict (panicking) or counting.
#[derive(Debug, Clone)]
pub struct InvariantCheck {
    strict: bool,
    tolerance: f64,
    violations: usize,
}

impl InvariantCheck {
    pub fn new(strict: bool, tolerance: f64) -> Self {
        Self {
            strict,
            tolerance,
            violations: 0,
        }
    }

    /// Verify that `after` is not worse than `before`. Returns whether the
    /// invariant held.
    ///
    /// # Panics
    ///
    /// In strict mode, on a regression larger than the tolerance.
    pub fn check(
        &mut self,
        stage: &str,
        direction: Direction,
        before: Option<f64>,
        after: Option<f64>,
    ) -> bool {
        let (Some(before), Some(after)) = (before, after) else {
            return true;
        };
        if !direction.regressed(before, after, self.tolerance) {
            return true;
        }

        if self.strict {
            panic!("Best fitness regressed during {stage}: {before} -> {after}");
        }
        log::error!("Best fitness regressed during {stage}: {before} -> {after}");
        self.violations += 1;
        false
    }

    pub fn violations(&self) -> usize {
        self.violations
    }
}

/// Drives an [`EvolutionEngine`] from initialization to the final report.
pub struct RunDriver<G> {
    engine: EvolutionEngine<G>,
    run: RunRecord,
    phase: RunPhase,
    invariants: InvariantCheck,
    last_best: Option<f64>,
}

/// Upper bound on fitness rows reserved up front.
const MAX_PREALLOCATED_ROWS: usize = 1 << 16;

impl<G: Genome + 'static> RunDriver<G> {
    pub fn new(engine: EvolutionEngine<G>) -> Self {
        let config = engine.config();
        let invariants = InvariantCheck::new(config.strict_invariants, config.fitness_tolerance);
        let capacity = config
            .budget
            .max_generations
            .map_or(0, |g| g.saturating_add(1).min(MAX_PREALLOCATED_ROWS));

        Self {
            engine,
            run: RunRecord {
                log: StatisticsLog::with_capacity(capacity),
                ..Default::default()
            },
            phase: RunPhase::Init,
            invariants,
            last_best: None,
        }
    }

    pub fn engine(&self) -> &EvolutionEngine<G> {
        &self.engine
    }

    pub fn record(&self) -> &RunRecord {
        &self.run
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.engine.cancel_handle()
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> SearchProgress {
        let population = self.engine.population();
        let budget = self.engine.budget();

        SearchProgress {
            generation: self.run.generation,
            phase: self.phase,
            best_fitness: population.best_fitness().unwrap_or_default(),
            worst_fitness: population.worst_fitness().unwrap_or_default(),
            mean_fitness: population.mean_fitness(),
            population_size: population.len(),
            starvation: self.run.starvation,
            evaluations: budget.evaluations(),
            elapsed_ms: budget.elapsed().as_millis() as u64,
            active_secondaries: self.engine.objectives().active_secondary_count(),
        }
    }

    fn record_fitness(&mut self) {
        let population = self.engine.population();
        self.run.log.push_fitness(FitnessRow {
            iteration: self.run.generation,
            best_fitness: population.best_fitness().unwrap_or_default(),
            worst_fitness: population.worst_fitness().unwrap_or_default(),
            population_size: population.len(),
        });
    }

    /// Count iterations whose best fitness is bit-identical to the last one.
    fn update_starvation(&mut self) {
        let best = self.engine.best_fitness();
        if best.map(f64::to_bits) == self.last_best.map(f64::to_bits) {
            self.run.starvation += 1;
            return;
        }

        if self.run.starvation > 0 {
            log::info!(
                "Best fitness changed to {:?} after {} stagnant iterations",
                best,
                self.run.starvation
            );
        }
        self.run.starvation = 0;
        self.last_best = best;
    }

    fn write_reports(&self) {
        let report = &self.engine.config().report;
        if !report.enabled {
            return;
        }

        let writer = ReportWriter::new(&report.output_dir);
        match writer.write_all(&self.run.log) {
            Ok(()) => log::info!("Wrote reports to {}", writer.dir().display()),
            Err(e) => log::warn!("Could not write reports: {e}"),
        }
    }

    /// Run the full search, calling `callback` after initialization and
    /// after every generation.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<SearchResult<G>, SearchError>
    where
        F: FnMut(&SearchProgress),
    {
        self.phase = RunPhase::Init;
        self.engine.prepare_escalation();
        self.engine.initialize_population()?;

        let direction = self.engine.objectives().direction();
        self.last_best = self.engine.best_fitness();
        self.record_fitness();
        callback(&self.progress());

        self.phase = RunPhase::Evolving;
        let stop_reason = loop {
            if let Some(reason) = self.engine.stop_reason() {
                break reason;
            }

            let before = self.engine.best_fitness();
            self.engine.evolve(&mut self.run);
            let after = self.engine.best_fitness();
            self.invariants.check("evolve", direction, before, after);

            if self.engine.local_search(self.run.generation) {
                self.engine.sort();
                let refined = self.engine.best_fitness();
                self.invariants
                    .check("local search", direction, after, refined);
            }

            self.update_starvation();
            self.engine.escalate(self.run.starvation);
            self.record_fitness();

            let progress = self.progress();
            log::info!(
                "Generation {}: best {} worst {} mean {:.3} (starvation {})",
                progress.generation,
                progress.best_fitness,
                progress.worst_fitness,
                progress.mean_fitness,
                progress.starvation
            );
            callback(&progress);
        };

        self.phase = RunPhase::Finalizing;
        let archive_merged = self.engine.merge_archive();
        self.write_reports();

        let population = self.engine.population().clone();
        let best = population
            .best()
            .cloned()
            .ok_or(SearchError::EmptyPopulation)?;
        let budget = self.engine.budget();

        let stats = SearchStats {
            generations: self.run.generation,
            total_evaluations: budget.evaluations(),
            best_fitness: best.fitness,
            final_mean_fitness: population.mean_fitness(),
            elapsed_seconds: budget.elapsed().as_secs_f64(),
            invariant_violations: self.invariants.violations(),
            final_starvation: self.run.starvation,
            active_secondaries: self.engine.objectives().active_secondary_count(),
            archive_merged,
            stop_reason,
        };
        log::info!(
            "Search stopped ({:?}) after {} generations, best {}",
            stats.stop_reason,
            stats.generations,
            stats.best_fitness
        );

        self.phase = RunPhase::Done;
        Ok(SearchResult {
            best,
            population,
            stats,
            log: self.run.log.clone(),
        })
    }

    /// Run the full search (blocking).
    pub fn run(&mut self) -> Result<SearchResult<G>, SearchError> {
        self.run_with_callback(|_| {})
    }

    /// Alias of [`RunDriver::run`].
    pub fn generate_solution(&mut self) -> Result<SearchResult<G>, SearchError> {
        self.run()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use proptest::prelude::*;

    use super::*;
    use crate::compute::evolution::archive::BestArchive;
    use crate::compute::evolution::factory::FactoryError;
    use crate::compute::evolution::local_search::HillClimber;
    use crate::compute::evolution::objective::{FitnessFunction, ObjectiveSet};
    use crate::compute::evolution::operators::{Mutation, OperatorSet, Selection};
    use crate::compute::evolution::rng::SearchRng;
    use crate::compute::evolution::vector::{
        GeneSum, IntVector, IntVectorFactory, IntVectorMutation, SinglePointCrossover,
        VectorLength,
    };
    use crate::report::{FITNESS_FILE, PARENT_OFFSPRING_FILE};
    use crate::schema::{
        BudgetConfig, BudgetKind, EscalationConfig, LocalSearchConfig, SearchConfig, StopReason,
        VectorGenomeConfig,
    };

    struct Unchanged;
    impl Mutation<IntVector> for Unchanged {
        fn mutate(&self, _genome: &mut IntVector, _rng: &mut SearchRng) -> bool {
            false
        }
    }

    /// Appends a gene to every genome.
    struct Grow;
    impl Mutation<IntVector> for Grow {
        fn mutate(&self, genome: &mut IntVector, _rng: &mut SearchRng) -> bool {
            genome.genes.push(1);
            true
        }
    }

    /// Genome length scaled far below any sensible tolerance.
    struct TinyLength;
    impl FitnessFunction<IntVector> for TinyLength {
        fn name(&self) -> &str {
            "tiny_length"
        }

        fn direction(&self) -> Direction {
            Direction::Maximize
        }

        fn score(&self, genome: &IntVector) -> f64 {
            genome.genes.len() as f64 * 1e-12
        }
    }

    /// Always picks the current best.
    struct FirstMember;
    impl Selection<IntVector> for FirstMember {
        fn select(
            &self,
            _population: &Population<IntVector>,
            _objectives: &ObjectiveSet<IntVector>,
            _rng: &mut SearchRng,
        ) -> usize {
            0
        }
    }

    fn quiet_config(population_size: usize, generations: usize, seed: u64) -> SearchConfig {
        let mut config = SearchConfig {
            population_size,
            budget: BudgetConfig::generations(generations),
            random_seed: Some(seed),
            strict_invariants: true,
            ..Default::default()
        };
        config.report.enabled = false;
        config
    }

    fn length_driver(
        config: SearchConfig,
        direction: Direction,
        mutation: impl Mutation<IntVector> + 'static,
    ) -> RunDriver<IntVector> {
        let operators =
            OperatorSet::new(&config, SinglePointCrossover::new(config.max_length), mutation);
        driver_with(config, direction, operators)
    }

    fn driver_with(
        config: SearchConfig,
        direction: Direction,
        operators: OperatorSet<IntVector>,
    ) -> RunDriver<IntVector> {
        let genome = VectorGenomeConfig::default();
        let engine = EvolutionEngine::new(
            config,
            ObjectiveSet::single(VectorLength::new(direction)),
            operators,
            IntVectorFactory::new(&genome),
        )
        .unwrap();
        RunDriver::new(engine)
    }

    fn assert_monotonic(rows: &[FitnessRow], direction: Direction) {
        for pair in rows.windows(2) {
            assert!(
                !direction.regressed(pair[0].best_fitness, pair[1].best_fitness, 0.0),
                "best fitness regressed: {:?}",
                pair
            );
        }
    }

    #[test]
    fn test_size_fitness_scenario() {
        let mut config = quiet_config(10, 5, 7);
        config.elite_count = 1;
        config.crossover_rate = 0.0;
        let genome = VectorGenomeConfig {
            mutation_rate: 1.0,
            ..Default::default()
        };
        let mut driver = length_driver(config, Direction::Maximize, IntVectorMutation::new(&genome));

        let result = driver.run().unwrap();
        let rows = result.log.fitness_rows();

        assert_eq!(rows.len(), 6);
        assert_eq!(
            rows.iter().map(|r| r.iteration).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4, 5]
        );
        assert_monotonic(rows, Direction::Maximize);
        assert!(rows.iter().all(|r| r.population_size == 10));
        assert_eq!(result.log.parent_offspring_rows().len(), 5 * 5 * 4);
        assert_eq!(
            result.stats.stop_reason,
            StopReason::BudgetExhausted(BudgetKind::Generations)
        );
        assert_eq!(result.stats.generations, 5);
        assert_eq!(result.stats.invariant_violations, 0);
        assert_eq!(result.best.fitness, result.stats.best_fitness);
    }

    #[test]
    fn test_failing_factory_aborts_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(10, 5, 1);
        config.report.enabled = true;
        config.report.output_dir = dir.path().join("out").to_string_lossy().into_owned();

        let operators = OperatorSet::new(&config, SinglePointCrossover::default(), Unchanged);
        let factory = |_: &mut SearchRng| -> Result<IntVector, FactoryError> {
            Err(FactoryError::ConstructionFailed("no genomes".to_string()))
        };
        let engine = EvolutionEngine::new(
            config,
            ObjectiveSet::single(VectorLength::new(Direction::Maximize)),
            operators,
            factory,
        )
        .unwrap();
        let mut driver = RunDriver::new(engine);

        assert!(matches!(driver.run(), Err(SearchError::NoCandidates { .. })));
        assert!(driver.record().log.fitness_rows().is_empty());
        assert!(driver.record().log.parent_offspring_rows().is_empty());
        assert!(!dir.path().join("out").join(FITNESS_FILE).exists());
    }

    #[test]
    fn test_starvation_increments_without_improvement() {
        let mut config = quiet_config(6, 4, 3);
        config.crossover_rate = 0.0;
        let mut driver = length_driver(config, Direction::Maximize, Unchanged);

        let result = driver.run().unwrap();
        assert_eq!(result.stats.final_starvation, 4);
    }

    #[test]
    fn test_starvation_resets_on_improvement() {
        let mut config = quiet_config(6, 4, 3);
        config.crossover_rate = 0.0;
        let operators = OperatorSet::new(&config, SinglePointCrossover::default(), Grow)
            .with_selection(FirstMember);
        let mut driver = driver_with(config, Direction::Maximize, operators);

        let mut starvation = Vec::new();
        let result = driver
            .run_with_callback(|p| starvation.push(p.starvation))
            .unwrap();

        // Every generation grows the best genome by one gene.
        assert_eq!(starvation, vec![0, 0, 0, 0, 0]);
        assert_eq!(result.stats.final_starvation, 0);
        let rows = result.log.fitness_rows();
        assert_eq!(rows[4].best_fitness, rows[0].best_fitness + 4.0);
    }

    #[test]
    fn test_starvation_ignores_fitness_tolerance() {
        let mut config = quiet_config(6, 4, 3);
        config.crossover_rate = 0.0;
        config.fitness_tolerance = 1e-9;
        let operators = OperatorSet::new(&config, SinglePointCrossover::default(), Grow)
            .with_selection(FirstMember);
        let engine = EvolutionEngine::new(
            config,
            ObjectiveSet::single(TinyLength),
            operators,
            IntVectorFactory::new(&VectorGenomeConfig::default()),
        )
        .unwrap();
        let mut driver = RunDriver::new(engine);

        let mut starvation = Vec::new();
        let result = driver
            .run_with_callback(|p| starvation.push(p.starvation))
            .unwrap();

        // Each gain is below the tolerance but still changes the bits.
        for pair in result.log.fitness_rows().windows(2) {
            let gain = pair[1].best_fitness - pair[0].best_fitness;
            assert!(gain > 0.0 && gain < 1e-9, "gain {gain}");
        }
        assert_eq!(starvation, vec![0, 0, 0, 0, 0]);
        assert_eq!(result.stats.final_starvation, 0);
    }

    #[test]
    fn test_cancelled_before_start() {
        let config = quiet_config(6, 100, 3);
        let mut driver = length_driver(config, Direction::Maximize, Unchanged);
        driver.cancel_handle().store(true, Ordering::Relaxed);

        let result = driver.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
        assert_eq!(result.log.fitness_rows().len(), 1);
        assert_eq!(driver.phase(), RunPhase::Done);
    }

    #[test]
    fn test_target_fitness_stops_early() {
        let mut config = quiet_config(6, 100, 3);
        config.crossover_rate = 0.0;
        config.budget.target_fitness = Some(15.0);
        let operators = OperatorSet::new(&config, SinglePointCrossover::default(), Grow)
            .with_selection(FirstMember);
        let mut driver = driver_with(config, Direction::Maximize, operators);

        let result = driver.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert!(result.best.fitness >= 15.0);
        assert!(result.stats.generations < 100);
    }

    #[test]
    fn test_reports_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(6, 3, 9);
        config.report.enabled = true;
        config.report.output_dir = dir.path().join("report").to_string_lossy().into_owned();
        let mut driver = length_driver(config, Direction::Minimize, Unchanged);

        driver.run().unwrap();

        let fitness = std::fs::read_to_string(dir.path().join("report").join(FITNESS_FILE)).unwrap();
        assert_eq!(fitness.lines().count(), 4);
        assert!(fitness.starts_with("0,"));
        let pairs =
            std::fs::read_to_string(dir.path().join("report").join(PARENT_OFFSPRING_FILE)).unwrap();
        assert_eq!(pairs.lines().count(), 3 * 3 * 4);
    }

    #[test]
    fn test_unwritable_report_dir_is_not_fatal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = quiet_config(6, 2, 9);
        config.report.enabled = true;
        config.report.output_dir = file.path().join("sub").to_string_lossy().into_owned();
        let mut driver = length_driver(config, Direction::Maximize, Unchanged);

        let result = driver.run().unwrap();
        assert_eq!(result.stats.generations, 2);
    }

    #[test]
    fn test_deferred_escalation_activates_secondary() {
        let mut config = quiet_config(8, 6, 5);
        config.escalation = EscalationConfig {
            enable_after: 0.5,
            starvation_after: None,
        };
        let genome = VectorGenomeConfig::default();
        let operators = OperatorSet::new(
            &config,
            SinglePointCrossover::default(),
            IntVectorMutation::new(&genome),
        );
        let objectives = ObjectiveSet::single(GeneSum::new(Direction::Maximize))
            .with_secondary(VectorLength::new(Direction::Minimize));
        let engine = EvolutionEngine::new(
            config,
            objectives,
            operators,
            IntVectorFactory::new(&genome),
        )
        .unwrap();
        let mut driver = RunDriver::new(engine);

        let mut active = Vec::new();
        let result = driver
            .run_with_callback(|p| active.push(p.active_secondaries))
            .unwrap();

        // Initial snapshot plus generations 1, 2 are below half the budget.
        assert_eq!(&active[..3], &[0, 0, 0]);
        assert_eq!(active[3..], [1, 1, 1, 1]);
        assert_eq!(result.stats.active_secondaries, 1);
        assert!(result.best.score("length").is_some());
    }

    #[test]
    fn test_local_search_and_archive_keep_monotonicity() {
        let mut config = quiet_config(8, 5, 11);
        config.local_search = LocalSearchConfig {
            rate: 1.0,
            budget: 3,
            top_n: 2,
        };
        let genome = VectorGenomeConfig::default();
        let operators = OperatorSet::new(
            &config,
            SinglePointCrossover::default(),
            IntVectorMutation::new(&genome),
        );
        let engine = EvolutionEngine::new(
            config,
            ObjectiveSet::single(GeneSum::new(Direction::Maximize)),
            operators,
            IntVectorFactory::new(&genome),
        )
        .unwrap()
        .with_local_search(HillClimber::new(
            &LocalSearchConfig::default(),
            IntVectorMutation::new(&genome),
        ))
        .with_archive(BestArchive::new());
        let mut driver = RunDriver::new(engine);

        let result = driver.run().unwrap();
        assert_monotonic(result.log.fitness_rows(), Direction::Maximize);
        assert_eq!(result.stats.invariant_violations, 0);
        // The archive never beats the final elite, so nothing is merged.
        assert!(!result.stats.archive_merged);
    }

    #[test]
    fn test_non_strict_check_counts_violations() {
        let mut check = InvariantCheck::new(false, 1e-9);
        assert!(check.check("evolve", Direction::Maximize, Some(2.0), Some(2.0)));
        assert!(!check.check("evolve", Direction::Maximize, Some(2.0), Some(1.0)));
        assert!(!check.check("evolve", Direction::Minimize, Some(1.0), Some(2.0)));
        assert!(check.check("evolve", Direction::Minimize, None, Some(2.0)));
        assert_eq!(check.violations(), 2);
    }

    #[test]
    #[should_panic(expected = "regressed")]
    fn test_strict_check_panics() {
        let mut check = InvariantCheck::new(true, 0.0);
        check.check("evolve", Direction::Maximize, Some(2.0), Some(1.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_best_fitness_never_regresses(
            seed in any::<u64>(),
            maximize in any::<bool>(),
            population_size in 4usize..12,
            crossover_rate in 0.0f64..=1.0,
        ) {
            let direction = if maximize { Direction::Maximize } else { Direction::Minimize };
            let mut config = quiet_config(population_size, 6, seed);
            config.crossover_rate = crossover_rate;
            config.max_length = Some(15);
            let genome = VectorGenomeConfig::default();
            let mut driver = length_driver(config, direction, IntVectorMutation::new(&genome));

            let result = driver.run().unwrap();
            let rows = result.log.fitness_rows();

            prop_assert_eq!(rows.len(), 7);
            for pair in rows.windows(2) {
                prop_assert!(!direction.regressed(pair[0].best_fitness, pair[1].best_fitness, 0.0));
            }
            prop_assert!(rows.iter().all(|r| r.population_size == population_size));
            prop_assert!(result.population.iter().all(|c| c.size() > 0));
        }
    }
}
