//! Steady GA CLI - Run the integer-vector demo search from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};

use steady_ga::{
    artifact::{Artifact, ArtifactWriter, DotFileSink},
    compute::evolution::{
        BestArchive, Direction, EvolutionEngine, GeneSum, HillClimber, IntVectorFactory,
        IntVectorMutation, ObjectiveSet, OperatorSet, RunDriver, SinglePointCrossover,
        VectorLength,
    },
    schema::{DemoConfig, InstrumentationScope},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Run a steady-state genetic search from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: DemoConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.search.validate().and(config.genome.validate()) {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    let scope = InstrumentationScope::from_file(
        config.target.clone(),
        config.scope_file.as_deref().map(Path::new),
    );

    let search = config.search.clone();

    println!("Steady GA Search");
    println!("================");
    println!(
        "Population: {} (elite {})",
        search.population_size, search.elite_count
    );
    println!("Crossover rate: {}", search.crossover_rate);
    println!("Budget: {:?}", search.budget);
    if scope.limit_to_primary() {
        println!("Instrumenting: {:?} only", scope.primary());
    } else {
        println!(
            "Instrumenting: {:?} plus {} listed",
            scope.primary(),
            scope.additional().len()
        );
    }
    println!();

    let operators = OperatorSet::new(
        &search,
        SinglePointCrossover::new(search.max_length),
        IntVectorMutation::new(&config.genome),
    );
    let objectives = ObjectiveSet::single(GeneSum::new(Direction::Maximize))
        .with_secondary(VectorLength::new(Direction::Minimize));

    let mut engine = EvolutionEngine::new(
        search.clone(),
        objectives,
        operators,
        IntVectorFactory::new(&config.genome),
    )
    .unwrap_or_else(|e| {
        eprintln!("Error creating search: {}", e);
        std::process::exit(1);
    })
    .with_archive(BestArchive::new());

    if search.local_search.rate > 0.0 {
        engine = engine.with_local_search(HillClimber::new(
            &search.local_search,
            IntVectorMutation::new(&config.genome),
        ));
    }

    // Run search
    println!("Running search...");
    let max_generations = search.budget.max_generations.unwrap_or(0);
    let every = (max_generations / 10).max(1);

    let mut driver = RunDriver::new(engine);
    let result = driver
        .run_with_callback(|progress| {
            if progress.generation % every == 0 {
                println!(
                    "  Generation {}: best={:.3}, mean={:.3}, worst={:.3}, starvation={}",
                    progress.generation,
                    progress.best_fitness,
                    progress.mean_fitness,
                    progress.worst_fitness,
                    progress.starvation
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        });

    let stats = &result.stats;
    println!();
    println!("Results:");
    println!("  Stop reason: {:?}", stats.stop_reason);
    println!("  Generations: {}", stats.generations);
    println!("  Evaluations: {}", stats.total_evaluations);
    println!("  Best fitness: {:.3}", stats.best_fitness);
    println!("  Final mean fitness: {:.3}", stats.final_mean_fitness);
    println!("  Active secondary objectives: {}", stats.active_secondaries);
    println!("  Invariant violations: {}", stats.invariant_violations);
    println!("  Archive merged: {}", stats.archive_merged);
    println!("  Best genome ({} genes): {:?}", result.best.genome.genes.len(), result.best.genome.genes);
    println!("Time: {:.2}s", stats.elapsed_seconds);

    if let Some(dir) = &config.artifact_dir {
        let sink = DotFileSink::new(dir).unwrap_or_else(|e| {
            eprintln!("Error creating artifact directory: {}", e);
            std::process::exit(1);
        });
        let name = if scope.primary().is_empty() { "best" } else { scope.primary() };
        let path = sink.path_for(name);
        let writer = ArtifactWriter::new(sink);
        let artifact = Artifact::new(name, result.best.genome.to_dot(name));
        match writer.submit(artifact).and_then(|()| writer.flush()) {
            Ok(()) => println!("Artifact: {}", path.display()),
            Err(e) => eprintln!("Error writing artifact: {}", e),
        }
    }
}

fn print_example_config() {
    let config = DemoConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example config: {}", e),
    }
}
