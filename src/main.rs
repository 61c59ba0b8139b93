//! QAP ACO Solver - Command Line Interface
//!
//! Runs replicated Ant Colony Optimization experiments on a QAP instance.

use clap::{Parser, Subcommand};
use qap_aco_solver::aco::{ACOConfig, AntColonyOptimization};
use qap_aco_solver::error::AcoResult;
use qap_aco_solver::experiment::{CsvSeriesSink, Experiment, ExperimentConfig};
use qap_aco_solver::instance::QAPInstance;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qap-aco")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Ant Colony Optimization for the Quadratic Assignment Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run replicated experiments and append the mean-fitness series to a CSV file
    Run {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// CSV file the series are appended to
        #[arg(short, long, default_value = "output.csv")]
        output: PathBuf,

        /// JSON configuration file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of ants per iteration (m)
        #[arg(short = 'm', long)]
        ants: Option<usize>,

        /// Evaporation rate (e), in (0, 1]
        #[arg(short = 'e', long)]
        evaporation: Option<f64>,

        /// Fitness evaluations per run
        #[arg(short, long)]
        budget: Option<usize>,

        /// Number of independent runs
        #[arg(short, long)]
        replicates: Option<usize>,

        /// Random seed of the first run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the full experiment result as JSON
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Run a single ACO run and print the best assignment
    Solve {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of ants per iteration (m)
        #[arg(short = 'm', long, default_value = "100")]
        ants: usize,

        /// Evaporation rate (e), in (0, 1]
        #[arg(short = 'e', long, default_value = "0.5")]
        evaporation: f64,

        /// Fitness evaluations for the run
        #[arg(short, long, default_value = "10000")]
        budget: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output run result to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run {
            instance,
            output,
            config,
            ants,
            evaporation,
            budget,
            replicates,
            seed,
            summary,
            progress,
        } => load_config(config.as_deref()).and_then(|mut experiment_config| {
            if let Some(m) = ants {
                experiment_config.aco.num_ants = m;
            }
            if let Some(e) = evaporation {
                experiment_config.aco.evaporation_rate = e;
            }
            if let Some(b) = budget {
                experiment_config.aco.evaluation_budget = b;
            }
            if let Some(r) = replicates {
                experiment_config.num_replicates = r;
            }
            if let Some(s) = seed {
                experiment_config.aco.seed = s;
            }
            experiment_config.show_progress |= progress;

            run_experiment(&instance, &output, experiment_config, summary.as_deref())
        }),

        Commands::Solve {
            instance,
            ants,
            evaporation,
            budget,
            seed,
            output,
        } => {
            let config = ACOConfig {
                num_ants: ants,
                evaporation_rate: evaporation,
                evaluation_budget: budget,
                seed,
            };
            solve_instance(&instance, config, output.as_deref())
        }

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> AcoResult<ExperimentConfig> {
    match path {
        Some(path) => ExperimentConfig::from_json_file(path),
        None => Ok(ExperimentConfig::default()),
    }
}

fn run_experiment(
    path: &Path,
    output: &Path,
    config: ExperimentConfig,
    summary: Option<&Path>,
) -> AcoResult<()> {
    let instance = QAPInstance::from_file(path)?;
    let experiment = Experiment::new(&instance, config)?;

    let mut sink = CsvSeriesSink::new(output);
    let result = experiment.run_into(&mut sink)?;

    let aco = &result.config.aco;
    println!(
        "m: {}, e: {}\nBest: {:?}",
        aco.num_ants, aco.evaporation_rate, result.best_fitness
    );
    println!("{}", result.mean_best_fitness());
    log::info!("\n{}", result.generate_report());

    if let Some(summary_path) = summary {
        result.save_json(summary_path)?;
        println!("Summary saved to {:?}", summary_path);
    }

    Ok(())
}

fn solve_instance(path: &Path, config: ACOConfig, output: Option<&Path>) -> AcoResult<()> {
    println!("Loading instance from {:?}...", path);
    let instance = QAPInstance::from_file(path)?;

    println!(
        "Solving {} (n={}) with {} ants, e={}...",
        instance.name, instance.dimension, config.num_ants, config.evaporation_rate
    );
    let result = AntColonyOptimization::new(&instance, config)?.run()?;

    println!("\n========== Results ==========");
    println!("Best fitness: {}", result.best_fitness);
    println!("Assignment: {}", result.best_path);
    println!("Start node: {}", result.start);
    println!("Iterations: {}", result.iterations());
    if let Some(last) = result.mean_fitness.last() {
        println!("Final mean fitness: {:.2}", last);
    }
    println!("Time: {:.4}s", result.computation_time);

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out_path, json)?;
        println!("\nRun saved to {:?}", out_path);
    }

    Ok(())
}

fn analyze_instance(path: &Path) -> AcoResult<()> {
    let instance = QAPInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    Ok(())
}
