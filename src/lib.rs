//! QAP ACO Solver Library
//!
//! An Ant Colony Optimization solver for the Quadratic Assignment Problem.
//!
//! # Features
//!
//! - Pheromone-guided stochastic construction of facility permutations
//! - Reciprocal-fitness pheromone deposit with global evaporation
//! - Fixed evaluation budget per run, replicated experiments
//! - CSV logging of mean-fitness series and JSON summaries
//!
//! # Example
//!
//! ```no_run
//! use qap_aco_solver::instance::QAPInstance;
//! use qap_aco_solver::experiment::{CsvSeriesSink, Experiment, ExperimentConfig};
//!
//! let instance = QAPInstance::from_file("Uni50a.dat").unwrap();
//!
//! let experiment = Experiment::new(&instance, ExperimentConfig::default()).unwrap();
//! let mut sink = CsvSeriesSink::new("output.csv");
//! let result = experiment.run_into(&mut sink).unwrap();
//!
//! println!("Best: {:?}", result.best_fitness);
//! println!("{}", result.mean_best_fitness());
//! ```

pub mod aco;
pub mod error;
pub mod experiment;
pub mod instance;
pub mod solution;

pub use error::{AcoError, AcoResult};
pub use instance::QAPInstance;
pub use solution::Permutation;
