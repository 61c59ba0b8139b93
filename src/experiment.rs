//! Replicated experiments and result persistence.
//!
//! An experiment repeats independent ACO runs with identical parameters,
//! collects each run's mean-fitness series and best fitness, and hands them
//! to a [`ResultSink`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::aco::{ACOConfig, AntColonyOptimization, RunResult};
use crate::error::{AcoError, AcoResult};
use crate::instance::QAPInstance;
use crate::solution::Permutation;

/// Experiment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Parameters shared by every replicate
    pub aco: ACOConfig,
    /// Number of independent runs
    pub num_replicates: usize,
    /// Show a progress bar while running
    pub show_progress: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            aco: ACOConfig::default(),
            num_replicates: 5,
            show_progress: false,
        }
    }
}

impl ExperimentConfig {
    /// Load a configuration from JSON; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> AcoResult<Self> {
        let file = File::open(path)?;
        let config: ExperimentConfig = serde_json::from_reader(file)?;
        Ok(config)
    }

    pub fn validate(&self) -> AcoResult<()> {
        if self.num_replicates == 0 {
            return Err(AcoError::parameter("number of replicates must be positive"));
        }
        self.aco.validate()
    }

    /// Seed of replicate `replicate`
    pub fn replicate_seed(&self, replicate: usize) -> u64 {
        self.aco.seed.wrapping_add(replicate as u64)
    }
}

/// Collected outcome of all replicates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub instance: String,
    pub config: ExperimentConfig,
    /// One mean-fitness series per replicate, aligned by iteration
    pub mean_fitness_series: Vec<Vec<f64>>,
    /// One best fitness per replicate
    pub best_fitness: Vec<f64>,
    /// Best permutation of each replicate
    pub best_paths: Vec<Permutation>,
    pub started_at: DateTime<Utc>,
    /// Total computation time in seconds
    pub computation_time: f64,
}

impl ExperimentResult {
    /// Iterations per replicate
    pub fn iterations(&self) -> usize {
        self.mean_fitness_series.first().map_or(0, Vec::len)
    }

    /// Mean of the replicates' best fitness values
    pub fn mean_best_fitness(&self) -> f64 {
        self.best_fitness.iter().mean()
    }

    /// Element-wise mean of the mean-fitness series
    pub fn average_series(&self) -> Vec<f64> {
        let replicates = self.mean_fitness_series.len() as f64;
        (0..self.iterations())
            .map(|i| {
                self.mean_fitness_series.iter().map(|s| s[i]).sum::<f64>() / replicates
            })
            .collect()
    }

    /// Best permutation over all replicates
    pub fn best_overall(&self) -> Option<(f64, &Permutation)> {
        self.best_fitness
            .iter()
            .zip(&self.best_paths)
            .min_by(|a, b| a.0.total_cmp(b.0))
            .map(|(&fitness, path)| (fitness, path))
    }

    pub fn statistics(&self) -> ExperimentStatistics {
        let values = &self.best_fitness;
        let std_best = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };

        ExperimentStatistics {
            num_ants: self.config.aco.num_ants,
            evaporation_rate: self.config.aco.evaporation_rate,
            num_replicates: values.len(),
            iterations: self.iterations(),
            mean_best: self.mean_best_fitness(),
            std_best,
            min_best: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max_best: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            final_mean_fitness: self.average_series().last().copied().unwrap_or(f64::NAN),
        }
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let stats = self.statistics();
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        QAP Ant Colony Experiment\n");
        report.push_str("========================================\n\n");
        report.push_str(&format!("Instance: {}\n", self.instance));
        report.push_str(&format!("Started: {}\n", self.started_at.to_rfc3339()));
        report.push_str(&format!(
            "m: {}, e: {}, iterations: {}, replicates: {}\n",
            stats.num_ants, stats.evaporation_rate, stats.iterations, stats.num_replicates
        ));
        report.push_str("-".repeat(60).as_str());
        report.push('\n');
        report.push_str(&format!("{:<10} {:>14} {:>14}\n", "Replicate", "Best", "Final mean"));

        for (r, (best, series)) in self
            .best_fitness
            .iter()
            .zip(&self.mean_fitness_series)
            .enumerate()
        {
            let final_mean = series.last().copied().unwrap_or(f64::NAN);
            report.push_str(&format!("{:<10} {:>14.2} {:>14.2}\n", r, best, final_mean));
        }

        report.push_str("-".repeat(60).as_str());
        report.push('\n');
        report.push_str(&format!("Mean best: {:.2} (std {:.2})\n", stats.mean_best, stats.std_best));
        report.push_str(&format!("Range: {:.2} .. {:.2}\n", stats.min_best, stats.max_best));
        if let Some((fitness, path)) = self.best_overall() {
            report.push_str(&format!("Best assignment ({:.2}): {}\n", fitness, path));
        }
        report.push_str(&format!("Time: {:.3}s\n", self.computation_time));

        report
    }

    /// Save the whole result as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> AcoResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Summary of an experiment's best fitness values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentStatistics {
    pub num_ants: usize,
    pub evaporation_rate: f64,
    pub num_replicates: usize,
    pub iterations: usize,
    pub mean_best: f64,
    pub std_best: f64,
    pub min_best: f64,
    pub max_best: f64,
    /// Last value of the replicate-averaged mean-fitness series
    pub final_mean_fitness: f64,
}

/// Consumer of experiment results
pub trait ResultSink {
    fn record(&mut self, result: &ExperimentResult) -> AcoResult<()>;
}

/// Appends mean-fitness series to a CSV file.
///
/// Each experiment adds a row of iteration indices followed by one row per
/// replicate, so several experiments can share one file.
pub struct CsvSeriesSink {
    path: PathBuf,
}

impl CsvSeriesSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        CsvSeriesSink { path: path.into() }
    }
}

impl ResultSink for CsvSeriesSink {
    fn record(&mut self, result: &ExperimentResult) -> AcoResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        writer.write_record((0..result.iterations()).map(|i| i.to_string()))?;
        for series in &result.mean_fitness_series {
            writer.write_record(series.iter().map(|v| v.to_string()))?;
        }

        writer.flush()?;
        log::info!(
            "Appended {} series to {:?}",
            result.mean_fitness_series.len(),
            self.path
        );
        Ok(())
    }
}

/// Keeps results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub results: Vec<ExperimentResult>,
}

impl ResultSink for MemorySink {
    fn record(&mut self, result: &ExperimentResult) -> AcoResult<()> {
        self.results.push(result.clone());
        Ok(())
    }
}

/// Replication harness
pub struct Experiment<'a> {
    instance: &'a QAPInstance,
    config: ExperimentConfig,
}

impl<'a> Experiment<'a> {
    /// Parameters are checked here, before any run starts.
    pub fn new(instance: &'a QAPInstance, config: ExperimentConfig) -> AcoResult<Self> {
        config.validate()?;
        Ok(Experiment { instance, config })
    }

    /// Run a single replicate
    pub fn run_replicate(&self, replicate: usize) -> AcoResult<RunResult> {
        let aco_config = ACOConfig {
            seed: self.config.replicate_seed(replicate),
            ..self.config.aco.clone()
        };
        AntColonyOptimization::new(self.instance, aco_config)?.run()
    }

    /// Run every replicate; the first failing run aborts the experiment.
    pub fn run(&self) -> AcoResult<ExperimentResult> {
        let started_at = Utc::now();
        let started = std::time::Instant::now();
        let replicates = self.config.num_replicates;

        log::info!(
            "Running experiment on {}: m={}, e={}, {} replicates",
            self.instance.name,
            self.config.aco.num_ants,
            self.config.aco.evaporation_rate,
            replicates
        );

        let progress = if self.config.show_progress {
            ProgressBar::new(replicates as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}") {
            progress.set_style(style);
        }

        let mut mean_fitness_series = Vec::with_capacity(replicates);
        let mut best_fitness = Vec::with_capacity(replicates);
        let mut best_paths = Vec::with_capacity(replicates);

        for replicate in 0..replicates {
            let run = self.run_replicate(replicate)?;
            log::info!(
                "Replicate {}/{}: best fitness {}",
                replicate + 1,
                replicates,
                run.best_fitness
            );
            progress.set_message(format!("best {}", run.best_fitness));
            progress.inc(1);

            mean_fitness_series.push(run.mean_fitness);
            best_fitness.push(run.best_fitness);
            best_paths.push(run.best_path);
        }
        progress.finish_and_clear();

        Ok(ExperimentResult {
            instance: self.instance.name.clone(),
            config: self.config.clone(),
            mean_fitness_series,
            best_fitness,
            best_paths,
            started_at,
            computation_time: started.elapsed().as_secs_f64(),
        })
    }

    /// Run and record the result in `sink`.
    pub fn run_into<S: ResultSink + ?Sized>(&self, sink: &mut S) -> AcoResult<ExperimentResult> {
        let result = self.run()?;
        sink.record(&result)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::line_instance;

    fn create_test_instance() -> QAPInstance {
        let text = "4\n0 1 2 3\n1 0 1 2\n2 1 0 1\n3 2 1 0\n\
                    0 3 0 2\n3 0 0 1\n0 0 0 4\n2 1 4 0\n";
        QAPInstance::parse("exp", text).unwrap()
    }

    fn small_config(num_ants: usize, evaluation_budget: usize) -> ExperimentConfig {
        ExperimentConfig {
            aco: ACOConfig {
                num_ants,
                evaluation_budget,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_experiment_config() {
        let config = ExperimentConfig::default();
        assert_eq!(config.num_replicates, 5);
        assert_eq!(config.replicate_seed(3), 45);

        let bad = ExperimentConfig { num_replicates: 0, ..Default::default() };
        assert!(matches!(bad.validate(), Err(AcoError::Parameter(_))));
    }

    #[test]
    fn test_invalid_parameters_rejected_before_running() {
        let instance = create_test_instance();
        let config = small_config(0, 100);
        assert!(Experiment::new(&instance, config).is_err());
    }

    #[test]
    fn test_series_shapes() {
        let instance = create_test_instance();
        let m = 30;
        let experiment = Experiment::new(&instance, small_config(m, 10_000)).unwrap();

        let result = experiment.run().unwrap();

        assert_eq!(result.best_fitness.len(), 5);
        assert_eq!(result.mean_fitness_series.len(), 5);
        let expected = (10_000 + m - 1) / m;
        assert!(result.mean_fitness_series.iter().all(|s| s.len() == expected));
        assert_eq!(result.iterations(), expected);
    }

    #[test]
    fn test_replicates_are_independent() {
        let instance = create_test_instance();
        let experiment = Experiment::new(&instance, small_config(5, 50)).unwrap();

        let a = experiment.run_replicate(0).unwrap();
        let b = experiment.run_replicate(1).unwrap();
        let a_again = experiment.run_replicate(0).unwrap();

        assert_eq!(a.mean_fitness, a_again.mean_fitness);
        assert_ne!(a.mean_fitness, b.mean_fitness);
    }

    #[test]
    fn test_statistics() {
        let instance = line_instance(4);
        let result = Experiment::new(&instance, small_config(4, 20)).unwrap().run().unwrap();

        // Every permutation of the line instance costs 20.
        let stats = result.statistics();
        assert_eq!(stats.mean_best, 20.0);
        assert_eq!(stats.std_best, 0.0);
        assert_eq!(stats.min_best, 20.0);
        assert_eq!(stats.max_best, 20.0);
        assert_eq!(result.average_series(), vec![20.0; 5]);
        assert!(result.generate_report().contains("Mean best: 20.00"));
    }

    #[test]
    fn test_memory_sink() {
        let instance = create_test_instance();
        let experiment = Experiment::new(&instance, small_config(5, 25)).unwrap();
        let mut sink = MemorySink::default();

        let result = experiment.run_into(&mut sink).unwrap();

        assert_eq!(sink.results.len(), 1);
        assert_eq!(sink.results[0].best_fitness, result.best_fitness);
    }

    #[test]
    fn test_failed_run_records_nothing() {
        let zeros = vec![vec![0.0; 3]; 3];
        let instance = QAPInstance::new("flat", zeros.clone(), zeros).unwrap();
        let experiment = Experiment::new(&instance, small_config(2, 4)).unwrap();
        let mut sink = MemorySink::default();

        let err = experiment.run_into(&mut sink).unwrap_err();

        assert!(matches!(err, AcoError::DegenerateFitness { .. }));
        assert!(sink.results.is_empty());
    }

    #[test]
    fn test_csv_sink_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        let instance = create_test_instance();
        let config = ExperimentConfig {
            num_replicates: 2,
            ..small_config(10, 30)
        };
        let experiment = Experiment::new(&instance, config).unwrap();
        let mut sink = CsvSeriesSink::new(&path);

        experiment.run_into(&mut sink).unwrap();
        experiment.run_into(&mut sink).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].iter().collect::<Vec<_>>(), vec!["0", "1", "2"]);
        assert_eq!(rows[3].iter().collect::<Vec<_>>(), rows[0].iter().collect::<Vec<_>>());
        for row in [&rows[1], &rows[2], &rows[4], &rows[5]] {
            assert_eq!(row.len(), 3);
            assert!(row.iter().all(|v| v.parse::<f64>().unwrap() > 0.0));
        }
    }

    #[test]
    fn test_config_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"aco": {"num_ants": 20, "evaporation_rate": 0.9}}"#).unwrap();

        let config = ExperimentConfig::from_json_file(&path).unwrap();
        assert_eq!(config.aco.num_ants, 20);
        assert_eq!(config.aco.evaporation_rate, 0.9);
        assert_eq!(config.aco.evaluation_budget, 10_000);
        assert_eq!(config.num_replicates, 5);
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        for json in [
            r#"{"colony": {"num_ants": 20}}"#,
            r#"{"aco": {"num_antz": 20}}"#,
            r#"{"aco": {"num_ants": 20}, "replicates": 3}"#,
        ] {
            std::fs::write(&path, json).unwrap();
            let err = ExperimentConfig::from_json_file(&path).unwrap_err();
            assert!(matches!(err, AcoError::Json(_)), "{}", json);
        }
    }

    #[test]
    fn test_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let instance = create_test_instance();
        let result = Experiment::new(&instance, small_config(5, 10)).unwrap().run().unwrap();

        result.save_json(&path).unwrap();
        let loaded: ExperimentResult =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(loaded.best_fitness, result.best_fitness);
        assert_eq!(loaded.best_paths, result.best_paths);
    }
}
