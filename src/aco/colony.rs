//! Ant Colony Optimization for the QAP.
//!
//! Every generation, `num_ants` ants build a permutation from a shared start
//! node, each ant deposits `1 / fitness` on the edges it used, and the summed
//! deposits are applied to the pheromone field before it is evaporated. A run
//! lasts `ceil(evaluation_budget / num_ants)` generations.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::path::build_path;
use super::pheromone::{check_evaporation_rate, PheromoneDelta, PheromoneField};
use crate::error::{AcoError, AcoResult};
use crate::instance::QAPInstance;
use crate::solution::Permutation;

/// ACO configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ACOConfig {
    /// Number of ants per generation (m)
    pub num_ants: usize,
    /// Multiplicative factor applied to every level after each generation (e)
    pub evaporation_rate: f64,
    /// Total fitness evaluations for a run
    pub evaluation_budget: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for ACOConfig {
    fn default() -> Self {
        ACOConfig {
            num_ants: 100,
            evaporation_rate: 0.5,
            evaluation_budget: 10_000,
            seed: 42,
        }
    }
}

impl ACOConfig {
    /// Reject parameters no run can be started with.
    pub fn validate(&self) -> AcoResult<()> {
        if self.num_ants == 0 {
            return Err(AcoError::parameter("number of ants must be positive"));
        }
        check_evaporation_rate(self.evaporation_rate)?;
        if self.evaluation_budget < self.num_ants {
            return Err(AcoError::parameter(format!(
                "evaluation budget {} is smaller than the colony size {}",
                self.evaluation_budget, self.num_ants
            )));
        }
        Ok(())
    }

    /// Number of generations in a run
    pub fn iterations(&self) -> usize {
        self.evaluation_budget.div_ceil(self.num_ants)
    }
}

/// Outcome of one generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Mean fitness over the generation's ants
    pub mean_fitness: f64,
    /// Best fitness seen so far in the run
    pub best_fitness: f64,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Mean fitness per generation, in generation order
    pub mean_fitness: Vec<f64>,
    pub best_fitness: f64,
    pub best_path: Permutation,
    pub start: usize,
    pub records: Vec<IterationRecord>,
    /// Wall-clock time in seconds
    pub computation_time: f64,
}

impl RunResult {
    pub fn iterations(&self) -> usize {
        self.mean_fitness.len()
    }
}

/// Ant Colony Optimization solver for one run
pub struct AntColonyOptimization<'a> {
    config: ACOConfig,
    instance: &'a QAPInstance,
    pheromone: PheromoneField,
    start: usize,
    best_path: Option<Permutation>,
    best_fitness: f64,
    records: Vec<IterationRecord>,
    rng: ChaCha8Rng,
}

impl<'a> AntColonyOptimization<'a> {
    /// Set up a run: random pheromone levels and a random shared start node.
    pub fn new(instance: &'a QAPInstance, config: ACOConfig) -> AcoResult<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let n = instance.dimension;
        let pheromone = PheromoneField::initialize(n, &mut rng)?;
        let start = rng.gen_range(0..n);

        Ok(Self::with_state(instance, config, pheromone, start, rng))
    }

    /// Set up a run from a given pheromone field and start node.
    pub fn with_pheromones(
        instance: &'a QAPInstance,
        config: ACOConfig,
        pheromone: PheromoneField,
        start: usize,
    ) -> AcoResult<Self> {
        config.validate()?;
        if pheromone.dimension() != instance.dimension {
            return Err(AcoError::shape(format!(
                "pheromone field is {0}x{0} but the instance has {1} facilities",
                pheromone.dimension(),
                instance.dimension
            )));
        }
        if start >= instance.dimension {
            return Err(AcoError::shape(format!(
                "start node {} out of range for {} facilities",
                start, instance.dimension
            )));
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self::with_state(instance, config, pheromone, start, rng))
    }

    fn with_state(
        instance: &'a QAPInstance,
        config: ACOConfig,
        pheromone: PheromoneField,
        start: usize,
        rng: ChaCha8Rng,
    ) -> Self {
        let iterations = config.iterations();
        AntColonyOptimization {
            config,
            instance,
            pheromone,
            start,
            best_path: None,
            best_fitness: f64::INFINITY,
            records: Vec::with_capacity(iterations),
            rng,
        }
    }

    /// Run one generation and apply its pheromone update.
    pub fn step(&mut self) -> AcoResult<IterationRecord> {
        let n = self.instance.dimension;
        let mut update = PheromoneDelta::zeros(n);
        let mut total_fitness = 0.0;

        for _ in 0..self.config.num_ants {
            let path = build_path(n, self.start, &self.pheromone, &mut self.rng)?;
            let fitness = self.instance.evaluate(&path)?;

            update.deposit_path(&path, fitness)?;
            total_fitness += fitness;

            if fitness < self.best_fitness {
                self.best_fitness = fitness;
                self.best_path = Some(path);
            }
        }

        self.pheromone
            .apply_and_evaporate(&update, self.config.evaporation_rate)?;

        let record = IterationRecord {
            iteration: self.records.len(),
            mean_fitness: total_fitness / self.config.num_ants as f64,
            best_fitness: self.best_fitness,
        };
        log::debug!(
            "Iteration {}: mean fitness {:.2}, best {:.2}",
            record.iteration,
            record.mean_fitness,
            record.best_fitness
        );
        self.records.push(record);

        Ok(record)
    }

    /// Run every generation of the budget.
    pub fn run(mut self) -> AcoResult<RunResult> {
        let started = std::time::Instant::now();
        let iterations = self.config.iterations();
        log::info!(
            "Starting ACO run on {} (n={}): {} ants, e={}, {} iterations, start node {}",
            self.instance.name,
            self.instance.dimension,
            self.config.num_ants,
            self.config.evaporation_rate,
            iterations,
            self.start
        );

        while self.records.len() < iterations {
            self.step()?;
        }

        let best_path = self
            .best_path
            .ok_or_else(|| AcoError::parameter("run finished without evaluating any ant"))?;
        let computation_time = started.elapsed().as_secs_f64();
        log::info!(
            "ACO run finished: best fitness {} in {:.3}s",
            self.best_fitness,
            computation_time
        );

        Ok(RunResult {
            mean_fitness: self.records.iter().map(|r| r.mean_fitness).collect(),
            best_fitness: self.best_fitness,
            best_path,
            start: self.start,
            records: self.records,
            computation_time,
        })
    }

    pub fn pheromones(&self) -> &PheromoneField {
        &self.pheromone
    }

    pub fn best_path(&self) -> Option<&Permutation> {
        self.best_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::tests::line_instance;

    fn create_test_instance() -> QAPInstance {
        let text = "5\n\
            0 1 2 3 4\n1 0 1 2 3\n2 1 0 1 2\n3 2 1 0 1\n4 3 2 1 0\n\
            0 5 2 4 1\n5 0 3 0 2\n2 3 0 0 0\n4 0 0 0 5\n1 2 0 5 0\n";
        QAPInstance::parse("test", text).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ACOConfig::default();
        assert_eq!(config.num_ants, 100);
        assert_eq!(config.evaporation_rate, 0.5);
        assert_eq!(config.iterations(), 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_iterations_round_up() {
        let config = ACOConfig {
            num_ants: 30,
            ..Default::default()
        };
        assert_eq!(config.iterations(), 334);
    }

    #[test]
    fn test_invalid_parameters() {
        let bad = [
            ACOConfig { num_ants: 0, ..Default::default() },
            ACOConfig { evaporation_rate: 0.0, ..Default::default() },
            ACOConfig { evaporation_rate: 1.01, ..Default::default() },
            ACOConfig { evaluation_budget: 10, num_ants: 20, ..Default::default() },
        ];
        for config in bad {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, AcoError::Parameter(_)), "{:?}", config);
        }
    }

    #[test]
    fn test_rate_of_one_is_accepted() {
        let config = ACOConfig { evaporation_rate: 1.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_aco() {
        let instance = create_test_instance();
        let config = ACOConfig {
            num_ants: 5,
            evaluation_budget: 50,
            ..Default::default()
        };

        let result = AntColonyOptimization::new(&instance, config).unwrap().run().unwrap();

        assert_eq!(result.iterations(), 10);
        assert_eq!(result.records.len(), 10);
        assert_eq!(result.best_path.start(), result.start);
        assert_eq!(instance.evaluate(&result.best_path).unwrap(), result.best_fitness);
        assert!(result.mean_fitness.iter().all(|&m| m >= result.best_fitness));
    }

    #[test]
    fn test_best_fitness_non_increasing() {
        let instance = create_test_instance();
        for seed in 0..5 {
            let config = ACOConfig {
                num_ants: 4,
                evaluation_budget: 120,
                evaporation_rate: 0.7,
                seed,
            };
            let result = AntColonyOptimization::new(&instance, config).unwrap().run().unwrap();

            for pair in result.records.windows(2) {
                assert!(pair[1].best_fitness <= pair[0].best_fitness);
            }
            assert_eq!(result.records.last().unwrap().best_fitness, result.best_fitness);
        }
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let instance = create_test_instance();
        let config = ACOConfig {
            num_ants: 6,
            evaluation_budget: 60,
            seed: 123,
            ..Default::default()
        };

        let a = AntColonyOptimization::new(&instance, config.clone()).unwrap().run().unwrap();
        let b = AntColonyOptimization::new(&instance, config).unwrap().run().unwrap();

        assert_eq!(a.mean_fitness, b.mean_fitness);
        assert_eq!(a.best_path, b.best_path);
        assert_eq!(a.start, b.start);
    }

    #[test]
    fn test_step_updates_pheromones() {
        let instance = line_instance(4);
        let config = ACOConfig {
            num_ants: 1,
            evaluation_budget: 1,
            evaporation_rate: 1.0,
            seed: 0,
        };
        let field = PheromoneField::uniform(4, 0.25).unwrap();
        let mut colony =
            AntColonyOptimization::with_pheromones(&instance, config, field, 0).unwrap();

        let record = colony.step().unwrap();

        // Every permutation of this instance costs 20, three edges get 1/20 each.
        assert_eq!(record.mean_fitness, 20.0);
        assert_eq!(record.best_fitness, 20.0);
        let expected_total = 16.0 * 0.25 + 3.0 / 20.0;
        assert!((colony.pheromones().total() - expected_total).abs() < 1e-12);
        assert_eq!(colony.best_path().map(|p| p.start()), Some(0));
    }

    #[test]
    fn test_zero_fitness_aborts_run() {
        let zeros = vec![vec![0.0; 3]; 3];
        let instance = QAPInstance::new("flat", zeros.clone(), zeros).unwrap();
        let config = ACOConfig {
            num_ants: 2,
            evaluation_budget: 4,
            ..Default::default()
        };

        let err = AntColonyOptimization::new(&instance, config).unwrap().run().unwrap_err();
        assert!(matches!(err, AcoError::DegenerateFitness { fitness, .. } if fitness == 0.0));
    }

    #[test]
    fn test_overflowing_deposit_aborts_run() {
        // Every path costs 6e-310, whose reciprocal is infinite.
        let mut tiny = vec![vec![1e-155; 3]; 3];
        for (i, row) in tiny.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        let instance = QAPInstance::new("tiny", tiny.clone(), tiny).unwrap();
        let config = ACOConfig {
            num_ants: 1,
            evaluation_budget: 2,
            evaporation_rate: 1.0,
            seed: 0,
        };

        let err = AntColonyOptimization::new(&instance, config).unwrap().run().unwrap_err();
        assert!(matches!(err, AcoError::DegenerateFitness { fitness, .. } if fitness > 0.0));
    }

    #[test]
    fn test_with_pheromones_validates() {
        let instance = line_instance(4);
        let config = ACOConfig::default();

        let wrong_size = PheromoneField::uniform(3, 1.0).unwrap();
        assert!(AntColonyOptimization::with_pheromones(&instance, config.clone(), wrong_size, 0).is_err());

        let field = PheromoneField::uniform(4, 1.0).unwrap();
        assert!(AntColonyOptimization::with_pheromones(&instance, config, field, 4).is_err());
    }

    #[test]
    fn test_single_facility() {
        let instance = QAPInstance::new("one", vec![vec![2.0]], vec![vec![3.0]]).unwrap();
        let config = ACOConfig {
            num_ants: 2,
            evaluation_budget: 4,
            ..Default::default()
        };

        let result = AntColonyOptimization::new(&instance, config).unwrap().run().unwrap();
        assert_eq!(result.best_fitness, 6.0);
        assert_eq!(result.mean_fitness, vec![6.0, 6.0]);
    }
}
