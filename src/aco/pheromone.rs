//! Pheromone matrix and per-generation deposit accumulation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AcoError, AcoResult};
use crate::solution::Permutation;

/// Pheromone levels on every directed edge `from -> to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PheromoneField {
    values: Vec<Vec<f64>>,
}

impl PheromoneField {
    /// Fill an `n x n` field with independent uniform values in `[0, 1)`.
    pub fn initialize<R: Rng + ?Sized>(n: usize, rng: &mut R) -> AcoResult<Self> {
        if n == 0 {
            return Err(AcoError::shape("pheromone field needs at least one node"));
        }

        let values = (0..n)
            .map(|_| (0..n).map(|_| rng.gen::<f64>()).collect())
            .collect();

        Ok(PheromoneField { values })
    }

    /// Use an explicit matrix as the field.
    pub fn from_matrix(values: Vec<Vec<f64>>) -> AcoResult<Self> {
        let n = values.len();
        if n == 0 {
            return Err(AcoError::shape("pheromone field needs at least one node"));
        }

        for (i, row) in values.iter().enumerate() {
            if row.len() != n {
                return Err(AcoError::shape(format!(
                    "pheromone row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(v) = row.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(AcoError::shape(format!(
                    "pheromone row {} holds invalid level {}",
                    i, v
                )));
            }
        }

        Ok(PheromoneField { values })
    }

    /// A field with the same level on every edge.
    pub fn uniform(n: usize, level: f64) -> AcoResult<Self> {
        Self::from_matrix(vec![vec![level; n]; n])
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from][to]
    }

    /// Levels on every edge leaving `from`
    #[inline]
    pub fn row(&self, from: usize) -> &[f64] {
        &self.values[from]
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Sum of all levels
    pub fn total(&self) -> f64 {
        self.values.iter().flatten().sum()
    }

    /// Deposit matrix for one ant: `1 / fitness` on each consecutive edge of `path`.
    ///
    /// Edges used more than once accumulate.
    pub fn deposit_for(&self, path: &[usize], fitness: f64) -> AcoResult<PheromoneDelta> {
        let mut delta = PheromoneDelta::zeros(self.dimension());
        delta.deposit(path, fitness)?;
        Ok(delta)
    }

    /// `values = (values + delta) * evaporation_rate`, element-wise.
    pub fn apply_and_evaporate(
        &mut self,
        delta: &PheromoneDelta,
        evaporation_rate: f64,
    ) -> AcoResult<()> {
        check_evaporation_rate(evaporation_rate)?;
        if delta.dimension() != self.dimension() {
            return Err(AcoError::shape(format!(
                "deposit matrix is {}x{}, pheromone field is {}x{}",
                delta.dimension(),
                delta.dimension(),
                self.dimension(),
                self.dimension()
            )));
        }

        for (row, delta_row) in self.values.iter_mut().zip(&delta.values) {
            for (level, added) in row.iter_mut().zip(delta_row) {
                *level = (*level + added) * evaporation_rate;
            }
        }

        Ok(())
    }
}

/// Accumulated pheromone deposits for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct PheromoneDelta {
    values: Vec<Vec<f64>>,
}

impl PheromoneDelta {
    pub fn zeros(n: usize) -> Self {
        PheromoneDelta {
            values: vec![vec![0.0; n]; n],
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from][to]
    }

    pub fn total(&self) -> f64 {
        self.values.iter().flatten().sum()
    }

    /// Add `1 / fitness` to every consecutive edge of `path`.
    pub fn deposit(&mut self, path: &[usize], fitness: f64) -> AcoResult<()> {
        let amount = deposit_amount(path, fitness)?;

        let n = self.dimension();
        if let Some(&bad) = path.iter().find(|&&node| node >= n) {
            return Err(AcoError::shape(format!(
                "path node {} out of range for a {}x{} deposit matrix",
                bad, n, n
            )));
        }

        for edge in path.windows(2) {
            self.values[edge[0]][edge[1]] += amount;
        }

        Ok(())
    }

    /// Same as [`deposit`](Self::deposit) for a constructed ant path.
    pub fn deposit_path(&mut self, path: &Permutation, fitness: f64) -> AcoResult<()> {
        let amount = deposit_amount(path.as_slice(), fitness)?;

        let n = self.dimension();
        if path.len() != n {
            return Err(AcoError::shape(format!(
                "path of {} nodes does not fit a {}x{} deposit matrix",
                path.len(),
                n,
                n
            )));
        }

        for (from, to) in path.edges() {
            self.values[from][to] += amount;
        }

        Ok(())
    }

    /// Element-wise sum with another delta of the same dimension.
    pub fn merge(&mut self, other: &PheromoneDelta) -> AcoResult<()> {
        if other.dimension() != self.dimension() {
            return Err(AcoError::shape(format!(
                "cannot merge a {0}x{0} deposit matrix into a {1}x{1} one",
                other.dimension(),
                self.dimension()
            )));
        }

        for (row, other_row) in self.values.iter_mut().zip(&other.values) {
            for (value, added) in row.iter_mut().zip(other_row) {
                *value += added;
            }
        }

        Ok(())
    }
}

/// `1 / fitness`, or `DegenerateFitness` when that is not a finite positive amount.
fn deposit_amount(path: &[usize], fitness: f64) -> AcoResult<f64> {
    let amount = 1.0 / fitness;
    if fitness > 0.0 && fitness.is_finite() && amount.is_finite() {
        Ok(amount)
    } else {
        Err(AcoError::DegenerateFitness {
            fitness,
            path: path.to_vec(),
        })
    }
}

pub(crate) fn check_evaporation_rate(rate: f64) -> AcoResult<()> {
    if rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(AcoError::parameter(format!(
            "evaporation rate must be in (0, 1], got {}",
            rate
        )))
    }
}
