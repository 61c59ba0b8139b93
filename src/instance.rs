//! Module for parsing and representing QAP instances.
//!
//! An instance is a number of facilities `n`, an `n x n` distance matrix
//! between locations and an `n x n` flow matrix between facilities. Data
//! files use a fixed whitespace format: `n`, then the distance matrix
//! row-major, then the flow matrix row-major.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{AcoError, AcoResult};
use crate::solution::Permutation;

/// Represents a complete QAP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QAPInstance {
    /// Name of the instance
    pub name: String,
    /// Number of facilities (and locations)
    pub dimension: usize,
    /// Distances between locations, indexed by path position
    pub distance_matrix: Vec<Vec<f64>>,
    /// Flows between facilities, indexed by facility identity
    pub flow_matrix: Vec<Vec<f64>>,
}

impl QAPInstance {
    /// Build an instance from its two matrices.
    ///
    /// Both matrices must be `n x n` with `n >= 1`, and every entry must be
    /// finite and non-negative.
    pub fn new(
        name: impl Into<String>,
        distance_matrix: Vec<Vec<f64>>,
        flow_matrix: Vec<Vec<f64>>,
    ) -> AcoResult<Self> {
        let dimension = distance_matrix.len();
        if dimension == 0 {
            return Err(AcoError::shape("instance must have at least one facility"));
        }

        check_matrix("distance", &distance_matrix, dimension)?;
        check_matrix("flow", &flow_matrix, dimension)?;

        Ok(QAPInstance {
            name: name.into(),
            dimension,
            distance_matrix,
            flow_matrix,
        })
    }

    /// Parse an instance from the fixed `n`, distances, flows token stream.
    pub fn parse(name: impl Into<String>, text: &str) -> AcoResult<Self> {
        let mut tokens = text.split_whitespace().enumerate();

        let (position, first) = tokens.next().ok_or_else(|| AcoError::Parse {
            position: 0,
            message: "empty input, expected the number of facilities".to_string(),
        })?;
        let dimension: usize = first.parse().map_err(|_| AcoError::Parse {
            position,
            message: format!("invalid dimension '{}'", first),
        })?;
        if dimension == 0 {
            return Err(AcoError::shape("instance must have at least one facility"));
        }

        let too_large = || AcoError::Parse {
            position,
            message: format!("dimension {} is too large", dimension),
        };
        let cells = dimension.checked_mul(dimension).ok_or_else(too_large)?;
        let expected = cells.checked_mul(2).ok_or_else(too_large)?;

        // Matrices are only allocated once the input holds every value.
        let found = text.split_whitespace().count() - 1;
        if found < expected {
            return Err(AcoError::Parse {
                position: 1 + found,
                message: format!(
                    "unexpected end of input: {} facilities need {} matrix values, found {}",
                    dimension, expected, found
                ),
            });
        }

        let distance_matrix = read_matrix(&mut tokens, dimension, 1, "distance")?;
        let flow_matrix = read_matrix(&mut tokens, dimension, 1 + cells, "flow")?;

        if let Some((position, token)) = tokens.next() {
            return Err(AcoError::Parse {
                position,
                message: format!("unexpected trailing token '{}'", token),
            });
        }

        Self::new(name, distance_matrix, flow_matrix)
    }

    /// Load an instance from a data file, named after the file stem.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AcoResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());

        let instance = Self::parse(name, &text)?;
        log::info!(
            "Loaded instance {} (n={}) from {:?}",
            instance.name,
            instance.dimension,
            path
        );
        Ok(instance)
    }

    /// Get the distance between two locations
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Get the flow between two facilities
    #[inline]
    pub fn flow(&self, a: usize, b: usize) -> f64 {
        self.flow_matrix[a][b]
    }

    /// Cost of a permutation under this instance's matrices.
    pub fn evaluate(&self, path: &Permutation) -> AcoResult<f64> {
        evaluate(path.as_slice(), &self.distance_matrix, &self.flow_matrix)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension;
        let mut distances = Vec::with_capacity(n * n.saturating_sub(1));
        let mut flows = Vec::with_capacity(n * n.saturating_sub(1));

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    distances.push(self.distance(i, j));
                    flows.push(self.flow(i, j));
                }
            }
        }

        let mean = |values: &[f64]| if values.is_empty() { 0.0 } else { values.iter().mean() };
        let non_zero_flows = flows.iter().filter(|&&f| f > 0.0).count();

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            avg_distance: mean(&distances),
            max_distance: distances.iter().cloned().fold(0.0, f64::max),
            avg_flow: mean(&flows),
            max_flow: flows.iter().cloned().fold(0.0, f64::max),
            flow_density: if flows.is_empty() {
                0.0
            } else {
                non_zero_flows as f64 / flows.len() as f64
            },
        }
    }
}

/// Compute the QAP objective of `path`.
///
/// `cost = sum over (i, j) of distance[i][j] * flow[path[i]][path[j]]`, where
/// the distance matrix is indexed by path position and the flow matrix by the
/// facility stored at that position.
pub fn evaluate(path: &[usize], distance: &[Vec<f64>], flow: &[Vec<f64>]) -> AcoResult<f64> {
    let n = path.len();
    if distance.len() != n || distance.iter().any(|row| row.len() != n) {
        return Err(AcoError::shape(format!(
            "distance matrix is not {}x{} for a path of length {}",
            n, n, n
        )));
    }
    if flow.len() != n || flow.iter().any(|row| row.len() != n) {
        return Err(AcoError::shape(format!(
            "flow matrix is not {}x{} for a path of length {}",
            n, n, n
        )));
    }
    if let Some(&bad) = path.iter().find(|&&node| node >= n) {
        return Err(AcoError::shape(format!(
            "path entry {} out of range for dimension {}",
            bad, n
        )));
    }

    let mut cost = 0.0;
    for (i, row) in distance.iter().enumerate() {
        let flow_row = &flow[path[i]];
        for (j, &d) in row.iter().enumerate() {
            cost += d * flow_row[path[j]];
        }
    }

    Ok(cost)
}

fn check_matrix(label: &str, matrix: &[Vec<f64>], dimension: usize) -> AcoResult<()> {
    if matrix.len() != dimension {
        return Err(AcoError::shape(format!(
            "{} matrix has {} rows, expected {}",
            label,
            matrix.len(),
            dimension
        )));
    }

    for (i, row) in matrix.iter().enumerate() {
        if row.len() != dimension {
            return Err(AcoError::shape(format!(
                "{} matrix row {} has {} columns, expected {}",
                label,
                i,
                row.len(),
                dimension
            )));
        }
        if let Some((j, value)) = row
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(AcoError::shape(format!(
                "{} matrix entry [{}][{}] = {} is not a non-negative number",
                label, i, j, value
            )));
        }
    }

    Ok(())
}

/// Read `dimension x dimension` values; `offset` is the position of the first one.
fn read_matrix<'a, I>(
    tokens: &mut I,
    dimension: usize,
    offset: usize,
    label: &str,
) -> AcoResult<Vec<Vec<f64>>>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut matrix = Vec::with_capacity(dimension);

    for i in 0..dimension {
        let mut row = Vec::with_capacity(dimension);
        for j in 0..dimension {
            let (position, token) = tokens.next().ok_or_else(|| AcoError::Parse {
                position: offset + i * dimension + j,
                message: format!("unexpected end of input in {} matrix at [{}][{}]", label, i, j),
            })?;
            let value: f64 = token.parse().map_err(|_| AcoError::Parse {
                position,
                message: format!("invalid {} value '{}'", label, token),
            })?;
            row.push(value);
        }
        matrix.push(row);
    }

    Ok(matrix)
}

/// Statistics about a QAP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub avg_distance: f64,
    pub max_distance: f64,
    pub avg_flow: f64,
    pub max_flow: f64,
    /// Share of off-diagonal flows that are non-zero
    pub flow_density: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Facilities: {}", self.dimension)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)?;
        writeln!(f, "  Avg flow: {:.2}", self.avg_flow)?;
        writeln!(f, "  Max flow: {:.2}", self.max_flow)?;
        writeln!(f, "  Flow density: {:.1}%", self.flow_density * 100.0)
    }
}
