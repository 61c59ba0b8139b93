//! Path construction for a single ant.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use super::pheromone::PheromoneField;
use crate::error::{AcoError, AcoResult};
use crate::solution::Permutation;

/// Build one permutation of `[0, n)` starting at `start`.
///
/// Each step draws the next node among the unvisited ones with probability
/// proportional to `pheromones[last][candidate]`. When a single candidate is
/// left it is taken directly. When every remaining weight is zero the draw is
/// uniform over the remaining candidates.
pub fn build_path<R: Rng + ?Sized>(
    n: usize,
    start: usize,
    pheromones: &PheromoneField,
    rng: &mut R,
) -> AcoResult<Permutation> {
    if n == 0 {
        return Err(AcoError::shape("cannot build a path over zero nodes"));
    }
    if start >= n {
        return Err(AcoError::shape(format!(
            "start node {} out of range for {} nodes",
            start, n
        )));
    }
    if pheromones.dimension() != n {
        return Err(AcoError::shape(format!(
            "pheromone field is {0}x{0}, expected {1}x{1}",
            pheromones.dimension(),
            n
        )));
    }

    let mut path = Vec::with_capacity(n);
    path.push(start);

    // Still-available node ids, in ascending order
    let mut available: Vec<usize> = (0..n).filter(|&node| node != start).collect();
    let mut weights = Vec::with_capacity(n);

    let mut current = start;
    while !available.is_empty() {
        let slot = if available.len() == 1 {
            0
        } else {
            let row = pheromones.row(current);
            weights.clear();
            weights.extend(available.iter().map(|&node| row[node]));
            select_slot(&weights, rng)?
        };

        current = available.remove(slot);
        path.push(current);
    }

    Ok(Permutation::from_complete_path(path))
}

/// Index into `weights` drawn proportionally to weight, uniform if all are zero.
fn select_slot<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> AcoResult<usize> {
    // `WeightedIndex` panics when the weights sum past `f64::MAX`.
    let rescaled;
    let weights = if weights.iter().sum::<f64>().is_finite() {
        weights
    } else {
        rescaled = rescale(weights);
        &rescaled[..]
    };

    match WeightedIndex::new(weights) {
        Ok(dist) => Ok(dist.sample(rng)),
        Err(WeightedError::AllWeightsZero) => {
            let slots: Vec<usize> = (0..weights.len()).collect();
            slots
                .choose(rng)
                .copied()
                .ok_or_else(|| AcoError::shape("no candidate left to choose from"))
        }
        Err(e) => Err(AcoError::shape(format!(
            "pheromone weights {:?} cannot be sampled: {}",
            weights, e
        ))),
    }
}

/// Divide by the largest weight; infinite weights share the whole mass.
fn rescale(weights: &[f64]) -> Vec<f64> {
    let max = weights.iter().copied().fold(0.0, f64::max);
    if max.is_infinite() {
        weights
            .iter()
            .map(|&w| match w {
                w if w == f64::INFINITY => 1.0,
                w if w.is_nan() => w,
                _ => 0.0,
            })
            .collect()
    } else {
        weights.iter().map(|&w| w / max).collect()
    }
}
