//! Similarity scorer
//!
//! Produces one raw score per unit from its attribute ranks.
//!
//! # Regimes
//!
//! - **Cold start** (no sold unit in the list): weighted sum of inverted ranks,
//!   `(max_rank - rank + 1) / max_rank`, so priority-1 values score highest
//! - **Comparables** (at least one sold unit): per attribute, a Gaussian kernel
//!   `exp(-(Δrank/max_rank)² / (2σ²))` is summed over sold units whose kernel
//!   exceeds the similarity threshold; per-attribute sums are normalized by
//!   their maximum and weighted
//!
//! Scores are pure functions of the inputs. Batch scoring runs per unit in
//! parallel and returns results in the original unit order.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use crate::catalogue::{AttributeCatalogue, RankMatrix};
use crate::importance::ImportanceConfig;
use crate::numeric::positive_or_sentinel_quiet;
use crate::params::StaticParams;
use crate::priority::{rank, PriorityTable};
use crate::units::Unit;

/// Gaussian kernel settings taken from the static parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityKernel {
    pub sigma: f64,
    pub threshold: f64,
}

impl SimilarityKernel {
    pub fn from_params(params: &StaticParams) -> Self {
        Self {
            sigma: positive_or_sentinel_quiet(params.sigma),
            threshold: if params.similarity_threshold.is_finite() {
                params.similarity_threshold
            } else {
                0.0
            },
        }
    }

    /// Kernel value for a rank distance on a table of `max_rank` groups
    pub fn similarity(&self, target_rank: u32, other_rank: u32, max_rank: u32) -> f64 {
        let delta = (target_rank as f64 - other_rank as f64) / max_rank.max(1) as f64;
        (-(delta * delta) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

/// Score one unit against the whole list
///
/// Returns 0 for an empty unit list or an empty importance selection.
pub fn score(
    target: &Unit,
    all_units: &[Unit],
    importance: &ImportanceConfig,
    tables: &BTreeMap<String, PriorityTable>,
    params: &StaticParams,
) -> f64 {
    if all_units.is_empty() || importance.is_empty() {
        return 0.0;
    }

    let catalogue = AttributeCatalogue::resolve(all_units, importance, tables);
    let matrix = catalogue.rank_matrix(all_units);
    let target_ranks: Vec<u32> = catalogue
        .entries()
        .iter()
        .map(|entry| rank(target, &entry.field, &entry.table))
        .collect();

    let sold_rows = sold_rows(all_units, &matrix);
    score_ranks(
        &target_ranks,
        &sold_rows,
        &matrix,
        &SimilarityKernel::from_params(params),
    )
}

/// Score every unit of `units` (sold ones included), preserving order
pub fn score_all(units: &[Unit], catalogue: &AttributeCatalogue, params: &StaticParams) -> Vec<f64> {
    if units.is_empty() || catalogue.is_empty() {
        return vec![0.0; units.len()];
    }

    let matrix = catalogue.rank_matrix(units);
    let sold = sold_rows(units, &matrix);
    let kernel = SimilarityKernel::from_params(params);

    debug!(
        units = units.len(),
        attributes = catalogue.len(),
        comparables = sold.len(),
        "Scoring units"
    );

    (0..units.len())
        .into_par_iter()
        .map(|i| {
            matrix
                .row(i)
                .map(|ranks| score_ranks(ranks, &sold, &matrix, &kernel))
                .unwrap_or(0.0)
        })
        .collect()
}

fn sold_rows<'a>(units: &[Unit], matrix: &'a RankMatrix) -> Vec<&'a [u32]> {
    units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_sold())
        .filter_map(|(i, _)| matrix.row(i))
        .collect()
}

/// Core score over pre-resolved ranks
fn score_ranks(target: &[u32], sold: &[&[u32]], matrix: &RankMatrix, kernel: &SimilarityKernel) -> f64 {
    let max_ranks = matrix.max_ranks();
    let weights = renormalized(matrix.weights());
    if target.is_empty() || weights.is_empty() {
        return 0.0;
    }

    if sold.is_empty() {
        return inverted_rank_score(target, max_ranks, &weights);
    }

    let similarities: Vec<f64> = target
        .iter()
        .enumerate()
        .map(|(attr, &target_rank)| {
            let max_rank = max_ranks.get(attr).copied().unwrap_or(1);
            sold.iter()
                .filter_map(|row| row.get(attr))
                .map(|&other| kernel.similarity(target_rank, other, max_rank))
                .filter(|&s| s > kernel.threshold)
                .sum()
        })
        .collect();

    let max_similarity = similarities.iter().copied().fold(0.0_f64, f64::max);
    if max_similarity <= 0.0 {
        return 0.0;
    }

    similarities
        .iter()
        .zip(&weights)
        .map(|(s, w)| w * s / max_similarity)
        .sum()
}

fn inverted_rank_score(target: &[u32], max_ranks: &[u32], weights: &[f64]) -> f64 {
    target
        .iter()
        .zip(max_ranks)
        .zip(weights)
        .map(|((&r, &max_rank), w)| {
            let max_rank = max_rank.max(1);
            // Ranks beyond the table (should not happen) clamp to worst
            let r = r.clamp(1, max_rank);
            let inverse = (max_rank - r + 1) as f64;
            w * inverse / max_rank as f64
        })
        .sum()
}

fn renormalized(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    if total > 0.0 {
        weights
            .iter()
            .map(|w| if w.is_finite() && *w > 0.0 { w / total } else { 0.0 })
            .collect()
    } else if weights.is_empty() {
        Vec::new()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    }
}
