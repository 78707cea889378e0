//! Normalization and mixing pipeline
//!
//! Runs over units sorted ascending by raw score (stable, so ties keep their
//! original order):
//!
//! 1. `rank_norm[i] = (i+1)/N` (`[0]` when N = 1)
//! 2. `score_norm[i] = score[i] / max(score)` (all 0 when every score is 0)
//! 3. `preset_value[i] = preset_value_at(rank_norm[i], curve)`
//! 4. `sp_mixed[i] = score_norm[i] · (1 + preset_value[i])`
//! 5. `sp_mixed_rt[0] = 0`, `sp_mixed_rt[i] = sp_mixed_rt[i-1] + sp_mixed[i]`
//! 6. `sp_mixed_rt_norm[i] = sp_mixed_rt[i] / max(sp_mixed_rt)`
//!
//! Step 5 leaves the first unit's own mixed value out of every running total.
//! Committed prices depend on this, so it is kept.

use serde::{Deserialize, Serialize};

use crate::distribution::preset_value_at;
use crate::numeric::{max_finite, ratio_or_zero};

/// Every intermediate column of the mixing pipeline, in sorted order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MixedScores {
    /// Index into the caller's original (unsorted) score slice
    pub order: Vec<usize>,
    pub score: Vec<f64>,
    pub rank_norm: Vec<f64>,
    pub score_norm: Vec<f64>,
    pub preset_value: Vec<f64>,
    pub sp_mixed: Vec<f64>,
    pub sp_mixed_rt: Vec<f64>,
    pub sp_mixed_rt_norm: Vec<f64>,
}

impl MixedScores {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Indices of `scores` in ascending score order, ties by original position
pub fn sort_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    order
}

/// `(i+1)/n` for `i in 0..n`; a single unit gets `[0]`
pub fn calculate_normalized_ranks(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n).map(|i| (i + 1) as f64 / n as f64).collect(),
    }
}

/// Scores divided by their maximum (all 0 when the maximum is not positive)
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    let max = max_finite(scores).unwrap_or(0.0);
    if max <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| ratio_or_zero(*s, max)).collect()
}

/// Running total that excludes the first element's own value
pub fn running_totals(values: &[f64]) -> Vec<f64> {
    let mut totals = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let next = if i == 0 { 0.0 } else { totals[i - 1] + values[i] };
        totals.push(next);
    }
    totals
}

/// Run the full pipeline over unsorted raw scores
///
/// `curve` should have one sample per score (see
/// [`crate::distribution::curve`]).
pub fn mix(scores: &[f64], curve: &[f64]) -> MixedScores {
    let order = sort_order(scores);
    let sorted: Vec<f64> = order.iter().map(|&i| scores[i]).collect();

    let rank_norm = calculate_normalized_ranks(sorted.len());
    let score_norm = normalize_scores(&sorted);
    let preset_value: Vec<f64> = rank_norm.iter().map(|r| preset_value_at(*r, curve)).collect();
    let sp_mixed: Vec<f64> = score_norm
        .iter()
        .zip(&preset_value)
        .map(|(s, p)| s + s * p)
        .collect();
    let sp_mixed_rt = running_totals(&sp_mixed);
    let sp_mixed_rt_norm = normalize_scores(&sp_mixed_rt);

    MixedScores {
        order,
        score: sorted,
        rank_norm,
        score_norm,
        preset_value,
        sp_mixed,
        sp_mixed_rt,
        sp_mixed_rt_norm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Distribution;

    #[test]
    fn test_normalized_ranks_degenerate_cases() {
        assert_eq!(calculate_normalized_ranks(0), Vec::<f64>::new());
        assert_eq!(calculate_normalized_ranks(1), vec![0.0]);
        assert_eq!(calculate_normalized_ranks(4), vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        assert_eq!(sort_order(&[0.5, 0.2, 0.5, 0.2]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_all_zero_scores_normalize_to_zero() {
        assert_eq!(normalize_scores(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_running_total_skips_first_value() {
        assert_eq!(running_totals(&[5.0, 1.0, 2.0]), vec![0.0, 1.0, 3.0]);
        assert_eq!(running_totals(&[]), Vec::<f64>::new());
    }

    #[test]
    fn test_mix_three_units_uniform() {
        let scores = [2.0 / 3.0, 1.0, 1.0 / 3.0];
        let curve = Distribution::Uniform.curve(3);
        let mixed = mix(&scores, &curve);

        assert_eq!(mixed.order, vec![2, 0, 1]);
        assert!((mixed.score_norm[0] - 1.0 / 3.0).abs() < 1e-12);
        // preset values [1/3, 1/3, 2/3]
        assert!((mixed.preset_value[1] - 1.0 / 3.0).abs() < 1e-12);
        assert!((mixed.preset_value[2] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(mixed.sp_mixed_rt[0], 0.0);
        assert!((mixed.sp_mixed_rt_norm[2] - 1.0).abs() < 1e-12);
        for pair in mixed.sp_mixed_rt_norm.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_mix_single_unit() {
        let mixed = mix(&[0.7], &Distribution::Uniform.curve(1));
        assert_eq!(mixed.rank_norm, vec![0.0]);
        assert_eq!(mixed.sp_mixed_rt_norm, vec![0.0]);
    }

    #[test]
    fn test_mix_is_deterministic() {
        let scores = [0.4, 0.1, 0.4, 0.9, 0.0];
        let curve = Distribution::Gaussian {
            mean: 0.5,
            std_dev: 0.2,
        }
        .curve(scores.len());
        assert_eq!(mix(&scores, &curve), mix(&scores, &curve));
    }
}
