//! Spread/scope calibration
//!
//! Turns normalized contribution shares (`sp_mixed_rt_norm`) into per-unit
//! conditional values, using the liquidity-refusal price bounds.
//!
//! # Spread-rate mode
//!
//! - `spread = max_liq / min_liq - 1`
//! - `scope = |first - median|` over the contribution shares
//! - `fit_spread_rate = scope / spread` (sentinel when undefined), reported
//! - `band = (max_liq - min_liq) / (max_liq + min_liq)`, always in `[0, 1)`
//! - `fit_cond_value[i] = 1 + band · (value[i] - median) / max_deviation`
//!
//! Conditional values stay inside `[1 - band, 1 + band]`, whose end ratio is
//! exactly `max_liq / min_liq`, so the widest deviation maps onto the bounds.
//!
//! # Median-split mode
//!
//! Values below the median shrink toward `min_price / current_price`, values
//! above stretch toward `max_price / current_price`:
//! - below: `1 - (median - v) / b_fit_transform`,
//!   `b_fit_transform = scope_b / (1 - min/current)`
//! - above: `1 + (v - median) / t_fit_transform`,
//!   `t_fit_transform = scope_t / (max/current - 1)`
//!
//! `scope_b` and `scope_t` are the largest deviations on each side.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::numeric::{median, positive_or_sentinel, SENTINEL};

/// Calibration variant used to produce conditional values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Single fit-spread-rate from the first unit's deviation
    #[default]
    SpreadRate,
    /// Per-side transforms anchored on the liquidity bounds
    MedianSplit,
}

impl CalibrationMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "spread_rate" | "spread" => Some(CalibrationMode::SpreadRate),
            "median_split" | "median" | "fit" => Some(CalibrationMode::MedianSplit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationMode::SpreadRate => "spread_rate",
            CalibrationMode::MedianSplit => "median_split",
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Liquidity-refusal rates guarded against zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityRates {
    pub min_rate: f64,
    pub max_rate: f64,
}

impl LiquidityRates {
    pub fn new(min_price: f64, max_price: f64) -> Self {
        Self {
            min_rate: positive_or_sentinel(min_price, "minimum_liq_refusal_price"),
            max_rate: positive_or_sentinel(max_price, "maximum_liq_refusal_price"),
        }
    }

    /// `max_rate / min_rate - 1`
    pub fn spread(&self) -> f64 {
        self.max_rate / self.min_rate - 1.0
    }

    /// Half-width of the conditional band around 1
    ///
    /// `(hi - lo) / (hi + lo)`, so `(1 + band) / (1 - band) = hi / lo`.
    /// Inverted bounds count as swapped; 0 when the band is undefined.
    pub fn band_half_width(&self) -> f64 {
        let (lo, hi) = if self.min_rate <= self.max_rate {
            (self.min_rate, self.max_rate)
        } else {
            (self.max_rate, self.min_rate)
        };
        let band = (hi - lo) / (hi + lo);
        if band.is_finite() && band > 0.0 {
            band
        } else {
            0.0
        }
    }
}

/// Median and absolute deviation of every value from it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    pub median: f64,
    pub deviations: Vec<f64>,
}

impl Scope {
    pub fn from_values(values: &[f64]) -> Self {
        let median = median(values).unwrap_or(0.0);
        Self {
            median,
            deviations: values.iter().map(|v| (v - median).abs()).collect(),
        }
    }

    /// Scalar scope: deviation of the first value, `None` when empty
    pub fn first(&self) -> Option<f64> {
        self.deviations.first().copied()
    }

    /// Largest finite deviation, 0 when empty
    pub fn max(&self) -> f64 {
        self.deviations
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0_f64, f64::max)
    }
}

/// `scope / spread`, the sentinel when spread is 0 or scope is undefined
pub fn fit_spread_rate(scope: Option<f64>, spread: f64) -> f64 {
    match scope {
        Some(scope) if spread != 0.0 && spread.is_finite() && scope.is_finite() => {
            let rate = scope / spread;
            if rate.is_finite() {
                rate
            } else {
                SENTINEL
            }
        }
        _ => SENTINEL,
    }
}

/// Spread-rate conditional values
///
/// The widest deviation from the median lands on `1 ± band`. A zero band or
/// no deviation at all gives 1 for every unit. Non-finite results are floored
/// to the sentinel.
pub fn cond_values_from_band(values: &[f64], scope: &Scope, band: f64) -> Vec<f64> {
    let max_deviation = scope.max();
    if band <= 0.0 || !band.is_finite() || max_deviation <= SENTINEL {
        return vec![1.0; values.len()];
    }

    values
        .iter()
        .map(|v| {
            let cond = 1.0 + band * (v - scope.median) / max_deviation;
            if cond > 0.0 && cond.is_finite() {
                cond
            } else {
                warn!(value = v, cond, "Conditional value not positive, flooring to sentinel");
                SENTINEL
            }
        })
        .collect()
}

/// Median-split conditional values
pub fn calculate_fit_cond_values(
    values: &[f64],
    min_price: f64,
    max_price: f64,
    current_price: f64,
) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let scope = Scope::from_values(values);
    let m = scope.median;
    let current = positive_or_sentinel(current_price, "current_price_per_sqm");
    let rates = LiquidityRates::new(min_price, max_price);

    let b_rate_net = 1.0 - rates.min_rate / current;
    let t_rate_net = rates.max_rate / current - 1.0;

    let scope_b = values
        .iter()
        .filter(|v| **v < m)
        .map(|v| m - v)
        .fold(0.0_f64, f64::max);
    let scope_t = values
        .iter()
        .filter(|v| **v > m)
        .map(|v| v - m)
        .fold(0.0_f64, f64::max);

    let b_fit_transform = if scope_b > 0.0 && b_rate_net > 0.0 {
        Some(scope_b / b_rate_net)
    } else {
        None
    };
    let t_fit_transform = if scope_t > 0.0 && t_rate_net > 0.0 {
        Some(scope_t / t_rate_net)
    } else {
        None
    };

    debug!(
        median = m,
        scope_b,
        scope_t,
        b_rate_net,
        t_rate_net,
        "Median-split calibration"
    );

    values
        .iter()
        .map(|&v| {
            if v < m {
                b_fit_transform.map_or(1.0, |t| 1.0 - (m - v) / t)
            } else if v > m {
                t_fit_transform.map_or(1.0, |t| 1.0 + (v - m) / t)
            } else {
                1.0
            }
        })
        .map(|cond| if cond > 0.0 { cond } else { SENTINEL })
        .collect()
}

/// Calibration outcome for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub mode: CalibrationMode,
    pub spread: f64,
    pub median: f64,
    pub scope: f64,
    pub fit_spread_rate: f64,
    /// Spread-rate band half-width around 1
    pub band: f64,
    pub fit_cond_values: Vec<f64>,
}

/// Calibrate contribution shares with the chosen mode
pub fn calibrate(
    values: &[f64],
    mode: CalibrationMode,
    min_price: f64,
    max_price: f64,
    current_price: f64,
) -> Calibration {
    let rates = LiquidityRates::new(min_price, max_price);
    let spread = rates.spread();
    let scope = Scope::from_values(values);
    let rate = fit_spread_rate(scope.first(), spread);
    let band = rates.band_half_width();

    let fit_cond_values = match mode {
        CalibrationMode::SpreadRate => cond_values_from_band(values, &scope, band),
        CalibrationMode::MedianSplit => {
            calculate_fit_cond_values(values, min_price, max_price, current_price)
        }
    };

    Calibration {
        mode,
        spread,
        median: scope.median,
        scope: scope.first().unwrap_or(0.0),
        fit_spread_rate: rate,
        band,
        fit_cond_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_from_rates() {
        let rates = LiquidityRates::new(800.0, 1200.0);
        assert!((rates.spread() - 0.5).abs() < 1e-12);
        assert_eq!(LiquidityRates::new(0.0, 0.0).spread(), 0.0);
    }

    #[test]
    fn test_scope_uses_first_deviation() {
        let scope = Scope::from_values(&[0.0, 0.4, 1.0]);
        assert_eq!(scope.median, 0.4);
        assert_eq!(scope.first(), Some(0.4));
        assert!((scope.deviations[2] - 0.6).abs() < 1e-12);
        assert_eq!(Scope::from_values(&[]).first(), None);
    }

    #[test]
    fn test_fit_spread_rate_guards() {
        assert_eq!(fit_spread_rate(Some(0.4), 0.0), SENTINEL);
        assert_eq!(fit_spread_rate(None, 0.5), SENTINEL);
        assert!((fit_spread_rate(Some(0.4), 0.5) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_band_keeps_bound_ratio() {
        let band = LiquidityRates::new(800.0, 1200.0).band_half_width();
        assert!((band - 0.2).abs() < 1e-12);
        assert!(((1.0 + band) / (1.0 - band) - 1.5).abs() < 1e-12);

        // Inverted bounds behave as swapped
        assert_eq!(LiquidityRates::new(1200.0, 800.0).band_half_width(), band);
        assert_eq!(LiquidityRates::new(0.0, 0.0).band_half_width(), 0.0);
    }

    #[test]
    fn test_rate_mode_widest_deviation_hits_band() {
        let values = [0.0, 0.4, 1.0];
        let cal = calibrate(&values, CalibrationMode::SpreadRate, 800.0, 1200.0, 1000.0);
        assert!((cal.fit_cond_values[0] - (1.0 - 0.2 * 0.4 / 0.6)).abs() < 1e-12);
        assert!((cal.fit_cond_values[1] - 1.0).abs() < 1e-12);
        assert!((cal.fit_cond_values[2] - 1.2).abs() < 1e-12);
        assert!((cal.fit_spread_rate - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_rate_mode_wide_bounds_stay_positive() {
        // max = 3 · min used to push the first unit below zero
        let values = [0.0, 0.4, 1.0];
        let cal = calibrate(&values, CalibrationMode::SpreadRate, 500.0, 1500.0, 1000.0);
        assert!((cal.band - 0.5).abs() < 1e-12);
        for cond in &cal.fit_cond_values {
            assert!(*cond >= 0.5 - 1e-12 && *cond <= 1.5 + 1e-12, "cond {} outside band", cond);
        }
        let ratio = cal.fit_cond_values[2] / cal.fit_cond_values[0];
        assert!(ratio <= 3.0 + 1e-9);
    }

    #[test]
    fn test_rate_mode_without_bounds_is_flat() {
        let cal = calibrate(&[0.0, 0.4, 1.0], CalibrationMode::SpreadRate, 0.0, 0.0, 1000.0);
        assert_eq!(cal.fit_cond_values, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rate_mode_flat_when_no_deviation() {
        let scope = Scope::from_values(&[0.3, 0.3]);
        assert_eq!(cond_values_from_band(&[0.3, 0.3], &scope, 0.5), vec![1.0, 1.0]);
    }

    #[test]
    fn test_rate_mode_floors_non_finite() {
        let values = [0.0, f64::NAN, 1.0];
        let scope = Scope::from_values(&values);
        let conds = cond_values_from_band(&values, &scope, 0.5);
        assert_eq!(conds[1], SENTINEL);
        assert!(conds[0] > 0.0);
    }

    #[test]
    fn test_median_split_hits_liquidity_bounds() {
        let values = [0.0, 0.2, 0.5, 0.9, 1.0];
        let conds = calculate_fit_cond_values(&values, 800.0, 1300.0, 1000.0);
        assert!((conds[0] - 0.8).abs() < 1e-12);
        assert!((conds[2] - 1.0).abs() < 1e-12);
        assert!((conds[4] - 1.3).abs() < 1e-12);
        for pair in conds.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_median_split_degenerate_branch_is_flat() {
        // min above current: no shrink possible below the median
        let conds = calculate_fit_cond_values(&[0.0, 0.5, 1.0], 1100.0, 1300.0, 1000.0);
        assert_eq!(conds[0], 1.0);
        assert!((conds[2] - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(CalibrationMode::from_str("median-split"), Some(CalibrationMode::MedianSplit));
        assert_eq!(CalibrationMode::from_str("spread_rate"), Some(CalibrationMode::SpreadRate));
        assert_eq!(CalibrationMode::from_str("other"), None);
    }
}
