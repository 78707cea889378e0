//! Budget allocation
//!
//! Two pricing modes share the conditional values produced by calibration:
//!
//! - [`PricingStrategy::BudgetShare`]: each unit's conditional cost
//!   (`fit_cond_value · area`) claims a share of the fixed budget
//!   `Σ area · current_price_per_sqm`. Prices always add up to the budget.
//! - [`PricingStrategy::BoundClamp`]: `base · fit_cond_value · (1 - gap/100)`
//!   clamped into the liquidity-refusal bounds. Bounds always hold, the budget
//!   does not.
//!
//! Both columns are always computed; the strategy picks the committed one.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::numeric::{positive_or_sentinel_quiet, ratio_or_zero};

/// Which price column is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingStrategy {
    /// Budget-conserving share of the total
    #[default]
    BudgetShare,
    /// Base price scaled by the conditional value and clamped to the bounds
    BoundClamp,
}

impl PricingStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "budget_share" | "budget" | "share" => Some(PricingStrategy::BudgetShare),
            "bound_clamp" | "clamp" => Some(PricingStrategy::BoundClamp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingStrategy::BudgetShare => "budget_share",
            PricingStrategy::BoundClamp => "bound_clamp",
        }
    }
}

impl fmt::Display for PricingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Budget-share allocation columns, aligned with the input areas
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Allocation {
    pub cond_cost: Vec<f64>,
    pub total_cond_cost: f64,
    pub cond_cost_share: Vec<f64>,
    pub actual_cost: Vec<f64>,
    pub total_actual_cost: f64,
    pub actual_price_per_sqm: Vec<f64>,
    /// Input positions dropped because the columns disagreed in length
    pub skipped: Vec<usize>,
}

/// Split the budget `Σ area · current_price_per_sqm` by conditional cost
///
/// When `fit_cond_values` and `areas` differ in length, the positions only
/// one side covers are skipped with a warning.
pub fn allocate_budget(fit_cond_values: &[f64], areas: &[f64], current_price_per_sqm: f64) -> Allocation {
    let paired = fit_cond_values.len().min(areas.len());
    let longest = fit_cond_values.len().max(areas.len());
    let skipped: Vec<usize> = (paired..longest).collect();
    if !skipped.is_empty() {
        warn!(
            cond_values = fit_cond_values.len(),
            areas = areas.len(),
            skipped = skipped.len(),
            "Conditional values and areas differ in length, skipping unmatched units"
        );
    }

    let areas: Vec<f64> = areas[..paired]
        .iter()
        .map(|a| positive_or_sentinel_quiet(*a))
        .collect();

    let cond_cost: Vec<f64> = fit_cond_values[..paired]
        .iter()
        .zip(&areas)
        .map(|(v, a)| v * a)
        .collect();
    let total_cond_cost: f64 = cond_cost.iter().sum();

    let cond_cost_share: Vec<f64> = cond_cost
        .iter()
        .map(|c| ratio_or_zero(*c, total_cond_cost))
        .collect();

    let total_actual_cost: f64 = areas.iter().map(|a| a * current_price_per_sqm).sum();

    let actual_cost: Vec<f64> = cond_cost_share
        .iter()
        .map(|share| total_actual_cost * share)
        .collect();
    let actual_price_per_sqm: Vec<f64> = actual_cost
        .iter()
        .zip(&areas)
        .map(|(cost, area)| cost / area)
        .collect();

    Allocation {
        cond_cost,
        total_cond_cost,
        cond_cost_share,
        actual_cost,
        total_actual_cost,
        actual_price_per_sqm,
        skipped,
    }
}

/// Bound-clamped price per m² for one unit
///
/// Inverted bounds are swapped. Non-finite results fall back to the lower bound.
pub fn clamped_price(
    base_price: f64,
    fit_cond_value: f64,
    bargain_gap: f64,
    min_price: f64,
    max_price: f64,
) -> f64 {
    let raw = base_price * fit_cond_value * (1.0 - bargain_gap / 100.0);
    if !min_price.is_finite() || !max_price.is_finite() {
        warn!(min_price, max_price, "Price bounds not finite, leaving price unclamped");
        return if raw.is_finite() { raw } else { 0.0 };
    }

    let (lo, hi) = if min_price <= max_price {
        (min_price, max_price)
    } else {
        warn!(min_price, max_price, "Price bounds inverted, swapping");
        (max_price, min_price)
    };

    if raw.is_finite() {
        raw.clamp(lo, hi)
    } else {
        lo
    }
}

/// Bound-clamped prices for every conditional value
pub fn clamped_prices(
    base_price: f64,
    fit_cond_values: &[f64],
    bargain_gap: f64,
    min_price: f64,
    max_price: f64,
) -> Vec<f64> {
    fit_cond_values
        .iter()
        .map(|v| clamped_price(base_price, *v, bargain_gap, min_price, max_price))
        .collect()
}
