//! Income plan interpolation of the onboarding base price
//!
//! The income plan ramps the base price per m² as the project sells out.
//! Plans sorted by `period_begin` split `[0, 1]` into equal soldout segments;
//! inside a segment the price moves linearly toward the next plan's price.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::numeric::{positive_or_sentinel, ratio_or_zero, round_decimals, SENTINEL};
use crate::params::{OversoldMethod, StaticParams};
use crate::units::Unit;

/// One price breakpoint of the income plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomePlan {
    pub price_per_sqm: f64,

    /// Start of the sales period this price applies to
    pub period_begin: NaiveDate,

    #[serde(default)]
    pub period_end: Option<NaiveDate>,
}

impl IncomePlan {
    pub fn new(price_per_sqm: f64, period_begin: NaiveDate) -> Self {
        Self {
            price_per_sqm,
            period_begin,
            period_end: None,
        }
    }
}

/// Share of inventory already sold, rounded to 2 decimals
///
/// 0 when there is nothing to measure against.
pub fn soldout_fraction(units: &[Unit], method: OversoldMethod) -> f64 {
    let fraction = match method {
        OversoldMethod::Pieces => {
            let sold = units.iter().filter(|u| u.is_sold()).count();
            ratio_or_zero(sold as f64, units.len() as f64)
        }
        OversoldMethod::Area => {
            let area = |u: &Unit| if u.area.is_finite() && u.area > 0.0 { u.area } else { 0.0 };
            let sold: f64 = units.iter().filter(|u| u.is_sold()).map(area).sum();
            let total: f64 = units.iter().map(area).sum();
            ratio_or_zero(sold, total)
        }
    };
    round_decimals(fraction, 2)
}

/// Interpolated price for a soldout fraction
///
/// Returns `None` for an empty plan list. Fractions outside `[0, 1]` take the
/// first plan's price.
pub fn interpolate_price(soldout: f64, plans: &[IncomePlan]) -> Option<f64> {
    let mut sorted: Vec<&IncomePlan> = plans.iter().collect();
    sorted.sort_by_key(|p| p.period_begin);
    let first = sorted.first()?;

    if !soldout.is_finite() || !(0.0..=1.0).contains(&soldout) {
        warn!(soldout, "Soldout fraction outside income plan segments, using first plan");
        return Some(first.price_per_sqm);
    }

    let n = sorted.len();
    let width = 1.0 / n as f64;
    let segment = ((soldout / width).floor() as usize).min(n - 1);

    let current = sorted[segment].price_per_sqm;
    let next = sorted.get(segment + 1).map_or(current, |p| p.price_per_sqm);
    let t = (soldout - segment as f64 * width) / width;

    Some(current + (next - current) * t)
}

/// Onboarding base price for `unit`
///
/// Falls back to the unit's committed price (or the sentinel) when there is
/// no income plan.
pub fn base_price(
    unit: &Unit,
    all_units: &[Unit],
    method: OversoldMethod,
    plans: &[IncomePlan],
) -> f64 {
    let soldout = soldout_fraction(all_units, method);
    match interpolate_price(soldout, plans) {
        Some(price) => price,
        None => unit.committed_price_per_sqm.unwrap_or_else(|| {
            warn!(unit = %unit.id, "No income plan and no committed price, using sentinel");
            SENTINEL
        }),
    }
}

/// Base price per m² for a whole run
///
/// With an income plan the price follows the soldout fraction, otherwise the
/// static `current_price_per_sqm` is used. A non-positive plan price becomes
/// the sentinel.
pub fn resolve_base_price(units: &[Unit], params: &StaticParams, plans: &[IncomePlan]) -> f64 {
    if plans.is_empty() {
        return params.current_price_per_sqm;
    }

    let soldout = soldout_fraction(units, params.oversold_method);
    let price = interpolate_price(soldout, plans)
        .map(|p| positive_or_sentinel(p, "price_per_sqm"))
        .unwrap_or(params.current_price_per_sqm);
    debug!(
        soldout,
        method = %params.oversold_method,
        price,
        "Base price from income plan"
    );
    price
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plans() -> Vec<IncomePlan> {
        // Deliberately out of order
        vec![
            IncomePlan::new(200.0, date(2025, 6, 1)),
            IncomePlan::new(100.0, date(2025, 1, 1)),
        ]
    }

    #[test]
    fn test_soldout_by_pieces_and_area() {
        let units = vec![
            Unit::new("a", 1, "1", 30.0).with_status(UnitStatus::Sold),
            Unit::new("b", 1, "2", 60.0),
            Unit::new("c", 1, "3", 10.0),
        ];
        assert_eq!(soldout_fraction(&units, OversoldMethod::Pieces), 0.33);
        assert_eq!(soldout_fraction(&units, OversoldMethod::Area), 0.3);
        assert_eq!(soldout_fraction(&[], OversoldMethod::Pieces), 0.0);
    }

    #[test]
    fn test_interpolation_segments() {
        let plans = plans();
        assert_eq!(interpolate_price(0.0, &plans), Some(100.0));
        assert!((interpolate_price(0.25, &plans).unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(interpolate_price(0.5, &plans), Some(200.0));
        assert_eq!(interpolate_price(1.0, &plans), Some(200.0));
    }

    #[test]
    fn test_out_of_range_uses_first_plan() {
        assert_eq!(interpolate_price(1.5, &plans()), Some(100.0));
        assert_eq!(interpolate_price(f64::NAN, &plans()), Some(100.0));
        assert_eq!(interpolate_price(0.5, &[]), None);
    }

    #[test]
    fn test_base_price_falls_back_to_committed() {
        let mut unit = Unit::new("a", 1, "1", 30.0);
        unit.commit_price(950.0);
        let units = vec![unit.clone()];
        assert_eq!(base_price(&unit, &units, OversoldMethod::Pieces, &[]), 950.0);

        let fresh = Unit::new("b", 1, "2", 30.0);
        assert_eq!(base_price(&fresh, &units, OversoldMethod::Pieces, &[]), SENTINEL);
    }

    #[test]
    fn test_resolve_prefers_plan() {
        let units = vec![
            Unit::new("a", 1, "1", 30.0).with_status(UnitStatus::Sold),
            Unit::new("b", 1, "2", 30.0),
            Unit::new("c", 1, "3", 30.0),
            Unit::new("d", 1, "4", 30.0),
        ];
        let params = StaticParams {
            current_price_per_sqm: 999.0,
            ..StaticParams::default()
        };
        // soldout 0.25 → halfway through the first segment
        assert!((resolve_base_price(&units, &params, &plans()) - 150.0).abs() < 1e-9);
        assert_eq!(resolve_base_price(&units, &params, &[]), 999.0);
    }

    #[test]
    fn test_non_positive_plan_price_becomes_sentinel() {
        let units = vec![Unit::new("a", 1, "1", 30.0)];
        let params = StaticParams {
            current_price_per_sqm: 999.0,
            ..StaticParams::default()
        };
        let zero = vec![IncomePlan::new(0.0, date(2025, 1, 1))];
        let negative = vec![IncomePlan::new(-250.0, date(2025, 1, 1))];
        assert_eq!(resolve_base_price(&units, &params, &zero), SENTINEL);
        assert_eq!(resolve_base_price(&units, &params, &negative), SENTINEL);
    }
}
