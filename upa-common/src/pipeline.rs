//! Pricing run
//!
//! Wires the engine stages together for one snapshot of units:
//! sanitize → base price → catalogue → score → mix → calibrate → allocate.
//! Sold units take part in scoring as comparables but get no price row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocation::{allocate_budget, clamped_prices, PricingStrategy};
use crate::calibration::{calibrate, CalibrationMode};
use crate::catalogue::AttributeCatalogue;
use crate::distribution::{Distribution, DistributionConfig};
use crate::importance::ImportanceConfig;
use crate::income_plan::{resolve_base_price, IncomePlan};
use crate::mixing::mix;
use crate::params::StaticParams;
use crate::priority::PriorityTable;
use crate::scoring::score_all;
use crate::units::Unit;

/// Everything a pricing run reads
#[derive(Debug, Clone, Default)]
pub struct PricingInput {
    pub units: Vec<Unit>,
    pub importance: ImportanceConfig,
    /// Priority tables keyed by attribute name
    pub priority_tables: BTreeMap<String, PriorityTable>,
    pub distribution: DistributionConfig,
    pub params: StaticParams,
    pub income_plans: Vec<IncomePlan>,
    pub strategy: PricingStrategy,
    pub calibration: CalibrationMode,
}

/// Every intermediate quantity for one available unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub unit_id: String,
    pub floor: i32,
    pub unit_number: String,
    pub area: f64,
    pub score: f64,
    pub score_norm: f64,
    pub rank_norm: f64,
    pub preset_value: f64,
    pub sp_mixed: f64,
    pub sp_mixed_rt: f64,
    pub sp_mixed_rt_norm: f64,
    pub fit_cond_value: f64,
    pub cond_cost: f64,
    pub cond_cost_share: f64,
    pub actual_cost: f64,
    /// Budget-share price per m²
    pub actual_price_per_sqm: f64,
    /// Bound-clamped price per m²
    pub final_price: f64,
    /// Price per m² under the run's strategy
    pub committed_price: f64,
}

impl PriceRow {
    /// Price per m² under `strategy`
    pub fn price_for(&self, strategy: PricingStrategy) -> f64 {
        match strategy {
            PricingStrategy::BudgetShare => self.actual_price_per_sqm,
            PricingStrategy::BoundClamp => self.final_price,
        }
    }
}

/// Run-level figures
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceSummary {
    pub available_units: usize,
    pub sold_units: usize,
    pub base_price_per_sqm: f64,
    /// `Σ area · base_price_per_sqm` over available units
    pub total_budget: f64,
    /// `Σ area · committed_price`
    pub allocated_total: f64,
    pub total_cond_cost: f64,
    pub spread: f64,
    pub scope: f64,
    pub fit_spread_rate: f64,
    /// Conditional band half-width from the liquidity bounds
    pub band: f64,
    pub median: f64,
    pub distribution: String,
    pub strategy: PricingStrategy,
    pub calibration: CalibrationMode,
}

/// Price rows in ascending score order plus the run summary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceTable {
    pub rows: Vec<PriceRow>,
    pub summary: PriceSummary,
}

impl PriceTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, unit_id: &str) -> Option<&PriceRow> {
        self.rows.iter().find(|r| r.unit_id == unit_id)
    }

    /// Rows indexed by unit id
    pub fn by_unit(&self) -> BTreeMap<&str, &PriceRow> {
        self.rows.iter().map(|r| (r.unit_id.as_str(), r)).collect()
    }
}

/// Price record handed to persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedPrice {
    pub record_id: Uuid,
    pub unit_id: String,
    pub price_per_sqm: f64,
    pub total_price: f64,
    pub strategy: PricingStrategy,
    pub committed_at: DateTime<Utc>,
}

/// Price every available unit of the input
pub fn price_units(input: &PricingInput) -> PriceTable {
    let params = input.params.sanitized();
    let base_price = resolve_base_price(&input.units, &params, &input.income_plans);
    let distribution = Distribution::from_config(&input.distribution);

    let available: Vec<&Unit> = input.units.iter().filter(|u| u.is_available()).collect();
    let sold_units = input.units.len() - available.len();

    info!(
        units = input.units.len(),
        available = available.len(),
        sold = sold_units,
        strategy = %input.strategy,
        calibration = %input.calibration,
        distribution = %distribution,
        "Starting pricing run"
    );

    let mut summary = PriceSummary {
        available_units: available.len(),
        sold_units,
        base_price_per_sqm: base_price,
        distribution: distribution.display_name().to_string(),
        strategy: input.strategy,
        calibration: input.calibration,
        ..PriceSummary::default()
    };

    if available.is_empty() {
        warn!("No available units to price");
        return PriceTable {
            rows: Vec::new(),
            summary,
        };
    }

    let catalogue = AttributeCatalogue::resolve(&input.units, &input.importance, &input.priority_tables);
    let all_scores = score_all(&input.units, &catalogue, &params);
    let scores: Vec<f64> = input
        .units
        .iter()
        .zip(&all_scores)
        .filter(|(u, _)| u.is_available())
        .map(|(_, s)| *s)
        .collect();
    debug!(attributes = catalogue.len(), scored = scores.len(), "Scored units");

    let curve = distribution.curve(available.len());
    let mixed = mix(&scores, &curve);
    debug!(max_running_total = mixed.sp_mixed_rt.last().copied().unwrap_or(0.0), "Mixed scores");

    let calibration = calibrate(
        &mixed.sp_mixed_rt_norm,
        input.calibration,
        params.minimum_liq_refusal_price,
        params.maximum_liq_refusal_price,
        base_price,
    );
    debug!(
        spread = calibration.spread,
        scope = calibration.scope,
        fit_spread_rate = calibration.fit_spread_rate,
        band = calibration.band,
        "Calibrated conditional values"
    );

    let sorted_units: Vec<&Unit> = mixed.order.iter().map(|&i| available[i]).collect();
    let areas: Vec<f64> = sorted_units.iter().map(|u| u.area).collect();
    let allocation = allocate_budget(&calibration.fit_cond_values, &areas, base_price);
    let final_prices = clamped_prices(
        base_price,
        &calibration.fit_cond_values,
        params.bargain_gap,
        params.minimum_liq_refusal_price,
        params.maximum_liq_refusal_price,
    );

    let rows: Vec<PriceRow> = sorted_units
        .iter()
        .enumerate()
        .take(allocation.actual_price_per_sqm.len())
        .map(|(i, unit)| {
            let mut row = PriceRow {
                unit_id: unit.id.clone(),
                floor: unit.floor,
                unit_number: unit.unit_number.clone(),
                area: unit.area,
                score: mixed.score[i],
                score_norm: mixed.score_norm[i],
                rank_norm: mixed.rank_norm[i],
                preset_value: mixed.preset_value[i],
                sp_mixed: mixed.sp_mixed[i],
                sp_mixed_rt: mixed.sp_mixed_rt[i],
                sp_mixed_rt_norm: mixed.sp_mixed_rt_norm[i],
                fit_cond_value: calibration.fit_cond_values[i],
                cond_cost: allocation.cond_cost[i],
                cond_cost_share: allocation.cond_cost_share[i],
                actual_cost: allocation.actual_cost[i],
                actual_price_per_sqm: allocation.actual_price_per_sqm[i],
                final_price: final_prices[i],
                committed_price: 0.0,
            };
            row.committed_price = row.price_for(input.strategy);
            row
        })
        .collect();

    summary.total_budget = allocation.total_actual_cost;
    summary.total_cond_cost = allocation.total_cond_cost;
    summary.allocated_total = rows.iter().map(|r| r.committed_price * r.area).sum();
    summary.spread = calibration.spread;
    summary.scope = calibration.scope;
    summary.fit_spread_rate = calibration.fit_spread_rate;
    summary.band = calibration.band;
    summary.median = calibration.median;

    info!(
        priced = rows.len(),
        base_price,
        total_budget = summary.total_budget,
        allocated_total = summary.allocated_total,
        "Pricing run complete"
    );

    PriceTable { rows, summary }
}

/// Commit the strategy's price column onto the units
///
/// Units without a row in `table` are left untouched.
pub fn commit_prices(
    units: &mut [Unit],
    table: &PriceTable,
    strategy: PricingStrategy,
) -> Vec<CommittedPrice> {
    let rows = table.by_unit();
    let committed_at = Utc::now();

    let records: Vec<CommittedPrice> = units
        .iter_mut()
        .filter_map(|unit| {
            let row = rows.get(unit.id.as_str())?;
            let price = row.price_for(strategy);
            unit.commit_price(price);
            Some(CommittedPrice {
                record_id: Uuid::new_v4(),
                unit_id: unit.id.clone(),
                price_per_sqm: price,
                total_price: price * unit.area,
                strategy,
                committed_at,
            })
        })
        .collect();

    info!(committed = records.len(), strategy = %strategy, "Committed prices");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitStatus;

    fn input(units: Vec<Unit>) -> PricingInput {
        PricingInput {
            units,
            importance: ImportanceConfig::from_weights([("floor", 1.0)]),
            params: StaticParams {
                current_price_per_sqm: 1000.0,
                minimum_liq_refusal_price: 800.0,
                maximum_liq_refusal_price: 1200.0,
                ..StaticParams::default()
            },
            ..PricingInput::default()
        }
    }

    #[test]
    fn test_no_available_units_gives_empty_table() {
        let units = vec![Unit::new("a", 1, "1", 50.0).with_status(UnitStatus::Sold)];
        let table = price_units(&input(units));
        assert!(table.is_empty());
        assert_eq!(table.summary.sold_units, 1);
    }

    #[test]
    fn test_sold_units_get_no_row() {
        let units = vec![
            Unit::new("a", 1, "1", 50.0).with_status(UnitStatus::Sold),
            Unit::new("b", 2, "2", 50.0),
            Unit::new("c", 3, "3", 50.0),
        ];
        let table = price_units(&input(units));
        assert_eq!(table.len(), 2);
        assert!(table.get("a").is_none());
        assert!(table.get("b").is_some());
    }

    #[test]
    fn test_commit_writes_strategy_column() {
        let mut units = vec![Unit::new("a", 1, "1", 50.0), Unit::new("b", 2, "2", 60.0)];
        let table = price_units(&input(units.clone()));
        let records = commit_prices(&mut units, &table, PricingStrategy::BoundClamp);

        assert_eq!(records.len(), 2);
        for record in &records {
            let row = table.get(&record.unit_id).unwrap();
            assert_eq!(record.price_per_sqm, row.final_price);
        }
        assert_eq!(
            units[0].committed_price_per_sqm,
            Some(table.get("a").unwrap().final_price)
        );
        assert_ne!(records[0].record_id, records[1].record_id);
    }
}
