//! Plain-text rendering of a price table

use std::fmt::Write;

use upa_common::PriceTable;

const HEADER: [&str; 9] = [
    "unit",
    "floor",
    "area",
    "score",
    "rt_norm",
    "cond_value",
    "share",
    "price_sqm",
    "clamped_sqm",
];

/// One line per unit in ascending score order, then the summary
pub fn render_text(table: &PriceTable) -> String {
    let mut out = String::new();
    let summary = &table.summary;

    if table.is_empty() {
        let _ = writeln!(out, "No available units to price ({} sold)", summary.sold_units);
        return out;
    }

    let _ = writeln!(out, "{}", HEADER.join("\t"));
    for row in &table.rows {
        let _ = writeln!(
            out,
            "{}\t{}\t{:.2}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            row.unit_id,
            row.floor,
            row.area,
            row.score,
            row.sp_mixed_rt_norm,
            row.fit_cond_value,
            row.cond_cost_share,
            row.actual_price_per_sqm,
            row.final_price,
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "strategy={} calibration={} distribution={}",
        summary.strategy, summary.calibration, summary.distribution
    );
    let _ = writeln!(
        out,
        "units={} sold={} base_price_sqm={:.6}",
        summary.available_units, summary.sold_units, summary.base_price_per_sqm
    );
    let _ = writeln!(
        out,
        "budget={:.6} allocated={:.6}",
        summary.total_budget, summary.allocated_total
    );
    let _ = writeln!(
        out,
        "spread={:.6} scope={:.6} fit_spread_rate={:.6} band={:.6} median={:.6}",
        summary.spread, summary.scope, summary.fit_spread_rate, summary.band, summary.median
    );
    out
}
