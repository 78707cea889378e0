//! Numeric guards shared by every pricing stage
//!
//! The engine never divides by zero and never rejects a batch because of a bad
//! number. Missing, non-finite or non-positive divisors are replaced by
//! [`SENTINEL`] and a warning is logged.

use tracing::warn;

/// Substitute for missing or invalid divisors (areas, prices, rates)
pub const SENTINEL: f64 = 1e-10;

/// Returns `value` when it is finite and strictly positive, otherwise [`SENTINEL`]
///
/// `field` names the quantity in the emitted diagnostic.
pub fn positive_or_sentinel(value: f64, field: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field, value, "Invalid numeric value, substituting sentinel");
        SENTINEL
    }
}

/// Same as [`positive_or_sentinel`] but silent, for hot loops that already logged
pub fn positive_or_sentinel_quiet(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        SENTINEL
    }
}

/// Round to a fixed number of decimal places
pub fn round_decimals(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Largest finite value of a slice, `None` when there is none
pub fn max_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}

/// Median of a slice (mean of the two middle values for even lengths)
///
/// Returns `None` for an empty slice. Non-finite values sort last.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Divide, returning 0 when the denominator is zero or the result is not finite
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
