//! Static pricing parameters
//!
//! Global scalars supplied per pricing run. They never change during a run.
//!
//! # Metadata
//!
//! [`StaticParams::metadata`] is the single source of truth for parameter
//! keys, defaults, valid ranges and validators. [`StaticParams::sanitized`]
//! uses it to replace invalid values: divisors fall back to the `1e-10`
//! sentinel, everything else to its default. Each substitution logs a warning.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::numeric::SENTINEL;

/// How the soldout fraction is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OversoldMethod {
    /// Count of sold units over count of units
    #[default]
    Pieces,
    /// Sold area over total area
    Area,
}

impl OversoldMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pieces" | "count" => Some(OversoldMethod::Pieces),
            "area" => Some(OversoldMethod::Area),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OversoldMethod::Pieces => "pieces",
            OversoldMethod::Area => "area",
        }
    }
}

impl fmt::Display for OversoldMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Global scalars of one pricing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticParams {
    /// Negotiation discount in percent applied on the clamped price path
    #[serde(alias = "bargainGap")]
    pub bargain_gap: f64,

    /// Upside multiplier carried for reporting
    pub maxify_factor: f64,

    /// Base price per m² (overridden by the income plan when one is given)
    pub current_price_per_sqm: f64,

    /// Lower liquidity-refusal price per m²
    #[serde(alias = "minimum_liq_refusal_price_per_sqm")]
    pub minimum_liq_refusal_price: f64,

    /// Upper liquidity-refusal price per m²
    #[serde(alias = "maximum_liq_refusal_price_per_sqm")]
    pub maximum_liq_refusal_price: f64,

    /// Correction factor for overestimated plans, carried for reporting
    pub overestimate_correct_factor: f64,

    pub oversold_method: OversoldMethod,

    /// Similarity kernel bandwidth
    pub sigma: f64,

    /// Kernel values at or below this are ignored
    #[serde(alias = "similarityThreshold")]
    pub similarity_threshold: f64,
}

impl Default for StaticParams {
    fn default() -> Self {
        Self {
            bargain_gap: 0.0,
            maxify_factor: 1.0,
            current_price_per_sqm: SENTINEL,
            minimum_liq_refusal_price: SENTINEL,
            maximum_liq_refusal_price: SENTINEL,
            overestimate_correct_factor: 1.0,
            oversold_method: OversoldMethod::Pieces,
            sigma: 0.5,
            similarity_threshold: 0.01,
        }
    }
}

/// Validation metadata for one numeric parameter
pub struct ParamMetadata {
    pub key: &'static str,
    pub default_value: f64,
    pub description: &'static str,
    pub validation_range: &'static str,
    /// `true` when the parameter is used as a divisor (invalid → sentinel)
    pub divisor: bool,
    pub validator: fn(f64) -> Result<(), String>,
    get: fn(&StaticParams) -> f64,
    set: fn(&mut StaticParams, f64),
}

impl StaticParams {
    /// Metadata for every numeric parameter
    pub fn metadata() -> &'static [ParamMetadata] {
        &[
            ParamMetadata {
                key: "bargain_gap",
                default_value: 0.0,
                description: "Negotiation discount (%) on the clamped price path",
                validation_range: "0.0-100.0",
                divisor: false,
                validator: |v| {
                    if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                        return Err(format!("bargain_gap: value {} out of range [0.0, 100.0]", v));
                    }
                    Ok(())
                },
                get: |p| p.bargain_gap,
                set: |p, v| p.bargain_gap = v,
            },
            ParamMetadata {
                key: "maxify_factor",
                default_value: 1.0,
                description: "Upside multiplier",
                validation_range: "> 0",
                divisor: false,
                validator: positive,
                get: |p| p.maxify_factor,
                set: |p, v| p.maxify_factor = v,
            },
            ParamMetadata {
                key: "current_price_per_sqm",
                default_value: SENTINEL,
                description: "Base price per m²",
                validation_range: "> 0",
                divisor: true,
                validator: positive,
                get: |p| p.current_price_per_sqm,
                set: |p, v| p.current_price_per_sqm = v,
            },
            ParamMetadata {
                key: "minimum_liq_refusal_price",
                default_value: SENTINEL,
                description: "Lower liquidity-refusal price per m²",
                validation_range: "> 0",
                divisor: true,
                validator: positive,
                get: |p| p.minimum_liq_refusal_price,
                set: |p, v| p.minimum_liq_refusal_price = v,
            },
            ParamMetadata {
                key: "maximum_liq_refusal_price",
                default_value: SENTINEL,
                description: "Upper liquidity-refusal price per m²",
                validation_range: "> 0",
                divisor: true,
                validator: positive,
                get: |p| p.maximum_liq_refusal_price,
                set: |p, v| p.maximum_liq_refusal_price = v,
            },
            ParamMetadata {
                key: "overestimate_correct_factor",
                default_value: 1.0,
                description: "Correction factor for overestimated plans",
                validation_range: "> 0",
                divisor: false,
                validator: positive,
                get: |p| p.overestimate_correct_factor,
                set: |p, v| p.overestimate_correct_factor = v,
            },
            ParamMetadata {
                key: "sigma",
                default_value: 0.5,
                description: "Similarity kernel bandwidth",
                validation_range: "> 0",
                divisor: true,
                validator: positive,
                get: |p| p.sigma,
                set: |p, v| p.sigma = v,
            },
            ParamMetadata {
                key: "similarity_threshold",
                default_value: 0.01,
                description: "Minimum kernel value counted as similar",
                validation_range: "0.0-1.0",
                divisor: false,
                validator: |v| {
                    if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                        return Err(format!(
                            "similarity_threshold: value {} out of range [0.0, 1.0]",
                            v
                        ));
                    }
                    Ok(())
                },
                get: |p| p.similarity_threshold,
                set: |p, v| p.similarity_threshold = v,
            },
        ]
    }

    /// Validate every parameter, collecting all failures
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let errors: Vec<String> = Self::metadata()
            .iter()
            .filter_map(|meta| (meta.validator)((meta.get)(self)).err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Copy with every invalid value replaced
    ///
    /// Divisors become the sentinel, other parameters their default.
    pub fn sanitized(&self) -> Self {
        let mut clean = self.clone();
        for meta in Self::metadata() {
            let value = (meta.get)(self);
            if let Err(e) = (meta.validator)(value) {
                let substitute = if meta.divisor { SENTINEL } else { meta.default_value };
                warn!(param = meta.key, "{}, using {}", e, substitute);
                (meta.set)(&mut clean, substitute);
            }
        }
        clean
    }
}

fn positive(v: f64) -> Result<(), String> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(format!("value {} must be a positive number", v))
    }
}
