//! Target distribution curves
//!
//! Shapes the contribution of each rank position. A curve of length N is
//! sampled at `x = (i+1)/N`:
//! - Uniform: `x` (strictly increasing ramp)
//! - Gaussian: `exp(-0.5 · ((x - mean)/std_dev)²)`
//! - Bimodal: sum of two Gaussian bumps sharing `std_dev`
//!
//! [`preset_value_at`] is the inverse lookup used by the mixing pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::numeric::positive_or_sentinel_quiet;

const DEFAULT_MEAN: f64 = 0.5;
const DEFAULT_STD_DEV: f64 = 0.15;
const DEFAULT_BIMODAL_MEAN1: f64 = 0.25;
const DEFAULT_BIMODAL_MEAN2: f64 = 0.75;
const DEFAULT_BIMODAL_STD_DEV: f64 = 0.1;

/// Distribution config as supplied by the configuration editor
///
/// `type` is free text; [`Distribution::from_config`] resolves it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl DistributionConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    fn param(&self, keys: &[&str], default: f64) -> f64 {
        keys.iter()
            .find_map(|k| self.params.get(*k).copied())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }
}

/// Resolved distribution shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Distribution {
    Uniform,
    Gaussian { mean: f64, std_dev: f64 },
    Bimodal { mean1: f64, mean2: f64, std_dev: f64 },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Uniform
    }
}

impl Distribution {
    /// Resolve a raw config, defaulting to Uniform for unknown types
    ///
    /// Parameter keys accept both `std_dev` and `stdDev`. Missing parameters
    /// take module defaults.
    pub fn from_config(config: &DistributionConfig) -> Self {
        match config.kind.trim().to_lowercase().as_str() {
            "" | "uniform" => Distribution::Uniform,
            "gaussian" | "normal" => Distribution::Gaussian {
                mean: config.param(&["mean"], DEFAULT_MEAN),
                std_dev: config.param(&["std_dev", "stdDev"], DEFAULT_STD_DEV),
            },
            "bimodal" => Distribution::Bimodal {
                mean1: config.param(&["mean1"], DEFAULT_BIMODAL_MEAN1),
                mean2: config.param(&["mean2"], DEFAULT_BIMODAL_MEAN2),
                std_dev: config.param(&["std_dev", "stdDev"], DEFAULT_BIMODAL_STD_DEV),
            },
            other => {
                warn!(distribution = other, "Unknown distribution type, using uniform");
                Distribution::Uniform
            }
        }
    }

    /// Curve value at normalized position `x`
    pub fn value_at(&self, x: f64) -> f64 {
        match *self {
            Distribution::Uniform => x,
            Distribution::Gaussian { mean, std_dev } => gaussian(x, mean, std_dev),
            Distribution::Bimodal {
                mean1,
                mean2,
                std_dev,
            } => gaussian(x, mean1, std_dev) + gaussian(x, mean2, std_dev),
        }
    }

    /// Sample the curve at `(i+1)/length` for `i in 0..length`
    pub fn curve(&self, length: usize) -> Vec<f64> {
        (0..length)
            .map(|i| self.value_at((i + 1) as f64 / length as f64))
            .collect()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Distribution::Uniform => "Uniform",
            Distribution::Gaussian { .. } => "Gaussian",
            Distribution::Bimodal { .. } => "Bimodal",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn gaussian(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / positive_or_sentinel_quiet(std_dev);
    (-0.5 * z * z).exp()
}

/// Generate a curve of `length` samples from a raw config
pub fn curve(length: usize, config: &DistributionConfig) -> Vec<f64> {
    Distribution::from_config(config).curve(length)
}

/// Curve value for a normalized rank
///
/// Index is `floor((rank_norm - 1/len) · (len - 1))` clamped to the curve, the
/// inverse of the `(i+1)/N` rank normalization. An empty curve yields 0.
pub fn preset_value_at(rank_norm: f64, curve: &[f64]) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    let len = curve.len() as f64;
    let raw = ((rank_norm - 1.0 / len) * (len - 1.0)).floor();
    let index = if raw.is_finite() && raw > 0.0 {
        (raw as usize).min(curve.len() - 1)
    } else {
        0
    };
    curve[index]
}
