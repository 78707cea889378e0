//! Run configuration loading and path resolution
//!
//! A pricing run is configured by one TOML file:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [pricing]
//! strategy = "budget_share"      # or "bound_clamp"
//! calibration = "spread_rate"    # or "median_split"
//!
//! [static_params]
//! current_price_per_sqm = 1000.0
//! minimum_liq_refusal_price = 800.0
//! maximum_liq_refusal_price = 1300.0
//!
//! [distribution]
//! type = "gaussian"
//! params = { mean = 0.5, std_dev = 0.2 }
//!
//! [importance]
//! floor = 2.0
//! view = 1.0
//!
//! [[priority_tables]]
//! field = "view"
//! groups = [
//!     { name = "sea", values = ["sea"], priority = 1 },
//!     { name = "inner", values = ["yard", "wall"], priority = 2 },
//! ]
//!
//! [[income_plans]]
//! price_per_sqm = 1000.0
//! period_begin = "2025-01-01"
//! ```
//!
//! Unit records come from a separate JSON array (see [`load_units`]).
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<platform config dir>/upa/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::allocation::PricingStrategy;
use crate::calibration::CalibrationMode;
use crate::distribution::DistributionConfig;
use crate::importance::ImportanceConfig;
use crate::income_plan::IncomePlan;
use crate::params::StaticParams;
use crate::pipeline::PricingInput;
use crate::priority::PriorityTable;
use crate::units::Unit;
use crate::{Error, Result};

/// Environment variable naming the run configuration file
pub const CONFIG_ENV_VAR: &str = "UPA_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Strategy selection for the run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingOptions {
    #[serde(default)]
    pub strategy: PricingStrategy,

    #[serde(default)]
    pub calibration: CalibrationMode,
}

/// Complete TOML run configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pricing: PricingOptions,

    #[serde(default)]
    pub static_params: StaticParams,

    #[serde(default)]
    pub distribution: DistributionConfig,

    /// Attribute name → raw weight
    #[serde(default)]
    pub importance: BTreeMap<String, f64>,

    #[serde(default)]
    pub priority_tables: Vec<PriorityTable>,

    #[serde(default)]
    pub income_plans: Vec<IncomePlan>,
}

impl RunConfig {
    /// Parse a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;

        if let Err(errors) = config.static_params.validate() {
            for e in errors {
                warn!("{}: {}", path.display(), e);
            }
        }

        info!(
            path = %path.display(),
            attributes = config.importance.len(),
            priority_tables = config.priority_tables.len(),
            income_plans = config.income_plans.len(),
            "Loaded run configuration"
        );
        Ok(config)
    }

    /// Importance configuration with normalized weights
    pub fn importance_config(&self) -> ImportanceConfig {
        ImportanceConfig::from_weights(self.importance.iter().map(|(k, v)| (k.clone(), *v)))
    }

    /// Priority tables keyed by field, re-sequenced
    ///
    /// A later table for the same field replaces an earlier one.
    pub fn priority_table_map(&self) -> BTreeMap<String, PriorityTable> {
        self.priority_tables
            .iter()
            .map(|table| {
                let mut table = table.clone();
                table.resequence();
                (table.field.clone(), table)
            })
            .collect()
    }

    /// Assemble engine input for a set of units
    pub fn pricing_input(&self, units: Vec<Unit>) -> PricingInput {
        PricingInput {
            units,
            importance: self.importance_config(),
            priority_tables: self.priority_table_map(),
            distribution: self.distribution.clone(),
            params: self.static_params.clone(),
            income_plans: self.income_plans.clone(),
            strategy: self.pricing.strategy,
            calibration: self.pricing.calibration,
        }
    }
}

/// Load unit records from a JSON array file
pub fn load_units(path: &Path) -> Result<Vec<Unit>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::NotFound(format!("Unit records {}: {}", path.display(), e))
    })?;
    let units: Vec<Unit> = serde_json::from_str(&content)?;

    let mut seen = std::collections::BTreeSet::new();
    for unit in &units {
        if !seen.insert(unit.id.as_str()) {
            return Err(Error::InvalidInput(format!("Duplicate unit id: {}", unit.id)));
        }
    }

    info!(path = %path.display(), units = units.len(), "Loaded unit records");
    Ok(units)
}

/// Resolve the run configuration path
///
/// CLI argument, then the environment variable, then the platform default.
/// Only the platform default is checked for existence.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    let default = default_config_path()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    if default.exists() {
        Ok(default)
    } else {
        Err(Error::Config(format!("Config file not found: {}", default.display())))
    }
}

/// `<config dir>/upa/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("upa").join("config.toml"))
}
