//! # UPA Common Library
//!
//! Unit pricing allocation engine shared by the UPA tools:
//! - Unit records and status transitions
//! - Importance weights and per-attribute priority tables
//! - Similarity scoring against sold comparables
//! - Distribution curves and the mixing pipeline
//! - Spread/scope calibration and budget allocation
//! - Income-plan base price interpolation
//! - Run configuration loading

pub mod allocation;
pub mod calibration;
pub mod catalogue;
pub mod config;
pub mod distribution;
pub mod error;
pub mod importance;
pub mod income_plan;
pub mod mixing;
pub mod numeric;
pub mod params;
pub mod pipeline;
pub mod priority;
pub mod scoring;
pub mod units;

pub use allocation::PricingStrategy;
pub use calibration::CalibrationMode;
pub use config::RunConfig;
pub use distribution::{Distribution, DistributionConfig};
pub use error::{Error, Result};
pub use importance::ImportanceConfig;
pub use income_plan::IncomePlan;
pub use params::{OversoldMethod, StaticParams};
pub use pipeline::{commit_prices, price_units, CommittedPrice, PriceRow, PriceTable, PricingInput};
pub use priority::{PriorityGroup, PriorityTable};
pub use units::{AttributeValue, Unit, UnitStatus};
