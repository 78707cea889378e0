//! Unit (premises) records handed to the engine
//!
//! A unit is one sellable premises. Named fields (`floor`, `unit_number`,
//! `area`) and free-form custom fields are resolved through one lookup so the
//! rank resolver can treat them alike.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::numeric::positive_or_sentinel;

/// Sale status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Available,
    Sold,
}

impl UnitStatus {
    /// Parse status from a record string
    ///
    /// Accepts `available`/`free` and `sold` (case insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "available" | "free" => Some(UnitStatus::Available),
            "sold" => Some(UnitStatus::Sold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw attribute value as imported
///
/// Untagged so both `3` and `"3"` deserialize; numeric matching treats them
/// the same way (see [`AttributeValue::as_number`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value, coercing numeric strings
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) if n.is_finite() => Some(*n),
            AttributeValue::Number(_) => None,
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// String view used for non-numeric comparison
    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::Number(n) => format_number(*n),
            AttributeValue::Text(s) => s.trim().to_string(),
        }
    }

    /// Value-equality used by priority groups: numeric when both sides are
    /// numeric, otherwise trimmed string comparison
    pub fn matches(&self, other: &AttributeValue) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self.as_text() == other.as_text(),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Integers print without a trailing `.0` so `3` and `"3"` share a label
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One sellable premises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier assigned at import
    pub id: String,

    #[serde(default)]
    pub floor: i32,

    #[serde(default, alias = "unitNumber")]
    pub unit_number: String,

    /// Area in m² (coerced to the sentinel by [`Unit::effective_area`])
    #[serde(default)]
    pub area: f64,

    #[serde(default)]
    pub status: UnitStatus,

    /// Custom fields beyond the named ones
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,

    /// Last committed price per m², if any
    #[serde(default, alias = "price_per_sqm")]
    pub committed_price_per_sqm: Option<f64>,
}

impl Unit {
    pub fn new(id: impl Into<String>, floor: i32, unit_number: impl Into<String>, area: f64) -> Self {
        Self {
            id: id.into(),
            floor,
            unit_number: unit_number.into(),
            area,
            status: UnitStatus::Available,
            attributes: BTreeMap::new(),
            committed_price_per_sqm: None,
        }
    }

    /// Builder-style custom attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style status
    pub fn with_status(mut self, status: UnitStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_sold(&self) -> bool {
        self.status == UnitStatus::Sold
    }

    pub fn is_available(&self) -> bool {
        self.status == UnitStatus::Available
    }

    /// Area guarded against zero/invalid values
    pub fn effective_area(&self) -> f64 {
        positive_or_sentinel(self.area, "area")
    }

    /// Resolve a named or custom attribute
    ///
    /// Named fields win over custom fields of the same name.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "floor" => Some(AttributeValue::Number(self.floor as f64)),
            "unit_number" | "unitNumber" => Some(AttributeValue::Text(self.unit_number.clone())),
            "area" => Some(AttributeValue::Number(self.area)),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// Names of all attributes this unit can resolve
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        ["floor", "unit_number", "area"]
            .into_iter()
            .chain(self.attributes.keys().map(|k| k.as_str()))
    }

    /// Transition available → sold
    ///
    /// Returns `false` (and changes nothing) when the unit is already sold.
    pub fn mark_sold(&mut self) -> bool {
        if self.is_sold() {
            return false;
        }
        self.status = UnitStatus::Sold;
        true
    }

    /// Record a committed price per m²
    pub fn commit_price(&mut self, price_per_sqm: f64) {
        self.committed_price_per_sqm = Some(price_per_sqm);
    }
}

/// Transition every unit whose id is in `ids` to sold
///
/// Returns the number of units that actually changed status.
pub fn mark_sold(units: &mut [Unit], ids: &[&str]) -> usize {
    units
        .iter_mut()
        .filter(|u| ids.contains(&u.id.as_str()))
        .map(|u| u.mark_sold())
        .filter(|changed| *changed)
        .count()
}
