//! Importance configuration: which attributes drive the score and how much
//!
//! Weights are renormalized after every edit so that they always sum to 1
//! while at least one attribute is selected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selected attributes and their weights
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportanceConfig {
    /// Selected attribute names, in selection order
    #[serde(default)]
    selected: Vec<String>,

    /// Weight per selected attribute
    #[serde(default)]
    weights: BTreeMap<String, f64>,
}

impl ImportanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, weight)` pairs, normalizing once at the end
    pub fn from_weights<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut config = Self::default();
        for (name, weight) in pairs {
            let name = name.into();
            if !config.selected.contains(&name) {
                config.selected.push(name.clone());
            }
            config.weights.insert(name, sanitize_weight(weight));
        }
        config.normalize();
        config
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, field: &str) -> bool {
        self.selected.iter().any(|s| s == field)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Normalized weight of a field (0 when not selected)
    pub fn weight(&self, field: &str) -> f64 {
        self.weights.get(field).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Select a field; returns `false` if it was already selected
    ///
    /// The new field starts at the mean of the current weights (1.0 for the
    /// first field) before renormalization.
    pub fn select(&mut self, field: &str) -> bool {
        if self.is_selected(field) {
            return false;
        }
        let initial = if self.selected.is_empty() {
            1.0
        } else {
            self.weights.values().sum::<f64>() / self.selected.len() as f64
        };
        self.selected.push(field.to_string());
        self.weights.insert(field.to_string(), sanitize_weight(initial));
        self.normalize();
        true
    }

    /// Deselect a field; returns `false` if it was not selected
    pub fn deselect(&mut self, field: &str) -> bool {
        if !self.is_selected(field) {
            return false;
        }
        self.selected.retain(|s| s != field);
        self.weights.remove(field);
        self.normalize();
        true
    }

    /// Flip selection of a field; returns the new selection state
    pub fn toggle(&mut self, field: &str) -> bool {
        if self.is_selected(field) {
            self.deselect(field);
            false
        } else {
            self.select(field);
            true
        }
    }

    /// Set the raw weight of a selected field and renormalize
    ///
    /// Unselected fields are selected first.
    pub fn set_weight(&mut self, field: &str, weight: f64) {
        if !self.is_selected(field) {
            self.selected.push(field.to_string());
        }
        self.weights.insert(field.to_string(), sanitize_weight(weight));
        self.normalize();
    }

    /// Divide every weight by the running total
    ///
    /// All-zero weights become uniform. Weights of unselected names are dropped.
    pub fn normalize(&mut self) {
        let selected = &self.selected;
        self.weights.retain(|k, _| selected.contains(k));
        for name in &self.selected {
            self.weights.entry(name.clone()).or_insert(0.0);
        }

        if self.selected.is_empty() {
            return;
        }

        let total: f64 = self.weights.values().sum();
        if total > 0.0 && total.is_finite() {
            for w in self.weights.values_mut() {
                *w /= total;
            }
        } else {
            let uniform = 1.0 / self.selected.len() as f64;
            for w in self.weights.values_mut() {
                *w = uniform;
            }
        }
    }

    /// Sum of weights (1 when non-empty, 0 otherwise)
    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
