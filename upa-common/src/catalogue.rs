//! Attribute catalogue resolved once per pricing run
//!
//! Units carry free-form attribute maps. Before scoring, the selected
//! importance attributes are resolved against their priority tables into a
//! dense [`RankMatrix`] so the scorer works on plain integers.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::importance::ImportanceConfig;
use crate::priority::{rank, PriorityTable};
use crate::units::{AttributeValue, Unit};

/// One selected attribute with its resolved table
#[derive(Debug, Clone)]
pub struct CatalogueEntry {
    pub field: String,
    pub weight: f64,
    pub table: PriorityTable,
    /// Worst priority of the table (>= 1)
    pub max_rank: u32,
}

/// Selected attributes of a run, in importance-selection order
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalogue {
    entries: Vec<CatalogueEntry>,
    known_fields: BTreeSet<String>,
}

impl AttributeCatalogue {
    /// Resolve the catalogue for a unit list
    ///
    /// Each selected attribute uses its configured priority table. Attributes
    /// without one get a default ranging built from the distinct values found
    /// in `units`.
    pub fn resolve(
        units: &[Unit],
        importance: &ImportanceConfig,
        tables: &BTreeMap<String, PriorityTable>,
    ) -> Self {
        let known_fields: BTreeSet<String> = units
            .iter()
            .flat_map(|u| u.attribute_names().map(str::to_string).collect::<Vec<_>>())
            .collect();

        let entries = importance
            .selected()
            .iter()
            .map(|field| {
                if !units.is_empty() && !known_fields.contains(field) {
                    warn!(field = %field, "Selected attribute not present on any unit");
                }

                let table = match tables.get(field) {
                    Some(table) if !table.is_empty() => {
                        let mut table = table.clone();
                        table.resequence();
                        table
                    }
                    _ => {
                        let values: Vec<AttributeValue> =
                            units.iter().filter_map(|u| u.attribute(field)).collect();
                        debug!(field = %field, distinct_source = values.len(), "Using default ranging");
                        PriorityTable::from_values(field.clone(), values.iter())
                    }
                };

                CatalogueEntry {
                    field: field.clone(),
                    weight: importance.weight(field),
                    max_rank: table.max_priority(),
                    table,
                }
            })
            .collect();

        Self {
            entries,
            known_fields,
        }
    }

    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Every attribute name seen on at least one unit
    pub fn known_fields(&self) -> &BTreeSet<String> {
        &self.known_fields
    }

    /// Resolve ranks for every unit against every selected attribute
    pub fn rank_matrix(&self, units: &[Unit]) -> RankMatrix {
        let ranks = units
            .iter()
            .map(|unit| {
                self.entries
                    .iter()
                    .map(|entry| rank(unit, &entry.field, &entry.table))
                    .collect()
            })
            .collect();

        RankMatrix {
            ranks,
            max_ranks: self.entries.iter().map(|e| e.max_rank).collect(),
            weights: self.entries.iter().map(|e| e.weight).collect(),
        }
    }
}

/// Dense `units × attributes` rank table
#[derive(Debug, Clone, Default)]
pub struct RankMatrix {
    ranks: Vec<Vec<u32>>,
    max_ranks: Vec<u32>,
    weights: Vec<f64>,
}

impl RankMatrix {
    /// Ranks of one unit, one per attribute
    pub fn row(&self, unit_index: usize) -> Option<&[u32]> {
        self.ranks.get(unit_index).map(|r| r.as_slice())
    }

    pub fn max_ranks(&self) -> &[u32] {
        &self.max_ranks
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn unit_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.max_ranks.len()
    }
}
