//! Priority tables and rank resolution
//!
//! A priority table groups the raw values of one attribute into ranked
//! groups. Priority 1 is the best group. After every edit the priorities of a
//! table form the contiguous sequence `1..=k`.
//!
//! # Rank resolution
//!
//! [`rank`] maps a unit's raw value to the priority of the first group that
//! contains it:
//! 1. Numeric (or numeric-looking) values compare numerically, so `3` and `"3"`
//!    resolve to the same group
//! 2. Other values compare as trimmed strings
//! 3. Unmatched values get the worst priority in the table (1 for an empty table)

use serde::{Deserialize, Serialize};

use crate::units::{AttributeValue, Unit};

/// One ranked group of raw values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityGroup {
    /// Display name
    pub name: String,

    /// Raw values mapped to this group
    pub values: Vec<AttributeValue>,

    /// 1 = best
    pub priority: u32,
}

impl PriorityGroup {
    pub fn new(name: impl Into<String>, values: Vec<AttributeValue>, priority: u32) -> Self {
        Self {
            name: name.into(),
            values,
            priority,
        }
    }

    /// Single-value group named after its value
    pub fn single(value: AttributeValue, priority: u32) -> Self {
        Self {
            name: value.as_text(),
            values: vec![value],
            priority,
        }
    }

    /// A group holding more than one value
    pub fn is_merged(&self) -> bool {
        self.values.len() > 1
    }

    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.iter().any(|v| v.matches(value))
    }
}

/// Ordered grouping of one attribute's values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriorityTable {
    /// Attribute this table ranks
    pub field: String,

    #[serde(default)]
    groups: Vec<PriorityGroup>,
}

impl PriorityTable {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            groups: Vec::new(),
        }
    }

    /// Build from explicit groups, re-sequencing their priorities
    pub fn with_groups(field: impl Into<String>, groups: Vec<PriorityGroup>) -> Self {
        let mut table = Self {
            field: field.into(),
            groups,
        };
        table.resequence();
        table
    }

    /// One group per distinct value, ascending (numbers before strings)
    ///
    /// This is the default ranging offered for an attribute with no saved table.
    pub fn from_values<'a, I>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = &'a AttributeValue>,
    {
        let mut distinct: Vec<AttributeValue> = Vec::new();
        for value in values {
            if !distinct.iter().any(|d| d.matches(value)) {
                distinct.push(value.clone());
            }
        }

        distinct.sort_by(|a, b| match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.as_text().cmp(&b.as_text()),
        });

        let groups = distinct
            .into_iter()
            .enumerate()
            .map(|(i, v)| PriorityGroup::single(v, i as u32 + 1))
            .collect();

        Self::with_groups(field, groups)
    }

    /// Groups in priority order
    pub fn groups(&self) -> &[PriorityGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Worst priority in the table, 1 when empty
    pub fn max_priority(&self) -> u32 {
        self.groups.iter().map(|g| g.priority).max().unwrap_or(1).max(1)
    }

    /// Priority of the group holding `value`, if any
    pub fn priority_of(&self, value: &AttributeValue) -> Option<u32> {
        if value.as_number().is_some() {
            if let Some(group) = self
                .groups
                .iter()
                .find(|g| g.values.iter().any(|v| v.as_number() == value.as_number()))
            {
                return Some(group.priority);
            }
        }

        let text = value.as_text();
        self.groups
            .iter()
            .find(|g| g.values.iter().any(|v| v.as_text() == text))
            .map(|g| g.priority)
    }

    /// Insert a group at `priority`, shifting later groups down
    ///
    /// Priorities past the end append. Values already present in another group
    /// are moved into the new group.
    pub fn insert(&mut self, mut group: PriorityGroup, priority: u32) {
        for existing in &mut self.groups {
            existing.values.retain(|v| !group.contains(v));
        }
        self.groups.retain(|g| !g.values.is_empty());

        let index = (priority.max(1) as usize - 1).min(self.groups.len());
        group.priority = index as u32 + 1;
        self.groups.insert(index, group);
        self.renumber_by_position();
    }

    /// Delete the group with `priority`
    ///
    /// A merged group is split back into single-value groups at priority 1
    /// before re-sequencing. Returns the removed group.
    pub fn delete(&mut self, priority: u32) -> Option<PriorityGroup> {
        let index = self.groups.iter().position(|g| g.priority == priority)?;
        let removed = self.groups.remove(index);

        if removed.is_merged() {
            let restored: Vec<PriorityGroup> = removed
                .values
                .iter()
                .cloned()
                .map(|v| PriorityGroup::single(v, 1))
                .collect();
            // Restored members precede the remaining groups at equal priority
            for (offset, group) in restored.into_iter().enumerate() {
                self.groups.insert(offset, group);
            }
        }

        self.resequence();
        Some(removed)
    }

    /// Move the group at priority `from` to priority `to`
    pub fn reorder(&mut self, from: u32, to: u32) -> bool {
        let Some(index) = self.groups.iter().position(|g| g.priority == from) else {
            return false;
        };
        let group = self.groups.remove(index);
        let target = (to.max(1) as usize - 1).min(self.groups.len());
        self.groups.insert(target, group);
        self.renumber_by_position();
        true
    }

    /// Merge the groups with the given priorities into one group
    ///
    /// The merged group takes the best (lowest) priority among its members.
    pub fn merge(&mut self, priorities: &[u32], name: impl Into<String>) -> bool {
        let members: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| priorities.contains(&g.priority))
            .map(|(i, _)| i)
            .collect();

        if members.len() < 2 {
            return false;
        }

        let best = members
            .iter()
            .map(|&i| self.groups[i].priority)
            .min()
            .unwrap_or(1);
        let values: Vec<AttributeValue> = members
            .iter()
            .flat_map(|&i| self.groups[i].values.clone())
            .collect();

        let first = members[0];
        for &i in members.iter().rev() {
            self.groups.remove(i);
        }
        self.groups
            .insert(first.min(self.groups.len()), PriorityGroup::new(name, values, best));
        self.resequence();
        true
    }

    /// Restore the `1..=k` invariant
    ///
    /// Orders by current priority (stable, so equal priorities keep their
    /// position) and renumbers.
    pub fn resequence(&mut self) {
        self.groups.sort_by_key(|g| g.priority);
        self.renumber_by_position();
    }

    fn renumber_by_position(&mut self) {
        for (i, group) in self.groups.iter_mut().enumerate() {
            group.priority = i as u32 + 1;
        }
    }
}

/// Resolve a unit's rank for `field` against `table`
///
/// Never fails: a missing field or unmatched value resolves to the table's
/// worst priority, an empty table to 1.
pub fn rank(unit: &Unit, field: &str, table: &PriorityTable) -> u32 {
    unit.attribute(field)
        .as_ref()
        .and_then(|value| table.priority_of(value))
        .unwrap_or_else(|| table.max_priority())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floors_table() -> PriorityTable {
        PriorityTable::with_groups(
            "floor",
            vec![
                PriorityGroup::single(1.into(), 1),
                PriorityGroup::single(2.into(), 2),
                PriorityGroup::single(3.into(), 3),
            ],
        )
    }

    fn assert_contiguous(table: &PriorityTable) {
        let mut priorities: Vec<u32> = table.groups().iter().map(|g| g.priority).collect();
        priorities.sort_unstable();
        let expected: Vec<u32> = (1..=table.len() as u32).collect();
        assert_eq!(priorities, expected, "priorities must be 1..=k");
    }

    #[test]
    fn test_rank_numeric_and_string_forms() {
        let table = floors_table();
        let numeric = Unit::new("a", 2, "21", 40.0);
        let text = Unit::new("b", 0, "x", 40.0).with_attribute("level", "2");
        let level_table = PriorityTable::with_groups(
            "level",
            vec![PriorityGroup::single(AttributeValue::Number(2.0), 1)],
        );

        assert_eq!(rank(&numeric, "floor", &table), 2);
        assert_eq!(rank(&text, "level", &level_table), 1);
    }

    #[test]
    fn test_rank_text_values() {
        let table = PriorityTable::with_groups(
            "view",
            vec![
                PriorityGroup::single("sea".into(), 1),
                PriorityGroup::new("inner", vec!["yard".into(), "wall".into()], 2),
            ],
        );
        let unit = Unit::new("a", 1, "1", 40.0).with_attribute("view", "wall");
        assert_eq!(rank(&unit, "view", &table), 2);
    }

    #[test]
    fn test_unmatched_gets_worst_priority() {
        let table = floors_table();
        let unit = Unit::new("a", 9, "91", 40.0);
        assert_eq!(rank(&unit, "floor", &table), 3);
        assert_eq!(rank(&unit, "missing", &table), 3);
    }

    #[test]
    fn test_empty_table_ranks_one() {
        let table = PriorityTable::new("floor");
        let unit = Unit::new("a", 5, "51", 40.0);
        assert_eq!(rank(&unit, "floor", &table), 1);
        assert_eq!(table.max_priority(), 1);
    }

    #[test]
    fn test_from_values_sorted_distinct() {
        let values: Vec<AttributeValue> =
            vec![3.into(), "penthouse".into(), 1.into(), "3".into(), 2.into()];
        let table = PriorityTable::from_values("floor", values.iter());
        let names: Vec<&str> = table.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["1", "2", "3", "penthouse"]);
        assert_contiguous(&table);
    }

    #[test]
    fn test_insert_shifts_and_stays_contiguous() {
        let mut table = floors_table();
        table.insert(PriorityGroup::single(7.into(), 0), 2);
        assert_contiguous(&table);
        assert_eq!(table.priority_of(&7.into()), Some(2));
        assert_eq!(table.priority_of(&2.into()), Some(3));

        table.insert(PriorityGroup::single(8.into(), 0), 99);
        assert_contiguous(&table);
        assert_eq!(table.priority_of(&8.into()), Some(5));
    }

    #[test]
    fn test_insert_moves_existing_value() {
        let mut table = floors_table();
        table.insert(PriorityGroup::new("low", vec![1.into(), 2.into()], 0), 1);
        assert_contiguous(&table);
        assert_eq!(table.len(), 2);
        assert_eq!(table.priority_of(&2.into()), Some(1));
        assert_eq!(table.priority_of(&3.into()), Some(2));
    }

    #[test]
    fn test_reorder_stays_contiguous() {
        let mut table = floors_table();
        assert!(table.reorder(3, 1));
        assert_contiguous(&table);
        assert_eq!(table.priority_of(&3.into()), Some(1));
        assert_eq!(table.priority_of(&1.into()), Some(2));
        assert!(!table.reorder(10, 1));
    }

    #[test]
    fn test_merge_then_delete_restores_members() {
        let mut table = floors_table();
        table.insert(PriorityGroup::single(4.into(), 0), 4);
        assert!(table.merge(&[2, 3], "middle"));
        assert_contiguous(&table);
        assert_eq!(table.len(), 3);
        assert_eq!(table.priority_of(&3.into()), Some(2));

        let removed = table.delete(2).unwrap();
        assert!(removed.is_merged());
        assert_contiguous(&table);
        assert_eq!(table.len(), 4);
        // Restored members are rank-1 entries before re-sequencing
        assert_eq!(table.priority_of(&2.into()), Some(1));
        assert_eq!(table.priority_of(&3.into()), Some(2));
        assert_eq!(table.priority_of(&1.into()), Some(3));
        assert_eq!(table.priority_of(&4.into()), Some(4));
    }

    #[test]
    fn test_delete_single_group() {
        let mut table = floors_table();
        table.delete(1);
        assert_contiguous(&table);
        assert_eq!(table.priority_of(&2.into()), Some(1));
        assert!(table.delete(42).is_none());
    }
}
