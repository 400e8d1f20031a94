//! Compacts repeated columns of one logical field into ranked slots.
//!
//! Surveys export ranked answers ("most significant barrier") as several
//! columns that the resolver names `major_barrier`, `major_barrier_2`, and so
//! on. [`consolidate`] folds such a family into exactly `max_slots` columns
//! `major_barrier_1..N`, keeping each row's answers in their original column
//! order with blanks squeezed out.

use serde::{Deserialize, Serialize};

use crate::data::{Row, Table, Value, is_missing};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilySpec {
    pub pattern: String,
    pub max_slots: usize,
}

impl FamilySpec {
    pub fn new(pattern: &str, max_slots: usize) -> Self {
        Self {
            pattern: pattern.to_string(),
            max_slots,
        }
    }

    pub fn slot_name(&self, slot: usize) -> String {
        format!("{}_{slot}", self.pattern)
    }
}

/// True when `name` is `family` itself or `family_<digits>`.
pub fn is_family_member(name: &str, family: &str) -> bool {
    if name == family {
        return true;
    }
    name.strip_prefix(family)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| !suffix.is_empty() && suffix.chars().all(|ch| ch.is_ascii_digit()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    /// No column belongs to the family; the table is untouched.
    NoMatchingColumns,
    /// Family columns existed but held no values; they were dropped.
    AllBlank { dropped: usize },
    Consolidated { sources: usize, slots: usize },
}

/// Replaces the columns of `family` in `table` with ranked slot columns.
pub fn consolidate(table: &mut Table, family: &FamilySpec) -> ConsolidationOutcome {
    let members: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, name)| is_family_member(name, &family.pattern))
        .map(|(idx, _)| idx)
        .collect();
    let Some(&insert_at) = members.first() else {
        return ConsolidationOutcome::NoMatchingColumns;
    };

    let slots: Vec<Vec<Option<Value>>> = table
        .rows
        .iter()
        .map(|row| compact_row(row, &members, family.max_slots))
        .collect();
    let any_value = slots.iter().flatten().any(Option::is_some);

    let mut member_mask = vec![false; table.headers.len()];
    for &idx in &members {
        member_mask[idx] = true;
    }

    if !any_value {
        table.retain_columns(|idx, _| !member_mask[idx]);
        return ConsolidationOutcome::AllBlank {
            dropped: members.len(),
        };
    }

    let mut headers = Vec::with_capacity(table.headers.len() + family.max_slots);
    for (idx, name) in table.headers.iter().enumerate() {
        if idx == insert_at {
            headers.extend((1..=family.max_slots).map(|slot| family.slot_name(slot)));
        }
        if !member_mask[idx] {
            headers.push(name.clone());
        }
    }

    let rows = table
        .rows
        .iter()
        .zip(slots)
        .map(|(row, slot_values)| {
            let mut rebuilt: Row = Vec::with_capacity(headers.len());
            let mut slot_values = Some(slot_values);
            for (idx, cell) in row.iter().enumerate() {
                if idx == insert_at
                    && let Some(values) = slot_values.take()
                {
                    rebuilt.extend(values);
                }
                if !member_mask.get(idx).copied().unwrap_or(false) {
                    rebuilt.push(cell.clone());
                }
            }
            rebuilt
        })
        .collect();

    table.headers = headers;
    table.rows = rows;
    ConsolidationOutcome::Consolidated {
        sources: members.len(),
        slots: family.max_slots,
    }
}

/// First `max_slots` non-blank values among `members`, padded with nulls.
fn compact_row(row: &Row, members: &[usize], max_slots: usize) -> Vec<Option<Value>> {
    let mut values: Vec<Option<Value>> = members
        .iter()
        .filter_map(|&idx| row.get(idx))
        .filter(|cell| !is_missing(cell))
        .take(max_slots)
        .cloned()
        .collect();
    values.resize(max_slots, None);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Option<Value> {
        Some(Value::from(value))
    }

    fn table(headers: &[&str], rows: Vec<Row>) -> Table {
        Table::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn family_membership_requires_numeric_suffix() {
        assert!(is_family_member("major_barrier", "major_barrier"));
        assert!(is_family_member("major_barrier_12", "major_barrier"));
        assert!(!is_family_member("major_barrier_", "major_barrier"));
        assert!(!is_family_member("major_barrier_x", "major_barrier"));
        assert!(!is_family_member("major_barriers", "major_barrier"));
    }

    #[test]
    fn compaction_preserves_rank_order() {
        let mut t = table(
            &["id", "b", "b_2", "b_3", "b_4"],
            vec![vec![text("1"), None, text("B"), text("A"), None]],
        );
        let outcome = consolidate(&mut t, &FamilySpec::new("b", 3));
        assert_eq!(
            outcome,
            ConsolidationOutcome::Consolidated {
                sources: 4,
                slots: 3
            }
        );
        assert_eq!(t.headers, vec!["id", "b_1", "b_2", "b_3"]);
        assert_eq!(t.rows[0], vec![text("1"), text("B"), text("A"), None]);
    }

    #[test]
    fn whitespace_cells_count_as_blank_and_extra_values_are_dropped() {
        let mut t = table(
            &["b", "b_2", "b_3", "other"],
            vec![vec![text("  "), text("X"), text("Y"), text("keep")]],
        );
        consolidate(&mut t, &FamilySpec::new("b", 1));
        assert_eq!(t.headers, vec!["b_1", "other"]);
        assert_eq!(t.rows[0], vec![text("X"), text("keep")]);
    }

    #[test]
    fn slots_replace_family_at_first_member_position() {
        let mut t = table(
            &["a", "b", "c", "b_2"],
            vec![vec![text("1"), text("x"), text("2"), text("y")]],
        );
        consolidate(&mut t, &FamilySpec::new("b", 2));
        assert_eq!(t.headers, vec!["a", "b_1", "b_2", "c"]);
        assert_eq!(t.rows[0], vec![text("1"), text("x"), text("y"), text("2")]);
    }

    #[test]
    fn missing_family_is_a_no_op() {
        let mut t = table(&["a"], vec![vec![text("1")]]);
        let before = t.clone();
        assert_eq!(
            consolidate(&mut t, &FamilySpec::new("b", 3)),
            ConsolidationOutcome::NoMatchingColumns
        );
        assert_eq!(t, before);
    }

    #[test]
    fn all_blank_family_creates_no_slots() {
        let mut t = table(
            &["a", "b", "b_2"],
            vec![vec![text("1"), None, text(" ")], vec![text("2"), None, None]],
        );
        let outcome = consolidate(&mut t, &FamilySpec::new("b", 3));
        assert_eq!(outcome, ConsolidationOutcome::AllBlank { dropped: 2 });
        assert_eq!(t.headers, vec!["a"]);
        assert!(t.rows.iter().all(|row| row.len() == 1));
    }
}
