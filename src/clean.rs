//! Cleaning pipeline for one decoded survey file.
//!
//! Order of operations:
//!
//! 1. resolve headers to canonical names ([`crate::resolve`]);
//! 2. turn blank cells and missing-value tokens (`NA`, `N/A`, `nan`) into nulls;
//! 3. strip non-ASCII characters from text cells;
//! 4. fold each configured field family into ranked slots
//!    ([`crate::consolidate`]);
//! 5. drop columns and rows that hold no values at all. Slot columns created
//!    in step 4 are kept even when empty, so every file carries the full
//!    `family_1..N` set.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::{
    config::{Config, Dialect},
    consolidate::{ConsolidationOutcome, FamilySpec, consolidate},
    data::{Table, Value, is_missing},
    resolve::{Resolution, resolve},
};

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub token_cap: usize,
    pub families: Vec<FamilySpec>,
    pub missing_tokens: HashSet<String>,
    pub strip_non_ascii: bool,
    pub drop_empty: bool,
}

impl CleanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            token_cap: config.fallback_token_cap,
            families: config.consolidation_families.clone(),
            missing_tokens: config.missing_tokens.iter().cloned().collect(),
            strip_non_ascii: config.strip_non_ascii,
            drop_empty: config.drop_empty,
        }
    }
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone)]
pub struct CleanReport {
    pub resolution: Resolution,
    pub missing_replaced: usize,
    pub cells_sanitized: usize,
    pub consolidations: Vec<(String, ConsolidationOutcome)>,
    pub dropped_columns: Vec<String>,
    pub dropped_rows: usize,
    /// Records that carried non-empty cells beyond the header width.
    pub truncated_records: usize,
    /// Non-empty cells discarded from those records.
    pub discarded_cells: usize,
}

impl CleanReport {
    pub fn log_summary(&self, table: &Table) {
        self.resolution.log_audit();
        if self.truncated_records > 0 {
            warn!(
                "{} record(s) had more cells than the header row; discarded {} non-empty cell(s)",
                self.truncated_records, self.discarded_cells
            );
        }
        for (family, outcome) in &self.consolidations {
            match outcome {
                ConsolidationOutcome::NoMatchingColumns => {
                    debug!("Family '{family}' not present; nothing to consolidate")
                }
                ConsolidationOutcome::AllBlank { dropped } => info!(
                    "Family '{family}' had {dropped} column(s) but no values; no slots created"
                ),
                ConsolidationOutcome::Consolidated { sources, slots } => info!(
                    "Consolidated {sources} '{family}' column(s) into {slots} ranked slot(s)"
                ),
            }
        }
        if !self.dropped_columns.is_empty() {
            info!(
                "Dropped {} empty column(s): {}",
                self.dropped_columns.len(),
                self.dropped_columns.join(", ")
            );
        }
        info!(
            "Replaced {} missing-value token(s), sanitized {} cell(s), dropped {} empty row(s); shape {} x {}",
            self.missing_replaced,
            self.cells_sanitized,
            self.dropped_rows,
            table.row_count(),
            table.column_count()
        );
    }
}

/// Runs the full pipeline over one file's decoded headers and records.
pub fn clean_table(
    headers: &[String],
    records: Vec<Vec<String>>,
    dialect: &Dialect,
    options: &CleanOptions,
) -> (Table, CleanReport) {
    let resolution = resolve(headers, &dialect.rules, options.token_cap);
    let (truncated_records, discarded_cells) = count_overflow(headers.len(), &records);
    let mut table = Table::from_text_rows(resolution.names(), records);

    let missing_replaced = standardize_missing(&mut table, &options.missing_tokens);
    let cells_sanitized = if options.strip_non_ascii {
        strip_non_ascii(&mut table)
    } else {
        0
    };

    let mut consolidations = Vec::with_capacity(options.families.len());
    let mut slot_columns = HashSet::new();
    for family in &options.families {
        let outcome = consolidate(&mut table, family);
        if let ConsolidationOutcome::Consolidated { slots, .. } = outcome {
            slot_columns.extend((1..=slots).map(|slot| family.slot_name(slot)));
        }
        consolidations.push((family.pattern.clone(), outcome));
    }

    let (dropped_columns, dropped_rows) = if options.drop_empty {
        drop_empty(&mut table, &slot_columns)
    } else {
        (Vec::new(), 0)
    };

    let report = CleanReport {
        resolution,
        missing_replaced,
        cells_sanitized,
        consolidations,
        dropped_columns,
        dropped_rows,
        truncated_records,
        discarded_cells,
    };
    (table, report)
}

/// Counts records with non-empty cells past `width`, and those cells.
fn count_overflow(width: usize, records: &[Vec<String>]) -> (usize, usize) {
    records
        .iter()
        .map(|record| {
            record
                .iter()
                .skip(width)
                .filter(|cell| !cell.trim().is_empty())
                .count()
        })
        .filter(|&extra| extra > 0)
        .fold((0, 0), |(records, cells), extra| (records + 1, cells + extra))
}

/// Nulls out whitespace-only cells and exact (trimmed) missing-value tokens.
pub fn standardize_missing(table: &mut Table, tokens: &HashSet<String>) -> usize {
    let mut replaced = 0;
    for cell in table.rows.iter_mut().flatten() {
        let Some(Value::Text(text)) = cell else {
            continue;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() || tokens.contains(trimmed) {
            *cell = None;
            replaced += 1;
        }
    }
    replaced
}

/// Removes non-ASCII characters from text cells; cells left empty become null.
pub fn strip_non_ascii(table: &mut Table) -> usize {
    let mut changed = 0;
    for cell in table.rows.iter_mut().flatten() {
        let Some(Value::Text(text)) = cell else {
            continue;
        };
        if text.is_ascii() {
            continue;
        }
        text.retain(|ch| ch.is_ascii());
        changed += 1;
        if text.trim().is_empty() {
            *cell = None;
        }
    }
    changed
}

/// Drops all-missing columns not listed in `keep`, then all-missing rows.
pub fn drop_empty(table: &mut Table, keep: &HashSet<String>) -> (Vec<String>, usize) {
    let width = table.column_count();
    let mut has_value: Vec<bool> = table
        .headers
        .iter()
        .map(|name| keep.contains(name))
        .collect();
    for row in &table.rows {
        for (idx, cell) in row.iter().enumerate().take(width) {
            if !is_missing(cell) {
                has_value[idx] = true;
            }
        }
    }
    let dropped_columns: Vec<String> = table
        .headers
        .iter()
        .zip(&has_value)
        .filter(|(_, keep)| !**keep)
        .map(|(name, _)| name.clone())
        .collect();
    if !dropped_columns.is_empty() {
        table.retain_columns(|idx, _| has_value[idx]);
    }

    let before = table.rows.len();
    table.rows.retain(|row| row.iter().any(|cell| !is_missing(cell)));
    (dropped_columns, before - table.rows.len())
}
