//! Declared cross-dialect aliases for fields that feature derivation reads.
//!
//! Each survey year names some of the same questions differently (`time_ly`
//! in 2020, `time_q4_2020` in 2021). The alias table states, per logical
//! field, which canonical column carries it in each dialect. Nothing here is
//! inferred: a field the table does not bind, or binds to a column the
//! dialect's resolved schema lacks, is reported and treated as absent.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::{NormalizeError, Result},
    rules::{DIALECT_2020, DIALECT_2021, is_canonical_token},
};

pub mod fields {
    pub const BIRTH_YEAR: &str = "birth_year";
    pub const REMOTE_TIME_PRIOR: &str = "remote_time_prior";
    pub const REMOTE_TIME_PRIOR_PREFERRED: &str = "remote_time_prior_preferred";
    pub const REMOTE_TIME_CURRENT: &str = "remote_time_current";
    pub const REMOTE_TIME_CURRENT_PREFERRED: &str = "remote_time_current_preferred";
    pub const REMOTE_TIME_FUTURE_PREFERRED: &str = "remote_time_future_preferred";
    pub const ORG_ENCOURAGED: &str = "org_encouraged";
    pub const ORG_PREPARED: &str = "org_prepared";
    pub const PRODUCTIVITY: &str = "productivity";
    pub const COMMUTE_TIME: &str = "commute_time";
    pub const FAMILY_TIME: &str = "family_time";
    pub const CARING_TIME: &str = "caring_time";
    pub const TOP_BARRIER: &str = "top_barrier";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasSpec {
    pub field: String,
    /// Dialect name to canonical column.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl AliasSpec {
    fn uniform(field: &str, column: &str) -> Self {
        Self::per_dialect(field, column, column)
    }

    fn per_dialect(field: &str, column_2020: &str, column_2021: &str) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(DIALECT_2020.to_string(), column_2020.to_string());
        columns.insert(DIALECT_2021.to_string(), column_2021.to_string());
        Self {
            field: field.to_string(),
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<AliasSpec>,
}

impl AliasTable {
    /// Validates that every field is named once and no dialect column is
    /// claimed by two fields.
    pub fn new(entries: Vec<AliasSpec>) -> Result<Self> {
        validate_aliases(&entries)?;
        Ok(Self { entries })
    }

    pub fn builtin() -> Self {
        use fields::*;
        Self {
            entries: vec![
                AliasSpec::uniform(BIRTH_YEAR, "birth_year"),
                AliasSpec::per_dialect(REMOTE_TIME_PRIOR, "time_ly", "time_q4_2020"),
                AliasSpec::per_dialect(
                    REMOTE_TIME_PRIOR_PREFERRED,
                    "pref_time_ly",
                    "pref_time_q4_2020",
                ),
                AliasSpec::per_dialect(REMOTE_TIME_CURRENT, "time_3m", "time_rem_2021"),
                AliasSpec::per_dialect(
                    REMOTE_TIME_CURRENT_PREFERRED,
                    "pref_time_3m",
                    "pref_time_2021",
                ),
                AliasSpec::uniform(REMOTE_TIME_FUTURE_PREFERRED, "pref_time_future"),
                AliasSpec::uniform(ORG_ENCOURAGED, "org_encouraged"),
                AliasSpec::uniform(ORG_PREPARED, "org_prepared"),
                AliasSpec::uniform(PRODUCTIVITY, "productivity"),
                AliasSpec::uniform(COMMUTE_TIME, "commute_time"),
                AliasSpec::uniform(FAMILY_TIME, "family_time"),
                AliasSpec::uniform(CARING_TIME, "caring_time"),
                AliasSpec::per_dialect(TOP_BARRIER, "major_barrier_1", "barriers_major_1"),
            ],
        }
    }

    pub fn entries(&self) -> &[AliasSpec] {
        &self.entries
    }
}

fn validate_aliases(entries: &[AliasSpec]) -> Result<()> {
    let mut fields = HashSet::new();
    let mut claims: HashMap<(&str, &str), &str> = HashMap::new();
    for entry in entries {
        if entry.field.trim().is_empty() {
            return Err(NormalizeError::InvalidConfig(
                "alias field name cannot be empty".to_string(),
            ));
        }
        if !fields.insert(entry.field.as_str()) {
            return Err(NormalizeError::InvalidConfig(format!(
                "alias field '{}' is declared more than once",
                entry.field
            )));
        }
        for (dialect, column) in &entry.columns {
            if !is_canonical_token(column) {
                return Err(NormalizeError::InvalidConfig(format!(
                    "alias '{}' maps dialect '{dialect}' to invalid column '{column}'",
                    entry.field
                )));
            }
            if let Some(previous) =
                claims.insert((dialect.as_str(), column.as_str()), entry.field.as_str())
            {
                return Err(NormalizeError::InvalidConfig(format!(
                    "column '{column}' of dialect '{dialect}' is claimed by both '{previous}' and '{}'",
                    entry.field
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBinding {
    Present(String),
    Absent,
}

impl FieldBinding {
    pub fn column(&self) -> Option<&str> {
        match self {
            FieldBinding::Present(column) => Some(column),
            FieldBinding::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    NotDeclared,
    ColumnNotFound(String),
}

/// A field expected in every dialect that one dialect cannot supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappableCrossDialectField {
    pub dialect: String,
    pub field: String,
    pub reason: MissingReason,
}

impl UnmappableCrossDialectField {
    pub fn describe(&self) -> String {
        match &self.reason {
            MissingReason::NotDeclared => format!(
                "field '{}' has no alias declared for dialect '{}'",
                self.field, self.dialect
            ),
            MissingReason::ColumnNotFound(column) => format!(
                "field '{}' expects column '{column}' in dialect '{}' but it is not present",
                self.field, self.dialect
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: String,
    pub bindings: BTreeMap<String, FieldBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciledSchema {
    pub dialects: Vec<String>,
    pub fields: Vec<FieldMapping>,
    pub warnings: Vec<UnmappableCrossDialectField>,
}

impl ReconciledSchema {
    pub fn column_for(&self, field: &str, dialect: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|mapping| mapping.field == field)
            .and_then(|mapping| mapping.bindings.get(dialect))
            .and_then(FieldBinding::column)
    }

    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning.describe());
        }
    }
}

/// Binds every alias field to a column in each of `schemas`
/// (`(dialect, resolved headers)` pairs), in declaration order.
pub fn reconcile<S>(aliases: &AliasTable, schemas: &[(&str, &[S])]) -> ReconciledSchema
where
    S: AsRef<str>,
{
    let available: Vec<(&str, HashSet<&str>)> = schemas
        .iter()
        .map(|(dialect, headers)| (*dialect, headers.iter().map(AsRef::as_ref).collect()))
        .collect();

    let mut warnings = Vec::new();
    let fields = aliases
        .entries()
        .iter()
        .map(|entry| {
            let mut bindings = BTreeMap::new();
            for (dialect, headers) in &available {
                let binding = match entry.columns.get(*dialect) {
                    None => {
                        warnings.push(UnmappableCrossDialectField {
                            dialect: dialect.to_string(),
                            field: entry.field.clone(),
                            reason: MissingReason::NotDeclared,
                        });
                        FieldBinding::Absent
                    }
                    Some(column) if headers.contains(column.as_str()) => {
                        FieldBinding::Present(column.clone())
                    }
                    Some(column) => {
                        warnings.push(UnmappableCrossDialectField {
                            dialect: dialect.to_string(),
                            field: entry.field.clone(),
                            reason: MissingReason::ColumnNotFound(column.clone()),
                        });
                        FieldBinding::Absent
                    }
                };
                bindings.insert(dialect.to_string(), binding);
            }
            FieldMapping {
                field: entry.field.clone(),
                bindings,
            }
        })
        .collect();

    ReconciledSchema {
        dialects: schemas.iter().map(|(dialect, _)| dialect.to_string()).collect(),
        fields,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(field: &str, columns: &[(&str, &str)]) -> AliasSpec {
        AliasSpec {
            field: field.to_string(),
            columns: columns
                .iter()
                .map(|(d, c)| (d.to_string(), c.to_string()))
                .collect(),
        }
    }

    #[test]
    fn builtin_table_is_valid() {
        let builtin = AliasTable::builtin();
        AliasTable::new(builtin.entries().to_vec()).expect("builtin aliases validate");
    }

    #[test]
    fn differently_named_columns_bind_to_one_field() {
        let table = AliasTable::new(vec![alias(
            "remote_time_prior",
            &[("2020", "time_ly"), ("2021", "time_q4_2020")],
        )])
        .unwrap();
        let h2020 = vec!["id".to_string(), "time_ly".to_string()];
        let h2021 = vec!["id".to_string(), "time_q4_2020".to_string()];
        let schema = reconcile(&table, &[("2020", &h2020[..]), ("2021", &h2021[..])]);
        assert!(schema.warnings.is_empty());
        assert_eq!(schema.column_for("remote_time_prior", "2020"), Some("time_ly"));
        assert_eq!(
            schema.column_for("remote_time_prior", "2021"),
            Some("time_q4_2020")
        );
    }

    #[test]
    fn missing_column_is_absent_with_warning() {
        let table = AliasTable::new(vec![alias(
            "org_prepared",
            &[("2020", "org_prepared"), ("2021", "org_prepared")],
        )])
        .unwrap();
        let h2020 = vec!["org_prepared".to_string()];
        let h2021 = vec!["org_prepared_future".to_string()];
        let schema = reconcile(&table, &[("2020", &h2020[..]), ("2021", &h2021[..])]);
        assert_eq!(schema.column_for("org_prepared", "2021"), None);
        assert_eq!(
            schema.warnings,
            vec![UnmappableCrossDialectField {
                dialect: "2021".to_string(),
                field: "org_prepared".to_string(),
                reason: MissingReason::ColumnNotFound("org_prepared".to_string()),
            }]
        );
    }

    #[test]
    fn undeclared_dialect_is_absent_with_warning() {
        let table = AliasTable::new(vec![alias("gender", &[("2020", "gender")])]).unwrap();
        let headers = vec!["gender".to_string()];
        let schema = reconcile(&table, &[("2021", &headers[..])]);
        assert_eq!(schema.warnings[0].reason, MissingReason::NotDeclared);
        assert_eq!(schema.column_for("gender", "2021"), None);
    }

    #[test]
    fn double_claims_are_rejected() {
        let err = AliasTable::new(vec![
            alias("a", &[("2020", "time_ly")]),
            alias("b", &[("2020", "time_ly")]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("claimed by both 'a' and 'b'"));
        assert!(AliasTable::new(vec![alias("a", &[]), alias("a", &[])]).is_err());
    }
}
