//! Derived analysis columns computed from a cleaned table.
//!
//! Source columns are looked up through the [`ReconciledSchema`], so the same
//! derivation runs unchanged over every dialect. A field that is absent in a
//! dialect simply yields null derived values.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    config::Dialect,
    data::{Table, Value, is_missing},
    reconcile::{ReconciledSchema, fields},
};

pub const AGE: &str = "age";
pub const REMOTE_PCT: &str = "remote_pct";
pub const WORK_MODE: &str = "work_mode";
pub const ORG_ENCOURAGED_SCORE: &str = "org_encouraged_score";
pub const ORG_PREPARED_SCORE: &str = "org_prepared_score";
pub const MORALE_SCORE: &str = "morale_score";
pub const ENGAGEMENT_SCORE: &str = "engagement_score";
pub const TOTAL_CARE_LOAD: &str = "total_care_load";
pub const BURNOUT_RISK: &str = "burnout_risk";
pub const PROD_SCORE: &str = "prod_score";

pub const DERIVED_COLUMNS: [&str; 10] = [
    AGE,
    REMOTE_PCT,
    WORK_MODE,
    ORG_ENCOURAGED_SCORE,
    ORG_PREPARED_SCORE,
    MORALE_SCORE,
    ENGAGEMENT_SCORE,
    TOTAL_CARE_LOAD,
    BURNOUT_RISK,
    PROD_SCORE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkMode {
    Remote,
    Hybrid,
    OnSite,
}

impl WorkMode {
    pub fn from_remote_pct(pct: i64) -> Self {
        if pct >= 80 {
            WorkMode::Remote
        } else if pct <= 20 {
            WorkMode::OnSite
        } else {
            WorkMode::Hybrid
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkMode::Remote => "Remote",
            WorkMode::Hybrid => "Hybrid",
            WorkMode::OnSite => "On-site",
        }
    }
}

fn percent_regex() -> &'static Regex {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    PERCENT.get_or_init(|| Regex::new(r"(\d+)%").expect("valid percent regex"))
}

fn first_percent(text: &str) -> Option<i64> {
    percent_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Share of time worked remotely, from answers such as "50%" or
/// "Rarely or never".
pub fn parse_remote_pct(answer: &str) -> Option<i64> {
    let lowered = answer.to_lowercase();
    if lowered.contains("rarely or never") {
        return Some(0);
    }
    if lowered.contains("less than 10%") {
        return Some(5);
    }
    first_percent(&lowered)
}

/// Five-point agreement scale, 5 for "Strongly agree" down to 1.
pub fn likert_score(answer: &str) -> Option<i64> {
    match answer.trim().to_lowercase().as_str() {
        "strongly agree" => Some(5),
        "somewhat agree" => Some(4),
        "neither agree nor disagree" => Some(3),
        "somewhat disagree" => Some(2),
        "strongly disagree" => Some(1),
        _ => None,
    }
}

/// Signed productivity change reported when working remotely.
pub fn productivity_score(answer: &str) -> Option<i64> {
    let lowered = answer.to_lowercase();
    if lowered.contains("about same") || lowered.contains("about the same") {
        return Some(0);
    }
    let pct = first_percent(&lowered)?;
    if lowered.contains("more productive") {
        Some(pct)
    } else if lowered.contains("less productive") {
        Some(-pct)
    } else {
        None
    }
}

/// Earliest birth year accepted when computing ages.
pub const MIN_BIRTH_YEAR: i64 = 1900;

/// Birth year parsed as an integer; float-formatted years ("1985.0") are accepted.
/// Years before [`MIN_BIRTH_YEAR`] or after `reference_year` yield `None`.
fn birth_year(value: &Value, reference_year: i64) -> Option<i64> {
    match value {
        Value::Integer(year) => Some(*year),
        other => other
            .as_f64()
            .filter(|year| year.fract() == 0.0 && year.abs() < 1e15)
            .map(|year| year as i64),
    }
    .filter(|year| (MIN_BIRTH_YEAR..=reference_year).contains(year))
}

#[derive(Debug, Clone, Copy, Default)]
struct SourceColumns {
    birth_year: Option<usize>,
    remote_time: Option<usize>,
    org_encouraged: Option<usize>,
    org_prepared: Option<usize>,
    productivity: Option<usize>,
    family_time: Option<usize>,
    caring_time: Option<usize>,
    commute_time: Option<usize>,
}

impl SourceColumns {
    fn locate(table: &Table, schema: &ReconciledSchema, dialect: &str) -> Self {
        let find = |field: &str| {
            schema
                .column_for(field, dialect)
                .and_then(|column| table.column_index(column))
        };
        Self {
            birth_year: find(fields::BIRTH_YEAR),
            remote_time: find(fields::REMOTE_TIME_PRIOR),
            org_encouraged: find(fields::ORG_ENCOURAGED),
            org_prepared: find(fields::ORG_PREPARED),
            productivity: find(fields::PRODUCTIVITY),
            family_time: find(fields::FAMILY_TIME),
            caring_time: find(fields::CARING_TIME),
            commute_time: find(fields::COMMUTE_TIME),
        }
    }
}

fn cell(row: &[Option<Value>], column: Option<usize>) -> Option<&Value> {
    let cell = row.get(column?)?;
    if is_missing(cell) { None } else { cell.as_ref() }
}

fn text(row: &[Option<Value>], column: Option<usize>) -> Option<String> {
    cell(row, column).map(Value::as_display)
}

fn number(row: &[Option<Value>], column: Option<usize>) -> Option<f64> {
    cell(row, column).and_then(Value::as_f64)
}

/// Derived values for one respondent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedRow {
    pub age: Option<i64>,
    pub remote_pct: Option<i64>,
    pub work_mode: Option<WorkMode>,
    pub org_encouraged_score: Option<i64>,
    pub org_prepared_score: Option<i64>,
    pub morale_score: Option<f64>,
    pub engagement_score: Option<f64>,
    pub total_care_load: Option<f64>,
    pub burnout_risk: Option<f64>,
    pub prod_score: Option<i64>,
}

impl DerivedRow {
    fn compute(row: &[Option<Value>], sources: &SourceColumns, reference_year: i32) -> Self {
        let reference_year = i64::from(reference_year);
        let age = cell(row, sources.birth_year)
            .and_then(|value| birth_year(value, reference_year))
            .map(|year| reference_year - year);
        let remote_pct = text(row, sources.remote_time).and_then(|t| parse_remote_pct(&t));
        let org_encouraged_score = text(row, sources.org_encouraged).and_then(|t| likert_score(&t));
        let org_prepared_score = text(row, sources.org_prepared).and_then(|t| likert_score(&t));
        let morale_score = match (org_encouraged_score, org_prepared_score) {
            (Some(encouraged), Some(prepared)) => Some((encouraged + prepared) as f64 / 2.0),
            _ => None,
        };
        let total_care_load = match (
            number(row, sources.family_time),
            number(row, sources.caring_time),
        ) {
            (Some(family), Some(caring)) => Some(family + caring),
            _ => None,
        };
        let burnout_risk = match (total_care_load, number(row, sources.commute_time)) {
            (Some(care), Some(commute)) => {
                let denominator = care + commute + 1.0;
                (denominator != 0.0).then(|| care / denominator)
            }
            _ => None,
        };
        Self {
            age,
            remote_pct,
            work_mode: remote_pct.map(WorkMode::from_remote_pct),
            org_encouraged_score,
            org_prepared_score,
            morale_score,
            engagement_score: morale_score,
            total_care_load,
            burnout_risk,
            prod_score: text(row, sources.productivity).and_then(|t| productivity_score(&t)),
        }
    }

    fn into_cells(self) -> [Option<Value>; 10] {
        [
            self.age.map(Value::Integer),
            self.remote_pct.map(Value::Integer),
            self.work_mode.map(|mode| Value::from(mode.label())),
            self.org_encouraged_score.map(Value::Integer),
            self.org_prepared_score.map(Value::Integer),
            self.morale_score.map(Value::Float),
            self.engagement_score.map(Value::Float),
            self.total_care_load.map(Value::Float),
            self.burnout_risk.map(Value::Float),
            self.prod_score.map(Value::Integer),
        ]
    }
}

/// Computes derived values for every row without touching the table.
pub fn derive_rows(table: &Table, schema: &ReconciledSchema, dialect: &Dialect) -> Vec<DerivedRow> {
    let sources = SourceColumns::locate(table, schema, &dialect.name);
    table
        .rows
        .iter()
        .map(|row| DerivedRow::compute(row, &sources, dialect.age_reference_year))
        .collect()
}

/// Appends the derived columns to `table`, replacing any earlier derivation.
pub fn append_features(table: &mut Table, schema: &ReconciledSchema, dialect: &Dialect) {
    let derived = derive_rows(table, schema, dialect);
    table.retain_columns(|_, name| !DERIVED_COLUMNS.contains(&name));
    let mut columns: Vec<Vec<Option<Value>>> = DERIVED_COLUMNS
        .iter()
        .map(|_| Vec::with_capacity(derived.len()))
        .collect();
    for row in derived {
        for (column, value) in columns.iter_mut().zip(row.into_cells()) {
            column.push(value);
        }
    }
    for (name, values) in DERIVED_COLUMNS.iter().zip(columns) {
        table.push_column(*name, values);
    }
}
