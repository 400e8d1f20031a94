//! Work-mode summary over derived respondent rows.

use std::collections::BTreeMap;

use heck::ToTitleCase;
use itertools::Itertools;

use crate::features::{DerivedRow, WorkMode};

const METRIC_KEYS: [&str; 5] = [
    "morale_score",
    "engagement_score",
    "burnout_risk",
    "total_care_load",
    "prod_score",
];

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkModeSummary {
    /// `None` when rows from every dialect were pooled.
    pub dialect: Option<String>,
    pub work_mode: WorkMode,
    pub respondents: usize,
    pub morale_score: Option<f64>,
    pub engagement_score: Option<f64>,
    pub burnout_risk: Option<f64>,
    pub total_care_load: Option<f64>,
    pub prod_score: Option<f64>,
    /// Percentage of productivity answers above zero.
    pub higher_productivity_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryReport {
    pub rows: Vec<WorkModeSummary>,
    /// Respondents whose work mode could not be determined.
    pub unclassified: usize,
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| round2(self.sum / self.count as f64))
    }
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    respondents: usize,
    morale: Mean,
    engagement: Mean,
    burnout: Mean,
    care: Mean,
    prod: Mean,
    higher: Mean,
}

impl GroupAccumulator {
    fn ingest(&mut self, row: &DerivedRow) {
        self.respondents += 1;
        self.morale.add(row.morale_score);
        self.engagement.add(row.engagement_score);
        self.burnout.add(row.burnout_risk);
        self.care.add(row.total_care_load);
        self.prod.add(row.prod_score.map(|score| score as f64));
        self.higher
            .add(row.prod_score.map(|score| if score > 0 { 100.0 } else { 0.0 }));
    }

    fn finish(self, dialect: Option<String>, work_mode: WorkMode) -> WorkModeSummary {
        WorkModeSummary {
            dialect,
            work_mode,
            respondents: self.respondents,
            morale_score: self.morale.value(),
            engagement_score: self.engagement.value(),
            burnout_risk: self.burnout.value(),
            total_care_load: self.care.value(),
            prod_score: self.prod.value(),
            higher_productivity_pct: self.higher.value(),
        }
    }
}

/// Keeps rows whose work mode is listed in `modes`; an empty list keeps every row.
pub fn filter_work_modes(rows: Vec<DerivedRow>, modes: &[WorkMode]) -> Vec<DerivedRow> {
    if modes.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| row.work_mode.is_some_and(|mode| modes.contains(&mode)))
        .collect()
}

/// Groups rows by work mode, and by dialect as well when `by_dialect` is set.
pub fn summarize<'a, I>(groups: I, by_dialect: bool) -> SummaryReport
where
    I: IntoIterator<Item = (&'a str, &'a [DerivedRow])>,
{
    let mut accumulators: BTreeMap<(Option<String>, WorkMode), GroupAccumulator> =
        BTreeMap::new();
    let mut unclassified = 0;
    for (dialect, rows) in groups {
        for row in rows {
            let Some(mode) = row.work_mode else {
                unclassified += 1;
                continue;
            };
            let key = (by_dialect.then(|| dialect.to_string()), mode);
            accumulators.entry(key).or_default().ingest(row);
        }
    }
    let rows = accumulators
        .into_iter()
        .map(|((dialect, mode), acc)| acc.finish(dialect, mode))
        .collect();
    SummaryReport { rows, unclassified }
}

pub fn summary_headers(by_dialect: bool) -> Vec<String> {
    let leading: &[&str] = if by_dialect {
        &["dialect", "work_mode", "respondents"]
    } else {
        &["work_mode", "respondents"]
    };
    leading
        .iter()
        .chain(METRIC_KEYS.iter())
        .chain(["higher_productivity_pct"].iter())
        .map(|key| key.to_title_case())
        .collect()
}

fn format_metric(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

pub fn summary_rows(report: &SummaryReport, by_dialect: bool) -> Vec<Vec<String>> {
    report
        .rows
        .iter()
        .map(|summary| {
            let mut row = Vec::with_capacity(9);
            if by_dialect {
                row.push(summary.dialect.clone().unwrap_or_default());
            }
            row.push(summary.work_mode.label().to_string());
            row.push(summary.respondents.to_string());
            row.extend(
                [
                    summary.morale_score,
                    summary.engagement_score,
                    summary.burnout_risk,
                    summary.total_care_load,
                    summary.prod_score,
                    summary.higher_productivity_pct,
                ]
                .into_iter()
                .map(format_metric),
            );
            row
        })
        .collect()
}

/// One line per dialect listing work modes by descending mean productivity.
pub fn productivity_ranking(report: &SummaryReport) -> Vec<String> {
    report
        .rows
        .iter()
        .chunk_by(|summary| summary.dialect.clone())
        .into_iter()
        .map(|(dialect, group)| {
            let ranked = group
                .filter_map(|summary| summary.prod_score.map(|score| (summary.work_mode, score)))
                .sorted_by(|a, b| b.1.total_cmp(&a.1))
                .map(|(mode, score)| format!("{} ({score:.2})", mode.label()))
                .join(" > ");
            match dialect {
                Some(dialect) => format!("{dialect}: {ranked}"),
                None => format!("all: {ranked}"),
            }
        })
        .collect()
}

/// Mean morale for one organisational preparedness score.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparednessRow {
    pub org_prepared_score: i64,
    pub respondents: usize,
    pub morale_score: Option<f64>,
}

/// Mean morale per preparedness score, lowest score first. Rows without a
/// preparedness score are skipped.
pub fn preparedness_morale<'a, I>(rows: I) -> Vec<PreparednessRow>
where
    I: IntoIterator<Item = &'a DerivedRow>,
{
    let mut groups: BTreeMap<i64, (usize, Mean)> = BTreeMap::new();
    for row in rows {
        let Some(score) = row.org_prepared_score else {
            continue;
        };
        let (respondents, morale) = groups.entry(score).or_default();
        *respondents += 1;
        morale.add(row.morale_score);
    }
    groups
        .into_iter()
        .map(|(org_prepared_score, (respondents, morale))| PreparednessRow {
            org_prepared_score,
            respondents,
            morale_score: morale.value(),
        })
        .collect()
}

pub fn preparedness_headers() -> Vec<String> {
    ["org_prepared_score", "respondents", "morale_score"]
        .iter()
        .map(|key| key.to_title_case())
        .collect()
}

pub fn preparedness_rows(rows: &[PreparednessRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            vec![
                row.org_prepared_score.to_string(),
                row.respondents.to_string(),
                format_metric(row.morale_score),
            ]
        })
        .collect()
}

/// How often one productivity score was reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductivityCount {
    pub prod_score: i64,
    pub respondents: usize,
    /// Share of respondents with any productivity score.
    pub share_pct: f64,
}

/// Value counts of `prod_score`, lowest score first.
pub fn productivity_distribution<'a, I>(rows: I) -> Vec<ProductivityCount>
where
    I: IntoIterator<Item = &'a DerivedRow>,
{
    let counts = rows
        .into_iter()
        .filter_map(|row| row.prod_score)
        .counts()
        .into_iter()
        .sorted()
        .collect_vec();
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    counts
        .into_iter()
        .map(|(prod_score, respondents)| ProductivityCount {
            prod_score,
            respondents,
            share_pct: round2(respondents as f64 * 100.0 / total as f64),
        })
        .collect()
}

pub fn distribution_headers() -> Vec<String> {
    ["prod_score", "respondents", "share_pct"]
        .iter()
        .map(|key| key.to_title_case())
        .collect()
}

pub fn distribution_rows(counts: &[ProductivityCount]) -> Vec<Vec<String>> {
    counts
        .iter()
        .map(|count| {
            vec![
                count.prod_score.to_string(),
                count.respondents.to_string(),
                format!("{:.2}", count.share_pct),
            ]
        })
        .collect()
}
