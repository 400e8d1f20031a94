use anyhow::{Result, bail};
use itertools::Itertools;
use log::{info, warn};

use crate::{
    batch::{BatchContext, reconcile_files},
    cli::{ReconcileArgs, ReportArgs},
    features::{self, DerivedRow, WorkMode},
    reconcile::{FieldBinding, ReconciledSchema},
    summary, table,
};

const ABSENT: &str = "(absent)";

pub fn alias_rows(schema: &ReconciledSchema) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = vec!["field".to_string()];
    headers.extend(schema.dialects.iter().cloned());
    let rows = schema
        .fields
        .iter()
        .map(|mapping| {
            let mut row = vec![mapping.field.clone()];
            row.extend(schema.dialects.iter().map(|dialect| {
                match mapping.bindings.get(dialect) {
                    Some(FieldBinding::Present(column)) => column.clone(),
                    _ => ABSENT.to_string(),
                }
            }));
            row
        })
        .collect();
    (headers, rows)
}

pub fn execute_reconcile(args: &ReconcileArgs) -> Result<()> {
    let context = BatchContext::from_args(&args.input)?;
    let (files, batch) = context.clean_all(&args.input.tasks_or_default())?;
    batch.log();
    if files.is_empty() {
        bail!("No input could be read; nothing to reconcile");
    }
    let schema = reconcile_files(&context.config, &files)?;
    schema.log_warnings();

    let (headers, rows) = alias_rows(&schema);
    table::print_table(&headers, &rows);
    if !schema.warnings.is_empty() {
        println!();
        let headers = vec![
            "dialect".to_string(),
            "field".to_string(),
            "problem".to_string(),
        ];
        let rows: Vec<Vec<String>> = schema
            .warnings
            .iter()
            .map(|warning| {
                vec![
                    warning.dialect.clone(),
                    warning.field.clone(),
                    warning.describe(),
                ]
            })
            .collect();
        table::print_table(&headers, &rows);
    }
    info!(
        "Reconciled {} field(s) across {} dialect(s) with {} warning(s)",
        schema.fields.len(),
        schema.dialects.len(),
        schema.warnings.len()
    );
    Ok(())
}

pub fn execute(args: &ReportArgs) -> Result<()> {
    let context = BatchContext::from_args(&args.input)?;
    let (files, batch) = context.clean_all(&args.input.tasks_or_default())?;
    batch.log();
    if files.is_empty() {
        bail!("No input could be read; nothing to report");
    }
    let schema = reconcile_files(&context.config, &files)?;
    schema.log_warnings();

    let modes: Vec<WorkMode> = args.work_modes.iter().map(|filter| filter.mode()).collect();
    let derived: Vec<(String, Vec<DerivedRow>)> = files
        .iter()
        .map(|file| {
            let rows = features::derive_rows(&file.table, &schema, &file.dialect);
            (
                file.dialect.name.clone(),
                summary::filter_work_modes(rows, &modes),
            )
        })
        .collect();
    if !modes.is_empty() {
        info!(
            "Restricted report to work mode(s): {}",
            modes.iter().map(|mode| mode.label()).join(", ")
        );
    }
    let report = summary::summarize(
        derived
            .iter()
            .map(|(dialect, rows)| (dialect.as_str(), rows.as_slice())),
        args.by_dialect,
    );
    if report.unclassified > 0 {
        warn!(
            "{} respondent(s) had no usable remote-time answer and were left out",
            report.unclassified
        );
    }

    table::print_table(
        &summary::summary_headers(args.by_dialect),
        &summary::summary_rows(&report, args.by_dialect),
    );
    let ranking = summary::productivity_ranking(&report);
    if !ranking.is_empty() {
        println!();
        println!("Mean productivity by work mode:");
        for line in ranking {
            println!("  {line}");
        }
    }

    let all_rows = || derived.iter().flat_map(|(_, rows)| rows);
    let preparedness = summary::preparedness_morale(all_rows());
    if !preparedness.is_empty() {
        println!();
        println!("Mean morale by organisational preparedness:");
        table::print_table(
            &summary::preparedness_headers(),
            &summary::preparedness_rows(&preparedness),
        );
    }
    let distribution = summary::productivity_distribution(all_rows());
    if !distribution.is_empty() {
        println!();
        println!("Productivity score distribution:");
        table::print_table(
            &summary::distribution_headers(),
            &summary::distribution_rows(&distribution),
        );
    }
    info!(
        "Summarized {} group(s) from {} file(s)",
        report.rows.len(),
        files.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{AliasSpec, AliasTable, reconcile};

    #[test]
    fn alias_rows_mark_absent_bindings() {
        let aliases = AliasTable::new(vec![AliasSpec {
            field: "remote_time_prior".to_string(),
            columns: [
                ("2020".to_string(), "time_ly".to_string()),
                ("2021".to_string(), "time_q4_2020".to_string()),
            ]
            .into_iter()
            .collect(),
        }])
        .unwrap();
        let h2020 = vec!["time_ly".to_string()];
        let h2021 = vec!["id".to_string()];
        let schema = reconcile(&aliases, &[("2020", &h2020[..]), ("2021", &h2021[..])]);
        let (headers, rows) = alias_rows(&schema);
        assert_eq!(headers, vec!["field", "2020", "2021"]);
        assert_eq!(rows, vec![vec!["remote_time_prior", "time_ly", ABSENT]]);
    }
}
