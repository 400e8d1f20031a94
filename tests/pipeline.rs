mod common;

use common::{TestWorkspace, fixture_path};
use survey_normalize::{
    batch::{BatchContext, reconcile_files},
    clean::{CleanOptions, clean_table},
    cli::{InputArgs, Task},
    config::Config,
    consolidate::{ConsolidationOutcome, FamilySpec, consolidate},
    data::{Table, Value},
    features::{self, WorkMode},
    io_utils::read_raw_table,
    reconcile::{MissingReason, fields},
    summary,
};

fn input_args(tasks: Vec<Task>) -> InputArgs {
    InputArgs {
        tasks,
        config: None,
        input_encoding: None,
        delimiter: None,
    }
}

fn sample_tasks() -> Vec<Task> {
    vec![
        Task::new("2020", fixture_path("2020_sample.csv")),
        Task::new("2021", fixture_path("2021_sample.csv")),
    ]
}

#[test]
fn consolidation_keeps_rank_order_and_pads() {
    let mut table = Table::new(
        vec![
            "id".into(),
            "major_barrier".into(),
            "major_barrier_2".into(),
            "major_barrier_3".into(),
            "major_barrier_4".into(),
        ],
        vec![vec![
            Some(Value::from("7")),
            None,
            Some(Value::from("B")),
            Some(Value::from("A")),
            None,
        ]],
    );
    let outcome = consolidate(&mut table, &FamilySpec::new("major_barrier", 3));
    assert!(matches!(outcome, ConsolidationOutcome::Consolidated { .. }));
    assert_eq!(
        table.rows[0][1..],
        [Some(Value::from("B")), Some(Value::from("A")), None]
    );
}

#[test]
fn cleaning_the_2020_fixture() {
    let config = Config::default();
    let dialect = config.dialect("2020").unwrap();
    let raw = read_raw_table(&fixture_path("2020_sample.csv"), b',', None).unwrap();
    let (table, report) = clean_table(
        &raw.headers,
        raw.records,
        &dialect,
        &CleanOptions::from_config(&config),
    );

    assert_eq!(
        table.headers,
        vec![
            "id",
            "birth_year",
            "gender",
            "ind_detail",
            "industry",
            "time_ly",
            "pref_time_ly",
            "org_encouraged",
            "org_prepared",
            "productivity",
            "commute_time",
            "family_time",
            "caring_time",
            "major_barrier_1",
            "major_barrier_2",
            "major_barrier_3",
            "minor_barrier_1",
            "minor_barrier_2",
            "minor_barrier_3",
            "please_tell_us_anything",
        ]
    );
    assert_eq!(table.row_count(), 3);
    assert_eq!(report.dropped_rows, 1);
    assert_eq!(table.cell(1, "major_barrier_1"), Some(&Value::from("IT equipment")));
    assert_eq!(table.cell(1, "minor_barrier_1"), None);
    assert_eq!(table.cell(2, "major_barrier_2"), Some(&Value::from("Connectivity")));
    assert_eq!(report.resolution.fallbacks().count(), 1);
    assert_eq!(report.resolution.collisions().count(), 1);
}

#[test]
fn reconciliation_reports_missing_org_prepared_in_2021() {
    let context = BatchContext::from_args(&input_args(sample_tasks())).unwrap();
    let (files, batch) = context.clean_all(&sample_tasks()).unwrap();
    assert!(batch.failed.is_empty());
    let schema = reconcile_files(&context.config, &files).unwrap();

    assert_eq!(
        schema.column_for(fields::REMOTE_TIME_PRIOR, "2020"),
        Some("time_ly")
    );
    assert_eq!(
        schema.column_for(fields::REMOTE_TIME_PRIOR, "2021"),
        Some("time_q4_2020")
    );
    assert_eq!(
        schema.column_for(fields::TOP_BARRIER, "2021"),
        Some("barriers_major_1")
    );
    assert_eq!(schema.column_for(fields::ORG_PREPARED, "2021"), None);
    assert!(schema.warnings.iter().any(|warning| {
        warning.dialect == "2021"
            && warning.field == fields::ORG_PREPARED
            && warning.reason == MissingReason::ColumnNotFound("org_prepared".to_string())
    }));
}

#[test]
fn features_and_summary_across_dialects() {
    let context = BatchContext::from_args(&input_args(sample_tasks())).unwrap();
    let (files, _) = context.clean_all(&sample_tasks()).unwrap();
    let schema = reconcile_files(&context.config, &files).unwrap();

    let derived: Vec<(String, Vec<features::DerivedRow>)> = files
        .iter()
        .map(|file| {
            (
                file.dialect.name.clone(),
                features::derive_rows(&file.table, &schema, &file.dialect),
            )
        })
        .collect();

    let rows_2020 = &derived[0].1;
    assert_eq!(rows_2020[0].age, Some(36));
    assert_eq!(rows_2020[0].work_mode, Some(WorkMode::Remote));
    assert_eq!(rows_2020[1].remote_pct, Some(0));
    assert_eq!(rows_2020[2].work_mode, Some(WorkMode::Hybrid));
    let rows_2021 = &derived[1].1;
    assert_eq!(rows_2021[0].morale_score, None);
    assert_eq!(rows_2021[1].remote_pct, Some(5));

    let report = summary::summarize(
        derived
            .iter()
            .map(|(dialect, rows)| (dialect.as_str(), rows.as_slice())),
        true,
    );
    assert_eq!(report.unclassified, 0);
    let on_site_2021 = report
        .rows
        .iter()
        .find(|row| row.dialect.as_deref() == Some("2021") && row.work_mode == WorkMode::OnSite)
        .expect("2021 on-site group");
    assert_eq!(on_site_2021.respondents, 2);
    assert_eq!(on_site_2021.prod_score, Some(-10.0));
    assert_eq!(on_site_2021.higher_productivity_pct, Some(0.0));
}

#[test]
fn batch_continues_past_unreadable_inputs() {
    let workspace = TestWorkspace::new();
    let empty = workspace.write("empty.csv", "");
    let missing = workspace.path().join("missing.csv");
    let tasks = vec![
        Task::new("2020", empty),
        Task::new("2020", missing),
        Task::new("2021", fixture_path("2021_sample.csv")),
    ];
    let context = BatchContext::from_args(&input_args(tasks.clone())).unwrap();
    let (files, batch) = context.clean_all(&tasks).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(batch.failed.len(), 2);
    assert!(batch.failed[0].1.contains("no header columns"));
    assert!(!batch.all_failed());
}

#[test]
fn unknown_dialect_aborts_before_reading() {
    let tasks = vec![Task::new("1999", fixture_path("2020_sample.csv"))];
    let context = BatchContext::from_args(&input_args(tasks.clone())).unwrap();
    let err = context.clean_all(&tasks).unwrap_err();
    assert!(format!("{err:#}").contains("Unknown dialect '1999'"));
}
