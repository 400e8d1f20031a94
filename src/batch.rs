//! Runs a list of `DIALECT=PATH` tasks through the cleaning pipeline.
//!
//! A task that cannot be read (missing file, empty header row, undecodable
//! bytes) is logged and skipped; the remaining tasks still run. Configuration
//! and dialect errors are raised before any file is opened.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::{error, info, warn};

use crate::{
    clean::{CleanOptions, CleanReport, clean_table},
    cli::{CleanArgs, InputArgs, Task},
    config::{Config, Dialect},
    data::Table,
    error::NormalizeError,
    features,
    io_utils::{self, DEFAULT_CSV_DELIMITER},
    reconcile::{ReconciledSchema, reconcile},
};

/// Outcome counts and messages for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn record_success(&mut self, task: &Task) {
        self.succeeded.push(task.to_string());
    }

    pub fn record_failure(&mut self, task: &Task, message: impl Into<String>) {
        self.failed.push((task.to_string(), message.into()));
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn log(&self) {
        info!(
            "Batch finished: {} of {} task(s) succeeded, {} skipped",
            self.succeeded.len(),
            self.total(),
            self.failed.len()
        );
    }
}

/// A task whose file was read and cleaned successfully.
#[derive(Debug, Clone)]
pub struct CleanedFile {
    pub task: Task,
    pub dialect: Dialect,
    pub table: Table,
    pub report: CleanReport,
}

/// Loaded configuration plus the per-run input settings.
pub struct BatchContext {
    pub config: Config,
    pub options: CleanOptions,
    pub encoding: Option<&'static Encoding>,
    pub delimiter: Option<u8>,
}

impl BatchContext {
    pub fn from_args(args: &InputArgs) -> Result<Self> {
        let config = Config::load_or_default(args.config.as_deref())?;
        let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
        Ok(Self {
            options: CleanOptions::from_config(&config),
            config,
            encoding,
            delimiter: args.delimiter,
        })
    }

    fn clean_one(&self, task: &Task, dialect: Dialect) -> Result<CleanedFile> {
        if !io_utils::is_dash(&task.input) && !task.input.exists() {
            bail!("input file {:?} not found", task.input);
        }
        let delimiter = io_utils::resolve_input_delimiter(&task.input, self.delimiter);
        let raw = io_utils::read_raw_table(&task.input, delimiter, self.encoding)?;
        info!(
            "[{}] read {} row(s) x {} column(s) from {:?} ({})",
            dialect.name,
            raw.records.len(),
            raw.headers.len(),
            task.input,
            raw.encoding.name()
        );
        let (table, report) = clean_table(&raw.headers, raw.records, &dialect, &self.options);
        report.log_summary(&table);
        Ok(CleanedFile {
            task: task.clone(),
            dialect,
            table,
            report,
        })
    }

    /// Cleans every task in order. Dialects are built up front so a bad rule
    /// table aborts the run before any input is read.
    pub fn clean_all(&self, tasks: &[Task]) -> Result<(Vec<CleanedFile>, BatchSummary)> {
        let dialects = tasks
            .iter()
            .map(|task| {
                self.config
                    .dialect(&task.dialect)
                    .with_context(|| format!("Preparing dialect for task {task}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut summary = BatchSummary::default();
        let mut cleaned = Vec::with_capacity(tasks.len());
        for (task, dialect) in tasks.iter().zip(dialects) {
            match self.clean_one(task, dialect) {
                Ok(file) => {
                    summary.record_success(task);
                    cleaned.push(file);
                }
                Err(err) => {
                    if let Some(NormalizeError::EmptyHeaderRow { .. }) =
                        err.downcast_ref::<NormalizeError>()
                    {
                        warn!("{err}; skipping {task}");
                    } else {
                        warn!("Skipping {task}: {err:#}");
                    }
                    summary.record_failure(task, format!("{err:#}"));
                }
            }
        }
        Ok((cleaned, summary))
    }
}

/// Reconciles the cleaned schemas of `files` against the configured aliases.
pub fn reconcile_files(config: &Config, files: &[CleanedFile]) -> Result<ReconciledSchema> {
    let aliases = config.alias_table()?;
    let schemas: Vec<(&str, &[String])> = files
        .iter()
        .map(|file| (file.dialect.name.as_str(), file.table.headers.as_slice()))
        .collect();
    Ok(reconcile(&aliases, &schemas))
}

pub fn execute(args: &CleanArgs) -> Result<()> {
    let context = BatchContext::from_args(&args.input)?;
    let tasks = args.input.tasks_or_default();
    let (mut files, summary) = context.clean_all(&tasks)?;

    if args.features && !files.is_empty() {
        let schema = reconcile_files(&context.config, &files)?;
        schema.log_warnings();
        for file in &mut files {
            features::append_features(&mut file.table, &schema, &file.dialect);
        }
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Creating output directory {:?}", args.output_dir))?;
    let delimiter = args.output_delimiter.unwrap_or(DEFAULT_CSV_DELIMITER);
    for file in &files {
        let output = args.output_dir.join(file.task.output_file_name());
        write_cleaned(&output, &file.table, delimiter)?;
        info!(
            "Successfully cleaned and saved to {:?}. Shape: ({}, {})",
            output,
            file.table.row_count(),
            file.table.column_count()
        );
    }

    summary.log();
    if summary.all_failed() {
        error!("No task produced output");
        bail!("All {} task(s) failed", summary.total());
    }
    Ok(())
}

fn write_cleaned(output: &Path, table: &Table, delimiter: u8) -> Result<()> {
    io_utils::write_table(Some(output), table, delimiter)
        .with_context(|| format!("Writing cleaned output {output:?}"))
}
