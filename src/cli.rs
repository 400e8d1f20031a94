use std::{fmt, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    features::WorkMode,
    rules::{DIALECT_2020, DIALECT_2021},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize survey CSV headers into stable, unique column names",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve headers, clean values and write one normalized CSV per task
    Clean(CleanArgs),
    /// Show how each header of a file resolves to a canonical name
    Headers(HeadersArgs),
    /// List the ordered rule table of a dialect
    Rules(RulesArgs),
    /// Show which column carries each cross-dialect field
    Reconcile(ReconcileArgs),
    /// Derive analysis features and summarize them by work mode
    Report(ReportArgs),
    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

/// One input file and the dialect whose rules resolve its headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub dialect: String,
    pub input: PathBuf,
}

impl Task {
    pub fn new(dialect: &str, input: impl Into<PathBuf>) -> Self {
        Self {
            dialect: dialect.to_string(),
            input: input.into(),
        }
    }

    /// Tasks run when none are given on the command line.
    pub fn defaults() -> Vec<Task> {
        vec![
            Task::new(DIALECT_2020, "2020_rws.csv"),
            Task::new(DIALECT_2021, "2021_rws.csv"),
        ]
    }

    pub fn output_file_name(&self) -> String {
        format!("{}_cleaned_data.csv", self.dialect)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.dialect, self.input.display())
    }
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input in the form `DIALECT=PATH` (repeatable); defaults to
    /// `2020=2020_rws.csv` and `2021=2021_rws.csv`
    #[arg(short = 't', long = "task", value_parser = parse_task, action = clap::ArgAction::Append)]
    pub tasks: Vec<Task>,
    /// YAML configuration with rule overrides, families and aliases
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Character encoding of the inputs (auto-detected when omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

impl InputArgs {
    pub fn tasks_or_default(&self) -> Vec<Task> {
        if self.tasks.is_empty() {
            Task::defaults()
        } else {
            self.tasks.clone()
        }
    }
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Directory that receives `<dialect>_cleaned_data.csv` files
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
    /// Delimiter for output files (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Append derived feature columns (age, work mode, scores) to each output
    #[arg(long)]
    pub features: bool,
}

#[derive(Debug, Args)]
pub struct HeadersArgs {
    /// Input CSV file whose header row is resolved
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Dialect whose rule table applies
    #[arg(short, long)]
    pub dialect: String,
    /// YAML configuration with rule overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Character encoding of the input (auto-detected when omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Only list headers that fell back or were suffixed
    #[arg(long = "issues-only")]
    pub issues_only: bool,
}

#[derive(Debug, Args)]
pub struct RulesArgs {
    /// Dialect whose rule table is listed
    #[arg(short, long)]
    pub dialect: String,
    /// YAML configuration with rule overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Group by dialect as well as work mode
    #[arg(long = "by-dialect")]
    pub by_dialect: bool,
    /// Only report respondents in this work mode (repeatable)
    #[arg(long = "work-mode", value_enum, action = clap::ArgAction::Append)]
    pub work_modes: Vec<WorkModeFilter>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum WorkModeFilter {
    Remote,
    Hybrid,
    #[value(alias = "onsite")]
    OnSite,
}

impl WorkModeFilter {
    pub fn mode(self) -> WorkMode {
        match self {
            WorkModeFilter::Remote => WorkMode::Remote,
            WorkModeFilter::Hybrid => WorkMode::Hybrid,
            WorkModeFilter::OnSite => WorkMode::OnSite,
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Configuration file to validate and print (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn parse_task(value: &str) -> Result<Task, String> {
    let (dialect, path) = value
        .split_once('=')
        .ok_or_else(|| format!("Task '{value}' must look like DIALECT=PATH"))?;
    let dialect = dialect.trim();
    let path = path.trim();
    if dialect.is_empty() {
        return Err(format!("Task '{value}' is missing a dialect name"));
    }
    if path.is_empty() {
        return Err(format!("Task '{value}' is missing an input path"));
    }
    Ok(Task::new(dialect, path))
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
