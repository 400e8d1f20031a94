pub mod batch;
pub mod clean;
pub mod cli;
pub mod config;
pub mod consolidate;
pub mod data;
pub mod error;
pub mod features;
pub mod io_utils;
pub mod reconcile;
pub mod report;
pub mod resolve;
pub mod rules;
pub mod summary;
pub mod synthesize;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::Config,
    resolve::{NameOrigin, printable_header, resolve},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("survey_normalize", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => batch::execute(&args),
        Commands::Headers(args) => handle_headers(&args),
        Commands::Rules(args) => handle_rules(&args),
        Commands::Reconcile(args) => report::execute_reconcile(&args),
        Commands::Report(args) => report::execute(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

fn handle_headers(args: &cli::HeadersArgs) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let dialect = config.dialect(&args.dialect)?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Resolving headers of '{}' as dialect '{}' with delimiter '{}'",
        args.input.display(),
        dialect.name,
        printable_delimiter(delimiter)
    );
    let raw = io_utils::read_raw_table(&args.input, delimiter, encoding)
        .with_context(|| format!("Reading headers from {:?}", args.input))?;
    let resolution = resolve(&raw.headers, &dialect.rules, config.fallback_token_cap);
    resolution.log_audit();

    let headers = ["#", "raw header", "name", "origin", "note"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let rows = resolution
        .columns
        .iter()
        .filter(|column| {
            !args.issues_only
                || column.was_suffixed()
                || !matches!(column.origin, NameOrigin::Rule { .. })
        })
        .map(|column| {
            let note = match (&column.origin, column.was_suffixed()) {
                (_, true) => format!("collided on '{}'", column.base),
                (NameOrigin::Rule { pattern, .. }, false) => format!("matched '{pattern}'"),
                (_, false) => String::new(),
            };
            vec![
                column.position.to_string(),
                printable_header(&column.raw),
                column.name.clone(),
                column.origin.label(),
                note,
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_rules(args: &cli::RulesArgs) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let dialect = config.dialect(&args.dialect)?;
    let headers = ["#", "pattern", "name"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let rows = dialect
        .rules
        .rules()
        .iter()
        .enumerate()
        .map(|(idx, rule)| {
            vec![
                (idx + 1).to_string(),
                rule.pattern.to_string(),
                rule.name.clone(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "Dialect '{}' has {} rule(s); first match wins",
        dialect.name,
        rows.len()
    );
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;
    print!("{}", config.to_yaml_string()?);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
