//! Error taxonomy for rule construction, configuration, and per-file failures.
//!
//! Construction-time variants ([`NormalizeError::MalformedRuleSet`],
//! [`NormalizeError::InvalidConfig`]) abort the run. [`NormalizeError::EmptyHeaderRow`]
//! is scoped to a single file and is collected by the batch driver instead of
//! being propagated.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Malformed rule set for dialect '{dialect}': rule {position} ('{pattern}'): {reason}")]
    MalformedRuleSet {
        dialect: String,
        position: usize,
        pattern: String,
        reason: String,
    },
    #[error("Input {path:?} has no header columns")]
    EmptyHeaderRow { path: PathBuf },
    #[error("Unknown dialect '{0}'")]
    UnknownDialect(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = NormalizeError> = std::result::Result<T, E>;
