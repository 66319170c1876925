//! CLI error types.

use std::path::PathBuf;

use archmodel_core::ModelError;
use thiserror::Error;

/// Errors raised while loading or replaying a script.
#[derive(Debug, Error)]
pub enum CliError {
    /// The script file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The script is not valid JSON or does not match the step format.
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    /// A step named a table that does not exist.
    #[error("step {step}: no table named {name:?}")]
    UnknownTable { step: usize, name: String },

    /// A step named a column that does not exist in the table.
    #[error("step {step}: no column named {column:?} in table {table:?}")]
    UnknownColumn {
        step: usize,
        table: String,
        column: String,
    },

    /// A step named a relationship that does not exist.
    #[error("step {step}: no relationship named {name:?}")]
    UnknownRelationship { step: usize, name: String },

    /// The model rejected a step.
    #[error("step {step} ({op}): {source}")]
    Model {
        step: usize,
        op: &'static str,
        #[source]
        source: ModelError,
    },
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
