//! Ingestion error types.

use thiserror::Error;
use varinterp_db::{CategoryKind, DbError};

pub type Result<T> = std::result::Result<T, ImportError>;

/// Failures of the curated-sheet loader and the knowledge-base importer.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The category lists must be imported before any entry references them.
    #[error("{kind} category '{label}' is not loaded; import the category lists first")]
    MissingCategory { kind: CategoryKind, label: String },

    #[error("Malformed tier '{value}' in source row {source_row}")]
    MalformedTier { source_row: u32, value: String },

    #[error("Curated sheet is missing required column '{0}'")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Db(#[from] DbError),
}

/// Failures of the variant table reader. Per-cell parse problems are not
/// errors; they are recovered and listed as [`crate::ir::RecordIssue`]s.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("Variant table is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Variant table has no header row")]
    MissingHeader,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
