// crates/donorflow-core/src/error.rs

use donorflow_csv::ParseError;
use thiserror::Error;
use uuid::Uuid;

/// Batch-fatal failures. Nothing is written when one of these is returned.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("CSV parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("No valid data found in CSV file")]
    NoData,
}

/// Required columns were absent from the header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing required columns: {}", missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
    pub found: Vec<String>,
}

/// Field-level problems for a single CSV row. Each message already carries the
/// `Row {n}: ` prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", messages.join("; "))]
pub struct RowValidationError {
    pub row: usize,
    pub messages: Vec<String>,
}

/// Failures raised while writing donors. The batch orchestrator captures these
/// per row; the HTTP layer maps them to status codes.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("{}", .0.join("; "))]
    Constraint(Vec<String>),

    #[error("Donor with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Donor not found: {0}")]
    NotFound(Uuid),

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Stored donor record is invalid: {0}")]
    Corrupt(String),
}

impl PersistenceError {
    pub fn constraint(message: impl Into<String>) -> Self {
        PersistenceError::Constraint(vec![message.into()])
    }

    /// Maps a unique-key violation on insert to `DuplicateEmail`.
    pub(crate) fn from_insert(err: sqlx::Error, email: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PersistenceError::DuplicateEmail(email.to_string())
            }
            _ => PersistenceError::Sqlx(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
