use crate::load::RunSummary;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid column schema: {0}")]
    InvalidSchema(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Sink error: {0}")]
    SinkError(String),

    #[error(
        "Batch of {rows} rows failed to commit (expected {expected_columns} columns); first row: {sample}: {source}"
    )]
    BatchCommitFailed {
        rows: usize,
        expected_columns: usize,
        sample: String,
        #[source]
        source: Box<LoaderError>,
    },

    #[error("Load aborted after {} rows inserted: {source}", .summary.rows_inserted)]
    Aborted {
        summary: Box<RunSummary>,
        #[source]
        source: Box<LoaderError>,
    },
}

impl LoaderError {
    /// Summary of the run up to the failure, when the error aborted a load.
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            LoaderError::Aborted { summary, .. } => Some(&**summary),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;

/// Why a logical record never made it into a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ArityMismatch { expected: usize, got: usize },
    UnparseableStatement,
    Truncated,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ArityMismatch { expected, got } => {
                write!(f, "expected {} values, got {}", expected, got)
            }
            SkipReason::UnparseableStatement => write!(f, "could not parse INSERT statement"),
            SkipReason::Truncated => write!(f, "record never reached its terminator"),
        }
    }
}
