//! Error types for the metascribe library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for metascribe operations.
#[derive(Debug, Error)]
pub enum MetascribeError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing CSV/TSV data.
    #[error("Parse error at row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: usize,
        message: String,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid delimiter detected or specified.
    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A named column does not exist in the dataset.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The LLM endpoint did not answer within the configured timeout.
    #[error("LLM request timed out after {seconds}s")]
    LlmTimeout { seconds: u64 },

    /// The LLM endpoint could not be reached.
    #[error("LLM connection failed: {0}")]
    LlmConnection(String),

    /// The LLM endpoint answered with an error or an unreadable body.
    #[error("LLM response error: {0}")]
    LlmResponse(String),

    /// A value could not be converted into a JSON-safe form.
    #[error("Cannot coerce field '{field}' of column '{column}' (value type: {value_type})")]
    Coercion {
        column: String,
        field: String,
        value_type: String,
    },

    /// A column reached export without a finalized type or description.
    #[error("Column '{column}' is incomplete: missing {missing}")]
    IncompleteColumn { column: String, missing: String },

    /// A review action is not allowed in the column's current state.
    #[error("Invalid transition for column '{column}': {message}")]
    InvalidTransition { column: String, message: String },

    /// Session file read/write failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No session is registered under the given id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl MetascribeError {
    /// Whether the error comes from the LLM collaborator.
    ///
    /// These are recovered per column by falling back to heuristic output,
    /// never propagated for the whole dataset.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MetascribeError::LlmTimeout { .. }
                | MetascribeError::LlmConnection(_)
                | MetascribeError::LlmResponse(_)
        )
    }
}

/// Result type alias for metascribe operations.
pub type Result<T> = std::result::Result<T, MetascribeError>;
