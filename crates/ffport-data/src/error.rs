//! Error types for panel loading and decoding.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or decoding input panels.
///
/// Only structural problems are errors. Row-level gaps (a missing return,
/// a missing accounting field) decode to `None` and are handled downstream
/// by exclusion.
#[derive(Debug, Error)]
pub enum DataError {
    /// A required column is absent from an input table
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn {
        /// Input table name
        table: &'static str,
        /// Canonical column name
        column: &'static str,
    },

    /// A column exists but cannot be read as the expected kind
    #[error("Table '{table}' column '{column}' has unsupported type {dtype}")]
    ColumnType {
        /// Input table name
        table: &'static str,
        /// Canonical column name
        column: &'static str,
        /// Data type found in the frame
        dtype: String,
    },

    /// A key column holds a null
    #[error("Table '{table}' has a null key in column '{column}' at row {row}")]
    NullKey {
        /// Input table name
        table: &'static str,
        /// Canonical column name
        column: &'static str,
        /// Zero-based row index
        row: usize,
    },

    /// A uniqueness invariant of the input was violated
    #[error("Table '{table}' has duplicate key {key}")]
    DuplicateKey {
        /// Input table name
        table: &'static str,
        /// Rendered key
        key: String,
    },

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
