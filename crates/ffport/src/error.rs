//! Error types for the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input panels could not be loaded or decoded
    #[error(transparent)]
    Data(#[from] ffport_data::DataError),

    /// Portfolio engine error, e.g. an unknown family name
    #[error(transparent)]
    Portfolio(#[from] ffport_portfolios::PortfolioError),

    /// Writing result tables failed
    #[error(transparent)]
    Export(#[from] ffport_output::ExportError),

    /// Writing the run report failed
    #[error(transparent)]
    Report(#[from] ffport_output::ReportError),

    /// Configuration file could not be parsed
    #[error("Invalid configuration {path}: {source}")]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Parse error
        source: serde_json::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
