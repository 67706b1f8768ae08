//! Error types for the portfolio engine.

use thiserror::Error;

/// Result type for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Errors raised by the portfolio engine.
///
/// Row- and cell-level gaps are not errors; they are counted in
/// [`Diagnostics`](crate::Diagnostics).
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Requested family is not registered
    #[error("Unknown portfolio family: {0}")]
    UnknownFamily(String),

    /// Quantile cut set is not strictly increasing inside (0, 1)
    #[error("Invalid cut set: {0}")]
    InvalidCutSet(String),

    /// Matrix shape or label mismatch
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// Input data error
    #[error(transparent)]
    Data(#[from] ffport_data::DataError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
