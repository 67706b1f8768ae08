#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use ffport_data as data;
pub use ffport_output as output;
pub use ffport_portfolios as portfolios;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{FamilyOutput, Pipeline, PipelineOutput, RunDiagnostics, SortOutput};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
