#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compare;
pub mod export;
pub mod report;
pub mod summary;

pub use compare::{ColumnComparison, Comparison, compare};
pub use export::{
    ExportError, ExportFormat, Exporter, MISSING_CODES, read_matrix_csv, write_sort,
};
pub use report::{Report, ReportBuilder, ReportError, SortReport};
pub use summary::{ColumnSummary, MatrixSummary, describe};
