#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod delisting;
pub mod error;
pub mod exchange;
pub mod ids;
pub mod links;
pub mod loader;
pub mod panel;
pub mod period;
pub mod schema;

pub use delisting::{
    CodeRange, DelistingConfig, DelistingStats, MissingDelistingPolicy, apply_delisting,
};
pub use error::{DataError, Result};
pub use exchange::Exchange;
pub use ids::{CompanyId, FundamentalsId, SecurityId};
pub use links::{LinkConfig, LinkMatch, LinkResolver};
pub use loader::{CsvPanelLoader, PanelLoader, Panels};
pub use panel::{FundamentalYear, LinkPrimary, LinkSpan, LinkType, SecurityMonth};
pub use period::{FiscalPeriod, month_end, shift_months};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
