#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ffport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod assign;
pub mod breakpoints;
pub mod characteristics;
pub mod diagnostics;
pub mod error;
pub mod family;
pub mod fiscal;
mod frame;
pub mod index;
pub mod industry;
pub mod market_equity;
pub mod registry;

pub use aggregate::{
    AggregationStats, PortfolioMatrix, PortfolioReturns, ReturnKind, RowKey, aggregate_returns,
    characteristic_average,
};
pub use assign::{
    Assignments, BucketAssignment, LabelStyle, NON_POSITIVE_LABEL, ReferenceScreen, SortOutcome,
    UnivariateSort,
};
pub use breakpoints::{Breakpoint, Breakpoints, CutSet, compute_breakpoints, quantile};
pub use characteristics::{
    AccountingYear, Characteristic, CharacteristicConfig, FirmCharacteristics, InvestmentMeasure,
    MergeStats, merge_characteristics, prepare_accounting,
};
pub use diagnostics::Diagnostics;
pub use error::{PortfolioError, Result};
pub use family::{IndustryFamily, OpInvFamily, PortfolioFamily, RatioFamily, Sort};
pub use fiscal::{
    FormationSnapshot, WeightedObservation, align, december_market_equity, formation_snapshots,
};
pub use index::{MarketIndexRow, market_index};
pub use industry::{FiveIndustry, FiveIndustryClassifier, IndustryClassifier};
pub use market_equity::{CompanyMonth, ResolvedMarketEquity, resolve_market_equity};

// Re-export registry types for convenience
pub use registry::{FamilyInfo, available_families, create_family, families_using, family_info};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
