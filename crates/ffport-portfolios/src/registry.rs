//! Family Registry
//!
//! Central registry of the available portfolio families. Allows lookup and
//! instantiation by name.

use crate::characteristics::Characteristic;
use crate::error::{PortfolioError, Result};
use crate::family::{IndustryFamily, OpInvFamily, PortfolioFamily, RatioFamily};

/// Family metadata
#[derive(Debug, Clone)]
pub struct FamilyInfo {
    /// Family name (unique identifier)
    pub name: &'static str,
    /// Brief description of the sorts
    pub description: &'static str,
    /// Characteristics the family sorts on
    pub required_characteristics: &'static [Characteristic],
    /// Sorts produced by the family
    pub sorts: &'static [&'static str],
}

const RATIO_SORTS: &[&str] = &["terciles", "quintiles", "deciles"];

/// Get all available family info
pub fn available_families() -> Vec<FamilyInfo> {
    vec![
        FamilyInfo {
            name: "industry5",
            description: "Five industry portfolios from June SIC codes",
            required_characteristics: &[],
            sorts: &["industry5"],
        },
        FamilyInfo {
            name: "op_inv",
            description: "5x5 operating profitability and investment quintiles",
            required_characteristics: &[
                Characteristic::OperatingProfitability,
                Characteristic::Investment,
            ],
            sorts: &["op_inv"],
        },
        FamilyInfo {
            name: "ep",
            description: "Earnings to price with a non-positive bucket",
            required_characteristics: &[Characteristic::EarningsToPrice],
            sorts: RATIO_SORTS,
        },
        FamilyInfo {
            name: "cfp",
            description: "Cash flow to price with a non-positive bucket",
            required_characteristics: &[Characteristic::CashFlowToPrice],
            sorts: RATIO_SORTS,
        },
        FamilyInfo {
            name: "bm",
            description: "Book to market",
            required_characteristics: &[Characteristic::BookToMarket],
            sorts: RATIO_SORTS,
        },
    ]
}

/// Get family info by name
pub fn family_info(name: &str) -> Option<FamilyInfo> {
    available_families().into_iter().find(|f| f.name == name)
}

/// Families that sort on a characteristic
pub fn families_using(characteristic: Characteristic) -> Vec<FamilyInfo> {
    available_families()
        .into_iter()
        .filter(|f| f.required_characteristics.contains(&characteristic))
        .collect()
}

/// Instantiate a family by name
pub fn create_family(name: &str) -> Result<Box<dyn PortfolioFamily>> {
    let family: Box<dyn PortfolioFamily> = match name {
        "industry5" => Box::new(IndustryFamily::new()),
        "op_inv" => Box::<OpInvFamily>::default(),
        "ep" => Box::new(RatioFamily::earnings_to_price()),
        "cfp" => Box::new(RatioFamily::cash_flow_to_price()),
        "bm" => Box::new(RatioFamily::book_to_market()),
        other => return Err(PortfolioError::UnknownFamily(other.to_string())),
    };
    Ok(family)
}
