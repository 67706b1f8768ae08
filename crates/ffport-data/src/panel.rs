//! Typed input records: security months, fundamental years and link spans.

use crate::exchange::Exchange;
use crate::ids::{CompanyId, FundamentalsId, SecurityId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One security-period observation from the monthly stock file.
///
/// `(security_id, period)` is unique across a decoded panel; `period` is
/// always a month end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityMonth {
    /// Security identifier
    pub security_id: SecurityId,
    /// Issuing company
    pub company_id: CompanyId,
    /// Month-end date
    pub period: NaiveDate,
    /// Holding-period return including distributions
    pub ret: Option<f64>,
    /// Return excluding distributions
    pub retx: Option<f64>,
    /// Shares outstanding
    pub shares_outstanding: Option<f64>,
    /// Price; negative values mark a bid/ask midpoint
    pub price: Option<f64>,
    /// Primary listing exchange
    pub exchange: Exchange,
    /// SIC industry code
    pub sic: Option<i64>,
    /// Delisting return
    pub delisting_return: Option<f64>,
    /// Delisting code
    pub delisting_code: Option<i64>,
}

impl SecurityMonth {
    /// Observation with identifiers and period set and every value missing.
    pub fn new(security_id: SecurityId, company_id: CompanyId, period: NaiveDate) -> Self {
        Self {
            security_id,
            company_id,
            period,
            ret: None,
            retx: None,
            shares_outstanding: None,
            price: None,
            exchange: Exchange::Other,
            sic: None,
            delisting_return: None,
            delisting_code: None,
        }
    }

    /// Market equity `|price| * shares`.
    ///
    /// Zero, negative or non-finite values are reported as missing so they
    /// never win representative selection or enter a weight.
    pub fn market_equity(&self) -> Option<f64> {
        let me = self.price?.abs() * self.shares_outstanding?;
        (me.is_finite() && me > 0.0).then_some(me)
    }
}

/// One firm-fiscal-year row of annual accounting data.
///
/// Field names follow the economic meaning; the Compustat mnemonic is noted
/// on each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalYear {
    /// Fundamentals identifier (`gvkey`)
    pub fundamentals_id: FundamentalsId,
    /// Fiscal period end date (`datadate`)
    pub fiscal_period_end: NaiveDate,
    /// Revenue (`sale`)
    pub sales: Option<f64>,
    /// Cost of goods sold (`cogs`)
    pub cogs: Option<f64>,
    /// Selling, general and administrative expense (`xsga`)
    pub sga: Option<f64>,
    /// Interest expense (`xint`)
    pub interest_expense: Option<f64>,
    /// Total assets (`at`)
    pub total_assets: Option<f64>,
    /// Total liabilities (`lt`)
    pub total_liabilities: Option<f64>,
    /// Stockholders' equity (`seq`)
    pub stockholders_equity: Option<f64>,
    /// Common equity (`ceq`)
    pub common_equity: Option<f64>,
    /// Preferred stock, par value (`pstk`)
    pub preferred_stock: Option<f64>,
    /// Preferred stock, redemption value (`pstkrv`)
    pub preferred_redemption: Option<f64>,
    /// Preferred stock, liquidating value (`pstkl`)
    pub preferred_liquidating: Option<f64>,
    /// Deferred taxes and investment tax credit (`txditc`)
    pub deferred_taxes_itc: Option<f64>,
    /// Deferred taxes (`txdb`)
    pub deferred_taxes: Option<f64>,
    /// Investment tax credit (`itcb`)
    pub investment_tax_credit: Option<f64>,
    /// Net income (`ni`)
    pub net_income: Option<f64>,
    /// Earnings before interest and taxes (`ebit`)
    pub ebit: Option<f64>,
    /// Depreciation and amortization (`dp`)
    pub depreciation: Option<f64>,
    /// Operating cash flow (`oancf`)
    pub operating_cash_flow: Option<f64>,
    /// Historical SIC code (`sich`)
    pub sic: Option<i64>,
}

impl FundamentalYear {
    /// Row with identifiers set and every accounting field missing.
    pub const fn new(fundamentals_id: FundamentalsId, fiscal_period_end: NaiveDate) -> Self {
        Self {
            fundamentals_id,
            fiscal_period_end,
            sales: None,
            cogs: None,
            sga: None,
            interest_expense: None,
            total_assets: None,
            total_liabilities: None,
            stockholders_equity: None,
            common_equity: None,
            preferred_stock: None,
            preferred_redemption: None,
            preferred_liquidating: None,
            deferred_taxes_itc: None,
            deferred_taxes: None,
            investment_tax_credit: None,
            net_income: None,
            ebit: None,
            depreciation: None,
            operating_cash_flow: None,
            sic: None,
        }
    }

    /// Calendar year in which the fiscal period ends.
    pub fn year(&self) -> i32 {
        self.fiscal_period_end.year()
    }
}

/// CCM link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkType {
    /// Link research complete, standard connection
    Lc,
    /// Unresearched link
    Lu,
    /// Link valid within a share class only
    Ls,
    /// No link available
    Nr,
    /// Any other link type
    Other,
}

impl LinkType {
    /// Decode a link type code.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "LC" => Self::Lc,
            "LU" => Self::Lu,
            "LS" => Self::Ls,
            "NR" => Self::Nr,
            _ => Self::Other,
        }
    }

    /// Preference rank used when links overlap; lower is preferred.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Lc => 0,
            Self::Lu => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Lc => "LC",
            Self::Lu => "LU",
            Self::Ls => "LS",
            Self::Nr => "NR",
            Self::Other => "??",
        };
        write!(f, "{code}")
    }
}

/// CCM primary link marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkPrimary {
    /// Primary security identified by Compustat
    Primary,
    /// Primary security assigned by CRSP
    CrspPrimary,
    /// Joiner secondary issue
    Joiner,
    /// Secondary issue
    Secondary,
    /// Any other marker
    Other,
}

impl LinkPrimary {
    /// Decode a primary link marker.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "P" => Self::Primary,
            "C" => Self::CrspPrimary,
            "J" => Self::Joiner,
            "N" => Self::Secondary,
            _ => Self::Other,
        }
    }

    /// Preference rank used when links overlap; lower is preferred.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::CrspPrimary => 1,
            _ => 2,
        }
    }
}

/// Validity span mapping a fundamentals record to a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpan {
    /// Fundamentals identifier
    pub fundamentals_id: FundamentalsId,
    /// Linked company
    pub company_id: CompanyId,
    /// First valid date
    pub link_start: NaiveDate,
    /// Last valid date; `None` means still active
    pub link_end: Option<NaiveDate>,
    /// Link type
    pub link_type: LinkType,
    /// Primary marker
    pub primary: LinkPrimary,
}

impl LinkSpan {
    /// Whether the link is valid on `date` (both ends inclusive).
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.link_start <= date && self.link_end.is_none_or(|end| date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_market_equity_uses_absolute_price() {
        let mut row = SecurityMonth::new(SecurityId(1), CompanyId(1), d(2020, 1, 31));
        row.price = Some(-12.5);
        row.shares_outstanding = Some(100.0);
        assert_relative_eq!(row.market_equity().unwrap(), 1250.0);
    }

    #[test]
    fn test_market_equity_zero_is_missing() {
        let mut row = SecurityMonth::new(SecurityId(1), CompanyId(1), d(2020, 1, 31));
        row.price = Some(10.0);
        row.shares_outstanding = Some(0.0);
        assert!(row.market_equity().is_none());

        row.shares_outstanding = None;
        assert!(row.market_equity().is_none());
    }

    #[test]
    fn test_link_activity_is_inclusive() {
        let link = LinkSpan {
            fundamentals_id: FundamentalsId::from("001000"),
            company_id: CompanyId(5),
            link_start: d(2000, 1, 1),
            link_end: Some(d(2005, 12, 31)),
            link_type: LinkType::Lc,
            primary: LinkPrimary::Primary,
        };
        assert!(link.is_active(d(2000, 1, 1)));
        assert!(link.is_active(d(2005, 12, 31)));
        assert!(!link.is_active(d(1999, 12, 31)));
        assert!(!link.is_active(d(2006, 1, 31)));

        let open = LinkSpan {
            link_end: None,
            ..link
        };
        assert!(open.is_active(d(2030, 6, 30)));
    }

    #[test]
    fn test_link_codes() {
        assert_eq!(LinkType::parse("lc"), LinkType::Lc);
        assert_eq!(LinkType::parse("LX"), LinkType::Other);
        assert!(LinkType::Lc.rank() < LinkType::Lu.rank());
        assert_eq!(LinkPrimary::parse("C"), LinkPrimary::CrspPrimary);
        assert!(LinkPrimary::Primary.rank() < LinkPrimary::CrspPrimary.rank());
    }
}
