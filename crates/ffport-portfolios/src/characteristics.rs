//! Accounting characteristics and their merge onto June snapshots.
//!
//! Fundamentals for the fiscal year ending in calendar year `y` are used at
//! the June `y + 1` formation date. Ratios divide by December `y` market
//! equity.

use crate::fiscal::FormationSnapshot;
use ffport_data::{
    CompanyId, Exchange, FundamentalYear, FundamentalsId, LinkResolver, SecurityId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// How asset growth is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentMeasure {
    /// `at(y) / at(y-1) - 1`
    #[default]
    Growth,
    /// `ln(at(y) / at(y-1))`
    LogGrowth,
}

/// Settings for characteristic derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacteristicConfig {
    /// Multiplier applied to accounting values before dividing by market
    /// equity (1000 when fundamentals are in millions and ME in thousands)
    pub fundamentals_scale: f64,
    /// Asset growth measure
    pub investment: InvestmentMeasure,
}

impl Default for CharacteristicConfig {
    fn default() -> Self {
        Self {
            fundamentals_scale: 1.0,
            investment: InvestmentMeasure::default(),
        }
    }
}

/// Sortable firm characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    /// Operating profitability
    OperatingProfitability,
    /// Asset growth
    Investment,
    /// Earnings to December market equity
    EarningsToPrice,
    /// Cash flow to December market equity
    CashFlowToPrice,
    /// Book equity to December market equity
    BookToMarket,
}

impl Characteristic {
    /// Returns all characteristics.
    pub fn all() -> Vec<Self> {
        vec![
            Self::OperatingProfitability,
            Self::Investment,
            Self::EarningsToPrice,
            Self::CashFlowToPrice,
            Self::BookToMarket,
        ]
    }

    /// Short name used in file names and diagnostics.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OperatingProfitability => "op",
            Self::Investment => "inv",
            Self::EarningsToPrice => "ep",
            Self::CashFlowToPrice => "cfp",
            Self::BookToMarket => "bm",
        }
    }

    /// Value of this characteristic for a firm-year.
    pub const fn value(&self, firm: &FirmCharacteristics) -> Option<f64> {
        match self {
            Self::OperatingProfitability => firm.operating_profitability,
            Self::Investment => firm.investment,
            Self::EarningsToPrice => firm.earnings_to_price,
            Self::CashFlowToPrice => firm.cash_flow_to_price,
            Self::BookToMarket => firm.book_to_market,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Book equity: stockholders' equity plus deferred taxes minus preferred
/// stock. Non-positive results are missing.
pub fn book_equity(f: &FundamentalYear) -> Option<f64> {
    let equity = f
        .stockholders_equity
        .or_else(|| Some(f.common_equity? + f.preferred_stock?))
        .or_else(|| Some(f.total_assets? - f.total_liabilities?))?;
    let deferred = f
        .deferred_taxes_itc
        .or_else(|| Some(f.deferred_taxes? + f.investment_tax_credit?))
        .unwrap_or(0.0);
    let preferred = f
        .preferred_redemption
        .or(f.preferred_liquidating)
        .or(f.preferred_stock)
        .unwrap_or(0.0);
    let be = equity + deferred - preferred;
    (be > 0.0).then_some(be)
}

/// Operating profitability `(sales - cogs - sga - interest) / be`.
///
/// Missing cost components count as zero, but sales and at least one cost
/// component must be present.
pub fn operating_profitability(f: &FundamentalYear, be: Option<f64>) -> Option<f64> {
    let sales = f.sales?;
    let costs = [f.cogs, f.sga, f.interest_expense];
    if costs.iter().all(Option::is_none) {
        return None;
    }
    let total: f64 = costs.iter().flatten().sum();
    Some((sales - total) / be?)
}

/// Cash flow `ebit + dp + txditc`, with missing add-backs as zero.
pub fn cash_flow(f: &FundamentalYear) -> Option<f64> {
    Some(f.ebit? + f.depreciation.unwrap_or(0.0) + f.deferred_taxes_itc.unwrap_or(0.0))
}

/// Asset growth from `prev_assets` to `assets`; missing if the base is not
/// positive.
pub fn investment(
    assets: Option<f64>,
    prev_assets: Option<f64>,
    measure: InvestmentMeasure,
) -> Option<f64> {
    let (at, prev) = (assets?, prev_assets?);
    if prev <= 0.0 {
        return None;
    }
    match measure {
        InvestmentMeasure::Growth => Some(at / prev - 1.0),
        InvestmentMeasure::LogGrowth => (at > 0.0).then(|| (at / prev).ln()),
    }
}

/// Accounting inputs for one firm and fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingYear {
    /// Fundamentals identifier
    pub fundamentals_id: FundamentalsId,
    /// Calendar year of the fiscal year end
    pub year: i32,
    /// Number of earlier years on file for this identifier
    pub history_years: usize,
    /// Book equity
    pub book_equity: Option<f64>,
    /// Operating profitability
    pub operating_profitability: Option<f64>,
    /// Asset growth into this year
    pub investment: Option<f64>,
    /// Net income
    pub earnings: Option<f64>,
    /// Cash flow
    pub cash_flow: Option<f64>,
    /// Historical SIC code
    pub sic: Option<i64>,
}

/// Keep the latest filing per identifier and year, then derive accounting
/// characteristics. Investment needs the immediately preceding year.
pub fn prepare_accounting(
    rows: &[FundamentalYear],
    config: &CharacteristicConfig,
) -> BTreeMap<(FundamentalsId, i32), AccountingYear> {
    let mut latest: BTreeMap<(FundamentalsId, i32), &FundamentalYear> = BTreeMap::new();
    for row in rows {
        let key = (row.fundamentals_id.clone(), row.year());
        match latest.get(&key) {
            Some(kept) if kept.fiscal_period_end >= row.fiscal_period_end => {}
            _ => {
                latest.insert(key, row);
            }
        }
    }
    let restated = rows.len() - latest.len();

    let mut out = BTreeMap::new();
    let mut previous: Option<(&FundamentalsId, i32, Option<f64>)> = None;
    let mut history = 0usize;
    for ((id, year), row) in &latest {
        let prev_assets = match previous {
            Some((prev_id, prev_year, assets)) if prev_id == id && prev_year + 1 == *year => assets,
            _ => None,
        };
        if previous.is_some_and(|(prev_id, _, _)| prev_id == id) {
            history += 1;
        } else {
            history = 0;
        }

        let be = book_equity(row);
        out.insert(
            (id.clone(), *year),
            AccountingYear {
                fundamentals_id: id.clone(),
                year: *year,
                history_years: history,
                book_equity: be,
                operating_profitability: operating_profitability(row, be),
                investment: investment(row.total_assets, prev_assets, config.investment),
                earnings: row.net_income,
                cash_flow: cash_flow(row),
                sic: row.sic,
            },
        );
        previous = Some((id, *year, row.total_assets));
    }

    debug!(
        firm_years = out.len(),
        restated, "Prepared accounting characteristics"
    );
    out
}

/// June snapshot joined with lagged accounting data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmCharacteristics {
    /// Company identifier
    pub company_id: CompanyId,
    /// Representative security in June
    pub security_id: SecurityId,
    /// Formation year
    pub formation_year: i32,
    /// Exchange in June
    pub exchange: Exchange,
    /// SIC code in June, falling back to the fundamentals SIC
    pub sic: Option<i64>,
    /// June market equity
    pub june_me: f64,
    /// December market equity of the prior year
    pub december_me: Option<f64>,
    /// Linked fundamentals record
    pub fundamentals_id: Option<FundamentalsId>,
    /// Years of earlier accounting history
    pub history_years: usize,
    /// Book equity
    pub book_equity: Option<f64>,
    /// Operating profitability
    pub operating_profitability: Option<f64>,
    /// Asset growth
    pub investment: Option<f64>,
    /// Earnings to price
    pub earnings_to_price: Option<f64>,
    /// Cash flow to price
    pub cash_flow_to_price: Option<f64>,
    /// Book to market
    pub book_to_market: Option<f64>,
}

/// Counters from the characteristic merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Snapshots with no active link
    pub unlinked: usize,
    /// Snapshots resolved from more than one active link
    pub link_ambiguities: usize,
    /// Linked snapshots without accounting data for the prior year
    pub missing_fundamentals: usize,
    /// Firm-years missing each characteristic
    pub missing_characteristic: BTreeMap<String, usize>,
}

fn ratio(numerator: Option<f64>, dec_me: Option<f64>, scale: f64) -> Option<f64> {
    let me = dec_me.filter(|me| *me > 0.0)?;
    Some(numerator? * scale / me)
}

/// Join each June snapshot to the accounting year ending in the previous
/// calendar year through the link table, and derive price ratios.
pub fn merge_characteristics(
    snapshots: &[FormationSnapshot],
    accounting: &BTreeMap<(FundamentalsId, i32), AccountingYear>,
    links: &LinkResolver,
    config: &CharacteristicConfig,
) -> (Vec<FirmCharacteristics>, MergeStats) {
    let mut stats = MergeStats::default();
    let scale = config.fundamentals_scale;

    let firms: Vec<FirmCharacteristics> = snapshots
        .iter()
        .map(|snap| {
            let link = links.resolve(snap.company_id, snap.period);
            match link {
                None => stats.unlinked += 1,
                Some(m) if m.is_ambiguous() => stats.link_ambiguities += 1,
                Some(_) => {}
            }
            let fundamentals_id = link.map(|m| m.fundamentals_id.clone());
            let acct = fundamentals_id
                .as_ref()
                .and_then(|id| accounting.get(&(id.clone(), snap.formation_year - 1)));
            if fundamentals_id.is_some() && acct.is_none() {
                stats.missing_fundamentals += 1;
            }

            FirmCharacteristics {
                company_id: snap.company_id,
                security_id: snap.security_id,
                formation_year: snap.formation_year,
                exchange: snap.exchange,
                sic: snap.sic.or_else(|| acct.and_then(|a| a.sic)),
                june_me: snap.june_me,
                december_me: snap.december_me,
                fundamentals_id,
                history_years: acct.map_or(0, |a| a.history_years),
                book_equity: acct.and_then(|a| a.book_equity),
                operating_profitability: acct.and_then(|a| a.operating_profitability),
                investment: acct.and_then(|a| a.investment),
                earnings_to_price: ratio(acct.and_then(|a| a.earnings), snap.december_me, scale),
                cash_flow_to_price: ratio(acct.and_then(|a| a.cash_flow), snap.december_me, scale),
                book_to_market: ratio(acct.and_then(|a| a.book_equity), snap.december_me, scale),
            }
        })
        .collect();

    for characteristic in Characteristic::all() {
        let missing = firms
            .iter()
            .filter(|f| characteristic.value(f).is_none())
            .count();
        stats
            .missing_characteristic
            .insert(characteristic.code().to_string(), missing);
    }
    if stats.link_ambiguities > 0 {
        warn!(
            count = stats.link_ambiguities,
            "Overlapping links resolved by preference order"
        );
    }
    debug!(
        firm_years = firms.len(),
        unlinked = stats.unlinked,
        "Merged characteristics"
    );
    (firms, stats)
}
