//! July-to-June fiscal-lag portfolio weights.
//!
//! The aligner runs one lazy query over the company panel, sorted by
//! company and month:
//!
//! - `cum_retx`: cumulative product of `1 + retx` over
//!   `(company, fiscal year)`, restarting every July. A missing `retx`
//!   yields a missing value for that month and the product continues past
//!   it.
//! - `lagged_me`: the previous row's market equity; on the company's first
//!   row it is bootstrapped as `me / (1 + retx)`, and is missing when that
//!   divisor is zero.
//! - `base_me`: `lagged_me` at fiscal month 1, joined back onto every month
//!   of the fiscal year.
//! - `weight`: `lagged_me` in July, otherwise `base_me` times the previous
//!   row's `cum_retx`. Without a July row the weight is missing for the
//!   whole fiscal year.
//!
//! December market equity and the June formation snapshot are derived from
//! the same company months.

use crate::error::Result;
use crate::frame::{floats, positions};
use crate::market_equity::CompanyMonth;
use chrono::{Datelike, NaiveDate};
use ffport_data::period::month_index;
use ffport_data::{CompanyId, Exchange, FiscalPeriod, SecurityId};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const ROW: &str = "row";
const COMPANY: &str = "company_id";
const MONTH: &str = "month";
const FISCAL_YEAR: &str = "fiscal_year";
const FIRST: &str = "first_month";
const RETX: &str = "retx";
const ME: &str = "me";
const GROSS: &str = "gross";
const PREV_ME: &str = "prev_me";
const PREV_CUM: &str = "prev_cum_retx";
const LAGGED_ME: &str = "lagged_me";
const CUM_RETX: &str = "cum_retx";
const BASE_ME: &str = "base_me";
const WEIGHT: &str = "weight";

/// A company month with its fiscal-lag portfolio weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedObservation {
    /// Company identifier
    pub company_id: CompanyId,
    /// Representative security
    pub security_id: SecurityId,
    /// Month-end date
    pub period: NaiveDate,
    /// Fiscal position of `period`
    pub fiscal: FiscalPeriod,
    /// Return
    pub ret: Option<f64>,
    /// Ex-distribution return
    pub retx: Option<f64>,
    /// Same-period company market equity
    pub market_equity: f64,
    /// Previous row's market equity (bootstrapped on the first row)
    pub lagged_me: Option<f64>,
    /// Fiscal-year cumulative ex-distribution return index
    pub cum_retx: Option<f64>,
    /// Lagged market equity at fiscal month 1
    pub base_me: Option<f64>,
    /// Portfolio weight
    pub weight: Option<f64>,
}

fn company_frame(months: &[CompanyMonth]) -> Result<DataFrame> {
    let fiscal: Vec<FiscalPeriod> = months.iter().map(|m| FiscalPeriod::of(m.period)).collect();
    Ok(df!(
        ROW => (0..months.len() as u64).collect::<Vec<u64>>(),
        COMPANY => months.iter().map(|m| m.company_id.0).collect::<Vec<i64>>(),
        MONTH => months.iter().map(|m| month_index(m.period)).collect::<Vec<i32>>(),
        FISCAL_YEAR => fiscal.iter().map(|f| f.year).collect::<Vec<i32>>(),
        FIRST => fiscal.iter().map(FiscalPeriod::is_first_month).collect::<Vec<bool>>(),
        RETX => months.iter().map(|m| m.retx).collect::<Vec<Option<f64>>>(),
        ME => months.iter().map(|m| m.market_equity).collect::<Vec<f64>>(),
    )?)
}

/// Compute fiscal-lag weights. `months` need not be sorted; the result is
/// ordered by company, then period.
pub fn align(months: &[CompanyMonth]) -> Result<Vec<WeightedObservation>> {
    let lagged = company_frame(months)?
        .lazy()
        .sort([COMPANY, MONTH], Default::default())
        .with_columns([(lit(1.0) + col(RETX)).alias(GROSS)])
        .with_columns([
            col(GROSS)
                .cum_prod(false)
                .over([col(COMPANY), col(FISCAL_YEAR)])
                .alias(CUM_RETX),
            col(ME).shift(lit(1)).over([col(COMPANY)]).alias(PREV_ME),
        ])
        .with_columns([
            col(CUM_RETX)
                .shift(lit(1))
                .over([col(COMPANY)])
                .alias(PREV_CUM),
            when(col(PREV_ME).is_not_null())
                .then(col(PREV_ME))
                .when(col(GROSS).neq(lit(0.0)))
                .then(col(ME) / col(GROSS))
                .otherwise(lit(NULL))
                .alias(LAGGED_ME),
        ]);

    let bases = lagged.clone().filter(col(FIRST)).select([
        col(COMPANY),
        col(FISCAL_YEAR),
        col(LAGGED_ME).alias(BASE_ME),
    ]);

    let df = lagged
        .join(
            bases,
            [col(COMPANY), col(FISCAL_YEAR)],
            [col(COMPANY), col(FISCAL_YEAR)],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([when(col(FIRST))
            .then(col(LAGGED_ME))
            .otherwise(col(BASE_ME) * col(PREV_CUM))
            .alias(WEIGHT)])
        .sort([COMPANY, MONTH], Default::default())
        .collect()?;

    let rows = positions(&df, ROW)?;
    let lagged_me = floats(&df, LAGGED_ME)?;
    let cum_retx = floats(&df, CUM_RETX)?;
    let base_me = floats(&df, BASE_ME)?;
    let weight = floats(&df, WEIGHT)?;

    let out: Vec<WeightedObservation> = rows
        .iter()
        .enumerate()
        .map(|(i, &row)| {
            let month = &months[row];
            WeightedObservation {
                company_id: month.company_id,
                security_id: month.security_id,
                period: month.period,
                fiscal: FiscalPeriod::of(month.period),
                ret: month.ret,
                retx: month.retx,
                market_equity: month.market_equity,
                lagged_me: lagged_me[i],
                cum_retx: cum_retx[i],
                base_me: base_me[i],
                weight: weight[i],
            }
        })
        .collect();

    let weighted = out.iter().filter(|o| o.weight.is_some()).count();
    debug!(
        observations = out.len(),
        weighted, "Computed fiscal-lag weights"
    );
    Ok(out)
}

/// December market equity of calendar year `t - 1`, keyed by
/// `(company, t)`.
pub fn december_market_equity(months: &[CompanyMonth]) -> HashMap<(CompanyId, i32), f64> {
    months
        .iter()
        .filter(|m| m.period.month() == 12)
        .map(|m| ((m.company_id, m.period.year() + 1), m.market_equity))
        .collect()
}

/// A company's state at the end of June of a formation year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationSnapshot {
    /// Company identifier
    pub company_id: CompanyId,
    /// Representative security in June
    pub security_id: SecurityId,
    /// Formation year `t` (June of `t`); assignments apply to fiscal year `t`
    pub formation_year: i32,
    /// June month-end date
    pub period: NaiveDate,
    /// Exchange in June
    pub exchange: Exchange,
    /// SIC code in June
    pub sic: Option<i64>,
    /// June market equity
    pub june_me: f64,
    /// December `t - 1` market equity
    pub december_me: Option<f64>,
}

/// June snapshots, one per company and formation year.
pub fn formation_snapshots(months: &[CompanyMonth]) -> Vec<FormationSnapshot> {
    let december = december_market_equity(months);
    let mut snapshots: Vec<FormationSnapshot> = months
        .iter()
        .filter(|m| m.period.month() == 6)
        .map(|m| {
            let year = m.period.year();
            FormationSnapshot {
                company_id: m.company_id,
                security_id: m.security_id,
                formation_year: year,
                period: m.period,
                exchange: m.exchange,
                sic: m.sic,
                june_me: m.market_equity,
                december_me: december.get(&(m.company_id, year)).copied(),
            }
        })
        .collect();
    snapshots.sort_by_key(|s| (s.formation_year, s.company_id));
    snapshots
}
