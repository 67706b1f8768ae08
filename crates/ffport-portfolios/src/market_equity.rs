//! Company-level market equity.
//!
//! Securities of the same company on the same date are collapsed into one
//! record carrying the company's total market equity. The record keeps the
//! returns, exchange and industry of the representative security, which is
//! the one with the largest individual market equity (lowest security id on
//! exact ties).

use chrono::NaiveDate;
use ffport_data::{CompanyId, Exchange, SecurityId, SecurityMonth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One company-period observation after market-equity resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMonth {
    /// Company identifier
    pub company_id: CompanyId,
    /// Representative security
    pub security_id: SecurityId,
    /// Month-end date
    pub period: NaiveDate,
    /// Sum of market equity over the company's securities
    pub market_equity: f64,
    /// Return of the representative security
    pub ret: Option<f64>,
    /// Ex-distribution return of the representative security
    pub retx: Option<f64>,
    /// Exchange of the representative security
    pub exchange: Exchange,
    /// SIC code of the representative security
    pub sic: Option<i64>,
}

/// Resolution output.
#[derive(Debug, Clone, Default)]
pub struct ResolvedMarketEquity {
    /// One row per (company, period), sorted by company then period
    pub months: Vec<CompanyMonth>,
    /// Security rows without a usable market equity
    pub missing_market_equity: usize,
    /// Company-periods where more than one security shared the maximum
    pub ties: usize,
}

/// Collapse securities into company-level market equity.
///
/// Rows whose market equity is missing or zero take no part in either the
/// sum or the representative choice; a company-period with no usable row
/// produces no output.
pub fn resolve_market_equity(rows: &[SecurityMonth]) -> ResolvedMarketEquity {
    let mut groups: BTreeMap<(CompanyId, NaiveDate), Vec<(&SecurityMonth, f64)>> = BTreeMap::new();
    let mut missing = 0usize;

    for row in rows {
        match row.market_equity() {
            Some(me) => groups
                .entry((row.company_id, row.period))
                .or_default()
                .push((row, me)),
            None => missing += 1,
        }
    }

    let mut ties = 0usize;
    let months = groups
        .into_iter()
        .filter_map(|((company_id, period), members)| {
            let total: f64 = members.iter().map(|(_, me)| me).sum();
            let max = members
                .iter()
                .map(|(_, me)| *me)
                .fold(f64::NEG_INFINITY, f64::max);
            let mut leaders = members.iter().filter(|(_, me)| *me == max);
            let (first, _) = leaders.clone().min_by_key(|(row, _)| row.security_id)?;
            if leaders.nth(1).is_some() {
                ties += 1;
            }
            Some(CompanyMonth {
                company_id,
                security_id: first.security_id,
                period,
                market_equity: total,
                ret: first.ret,
                retx: first.retx,
                exchange: first.exchange,
                sic: first.sic,
            })
        })
        .collect::<Vec<_>>();

    debug!(
        companies = months.len(),
        missing, ties, "Resolved company market equity"
    );
    ResolvedMarketEquity {
        months,
        missing_market_equity: missing,
        ties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32) -> NaiveDate {
        ffport_data::period::month_end_of(y, m).unwrap()
    }

    fn security(id: i64, company: i64, price: f64, shares: f64) -> SecurityMonth {
        let mut row = SecurityMonth::new(SecurityId(id), CompanyId(company), d(2020, 6));
        row.price = Some(price);
        row.shares_outstanding = Some(shares);
        row.ret = Some(id as f64 / 100.0);
        row
    }

    #[test]
    fn test_two_securities_sum_to_largest() {
        let rows = vec![security(11, 1, 1.0, 100.0), security(12, 1, 2.0, 200.0)];
        let resolved = resolve_market_equity(&rows);
        assert_eq!(resolved.months.len(), 1);
        let company = &resolved.months[0];
        assert_relative_eq!(company.market_equity, 500.0);
        assert_eq!(company.security_id, SecurityId(12));
        assert_eq!(company.ret, Some(0.12));
    }

    #[test]
    fn test_negative_price_is_absolute() {
        let rows = vec![security(11, 1, -4.0, 100.0), security(12, 1, 2.0, 100.0)];
        let resolved = resolve_market_equity(&rows);
        assert_relative_eq!(resolved.months[0].market_equity, 600.0);
        assert_eq!(resolved.months[0].security_id, SecurityId(11));
    }

    #[test]
    fn test_tie_breaks_on_lowest_security_id() {
        let rows = vec![security(30, 1, 1.0, 100.0), security(20, 1, 1.0, 100.0)];
        let resolved = resolve_market_equity(&rows);
        assert_eq!(resolved.months[0].security_id, SecurityId(20));
        assert_eq!(resolved.ties, 1);
    }

    #[test]
    fn test_zero_market_equity_is_excluded() {
        let rows = vec![security(11, 1, 0.0, 100.0), security(12, 2, 1.0, 0.0)];
        let resolved = resolve_market_equity(&rows);
        assert!(resolved.months.is_empty());
        assert_eq!(resolved.missing_market_equity, 2);
    }

    #[test]
    fn test_output_is_sorted_by_company_then_period() {
        let mut later = security(5, 1, 1.0, 1.0);
        later.period = d(2020, 7);
        let rows = vec![later, security(9, 2, 1.0, 1.0), security(5, 1, 1.0, 1.0)];
        let resolved = resolve_market_equity(&rows);
        let keys: Vec<_> = resolved
            .months
            .iter()
            .map(|m| (m.company_id.0, m.period))
            .collect();
        assert_eq!(keys, vec![(1, d(2020, 6)), (1, d(2020, 7)), (2, d(2020, 6))]);
    }
}
