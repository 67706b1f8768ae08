//! Market index over the security panel.
//!
//! The value-weighted return of month `m` weights each security's return by
//! its market equity at its previous observation, so a security's first
//! month enters the equal-weighted average only.

use chrono::NaiveDate;
use ffport_data::{SecurityId, SecurityMonth};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One month of the market index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIndexRow {
    /// Month-end date
    pub period: NaiveDate,
    /// Value-weighted return
    pub vw_return: Option<f64>,
    /// Value-weighted ex-distribution return
    pub vw_return_ex: Option<f64>,
    /// Equal-weighted return
    pub ew_return: Option<f64>,
    /// Equal-weighted ex-distribution return
    pub ew_return_ex: Option<f64>,
    /// Current market equity of the securities in the value-weighted return
    pub total_market_value: f64,
    /// Distinct securities with a return
    pub security_count: usize,
}

#[derive(Default)]
struct Month {
    weight: f64,
    weighted_ret: f64,
    weight_ex: f64,
    weighted_retx: f64,
    total_market_value: f64,
    rets: Vec<f64>,
    retxs: Vec<f64>,
    securities: BTreeSet<SecurityId>,
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Compute the market index, one row per month with at least one return.
pub fn market_index(rows: &[SecurityMonth]) -> Vec<MarketIndexRow> {
    let mut by_security: BTreeMap<SecurityId, Vec<&SecurityMonth>> = BTreeMap::new();
    for row in rows {
        by_security.entry(row.security_id).or_default().push(row);
    }

    let mut months: BTreeMap<NaiveDate, Month> = BTreeMap::new();
    for history in by_security.values_mut() {
        history.sort_by_key(|r| r.period);
        let mut prev_me: Option<f64> = None;
        for row in history.iter() {
            let me = row.market_equity();
            if row.ret.is_some() || row.retx.is_some() {
                let month = months.entry(row.period).or_default();
                month.securities.insert(row.security_id);
                if let Some(r) = row.ret {
                    month.rets.push(r);
                }
                if let Some(r) = row.retx {
                    month.retxs.push(r);
                }
                if let (Some(w), Some(r)) = (prev_me, row.ret) {
                    month.weight += w;
                    month.weighted_ret += w * r;
                    month.total_market_value += me.unwrap_or(0.0);
                }
                if let (Some(w), Some(r)) = (prev_me, row.retx) {
                    month.weight_ex += w;
                    month.weighted_retx += w * r;
                }
            }
            prev_me = me;
        }
    }

    let index: Vec<MarketIndexRow> = months
        .into_iter()
        .map(|(period, m)| MarketIndexRow {
            period,
            vw_return: (m.weight > 0.0).then(|| m.weighted_ret / m.weight),
            vw_return_ex: (m.weight_ex > 0.0).then(|| m.weighted_retx / m.weight_ex),
            ew_return: mean(&m.rets),
            ew_return_ex: mean(&m.retxs),
            total_market_value: m.total_market_value,
            security_count: m.securities.len(),
        })
        .collect();
    debug!(months = index.len(), "Computed market index");
    index
}
