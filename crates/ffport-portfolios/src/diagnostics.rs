//! Counters for row- and cell-level exclusions.

use crate::aggregate::AggregationStats;
use crate::characteristics::MergeStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exclusions and data-quality events of one run. None of these abort the
/// run; each is counted where it happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Security months without a usable market equity
    pub missing_market_equity: usize,
    /// Company months with a tied representative security
    pub representative_ties: usize,
    /// Assigned firm-months with a return but no portfolio weight
    pub missing_weight: usize,
    /// Cells with returns but no positive weight sum
    pub zero_divisor_cells: usize,
    /// Snapshots resolved from overlapping links
    pub link_ambiguities: usize,
    /// Snapshots with no active link
    pub unlinked: usize,
    /// Linked snapshots without prior-year accounting data
    pub missing_fundamentals: usize,
    /// Firm-years missing each characteristic
    pub missing_characteristic: BTreeMap<String, usize>,
    /// Sort-years whose reference population was below the minimum
    pub degenerate_breakpoint_years: BTreeMap<String, usize>,
    /// Firm-years per sort left unassigned because their formation year
    /// had no breakpoints
    pub without_breakpoints: BTreeMap<String, usize>,
}

impl Diagnostics {
    /// Fold in the characteristic merge counters.
    pub fn record_merge(&mut self, stats: &MergeStats) {
        self.link_ambiguities += stats.link_ambiguities;
        self.unlinked += stats.unlinked;
        self.missing_fundamentals += stats.missing_fundamentals;
        for (name, count) in &stats.missing_characteristic {
            *self.missing_characteristic.entry(name.clone()).or_insert(0) += count;
        }
    }

    /// Fold in the aggregation counters of one sort.
    pub fn record_aggregation(&mut self, stats: &AggregationStats) {
        self.missing_weight += stats.missing_weight;
        self.zero_divisor_cells += stats.zero_divisor_cells;
    }

    /// Record the low-population breakpoint years of a sort.
    pub fn record_degenerate_years(&mut self, sort: &str, years: usize) {
        if years > 0 {
            *self
                .degenerate_breakpoint_years
                .entry(sort.to_string())
                .or_insert(0) += years;
        }
    }

    /// Record the firm-years a sort could not assign for want of breakpoints.
    pub fn record_without_breakpoints(&mut self, sort: &str, firm_years: usize) {
        if firm_years > 0 {
            *self.without_breakpoints.entry(sort.to_string()).or_insert(0) += firm_years;
        }
    }

    /// Total unassigned firm-years without breakpoints over all sorts.
    pub fn total_without_breakpoints(&self) -> usize {
        self.without_breakpoints.values().sum()
    }

    /// Total number of degenerate breakpoint years over all sorts.
    pub fn total_degenerate_years(&self) -> usize {
        self.degenerate_breakpoint_years.values().sum()
    }
}
