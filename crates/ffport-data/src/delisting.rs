//! Delisting-return adjustment applied to the security panel before the
//! portfolio engine sees it.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. no delisting code: the row is unchanged;
//! 2. code and delisting return both present: the delisting return replaces
//!    the return and the ex-distribution return;
//! 3. code in the liquidation set: a fixed return (default -30%);
//! 4. code in the performance-neutral set: the row is unchanged;
//! 5. anything else: [`MissingDelistingPolicy`].

use crate::panel::SecurityMonth;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::debug;

/// What to do with a delisted observation whose delisting return is
/// missing and whose code is in neither configured set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDelistingPolicy {
    /// Drop the observation
    #[default]
    Exclude,
    /// Treat the security as worthless (-100%)
    TotalLoss,
    /// Keep the regular monthly return
    KeepReturn,
}

impl MissingDelistingPolicy {
    /// Parse a policy name as used on the command line.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exclude" => Some(Self::Exclude),
            "total-loss" | "total_loss" => Some(Self::TotalLoss),
            "keep" | "keep-return" | "keep_return" => Some(Self::KeepReturn),
            _ => None,
        }
    }
}

/// Inclusive range of delisting codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRange {
    /// First code
    pub start: i64,
    /// Last code
    pub end: i64,
}

impl CodeRange {
    /// Range covering `start..=end`.
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Range covering a single code.
    pub const fn single(code: i64) -> Self {
        Self::new(code, code)
    }

    /// Whether `code` falls in the range.
    pub const fn contains(&self, code: i64) -> bool {
        self.start <= code && code <= self.end
    }
}

impl From<RangeInclusive<i64>> for CodeRange {
    fn from(range: RangeInclusive<i64>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Configuration for the delisting adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelistingConfig {
    /// Codes treated as liquidation or worthless delistings
    pub liquidation_codes: Vec<CodeRange>,
    /// Return assigned to liquidation delistings without a delisting return
    pub liquidation_return: f64,
    /// Codes treated as performance-neutral events
    pub neutral_codes: Vec<CodeRange>,
    /// Policy for every other delisting without a delisting return
    pub missing_policy: MissingDelistingPolicy,
}

impl Default for DelistingConfig {
    fn default() -> Self {
        Self {
            liquidation_codes: vec![
                CodeRange::single(500),
                CodeRange::single(520),
                CodeRange::new(551, 574),
                CodeRange::single(580),
                CodeRange::single(584),
            ],
            liquidation_return: -0.30,
            neutral_codes: vec![CodeRange::new(100, 399)],
            missing_policy: MissingDelistingPolicy::default(),
        }
    }
}

impl DelistingConfig {
    fn is_liquidation(&self, code: i64) -> bool {
        self.liquidation_codes.iter().any(|r| r.contains(code))
    }

    fn is_neutral(&self, code: i64) -> bool {
        self.neutral_codes.iter().any(|r| r.contains(code))
    }
}

/// Counts of each delisting outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelistingStats {
    /// Rows without a delisting code
    pub not_delisted: usize,
    /// Rows whose delisting return replaced the return
    pub delisting_return_used: usize,
    /// Rows assigned the liquidation return
    pub liquidation: usize,
    /// Rows with a neutral code, left unchanged
    pub neutral: usize,
    /// Rows dropped by [`MissingDelistingPolicy::Exclude`]
    pub excluded: usize,
    /// Rows set to -100% by [`MissingDelistingPolicy::TotalLoss`]
    pub total_loss: usize,
    /// Rows kept by [`MissingDelistingPolicy::KeepReturn`]
    pub kept: usize,
}

/// Adjust returns for delisting. Returns the adjusted panel and outcome
/// counts.
pub fn apply_delisting(
    rows: Vec<SecurityMonth>,
    config: &DelistingConfig,
) -> (Vec<SecurityMonth>, DelistingStats) {
    let mut stats = DelistingStats::default();
    let mut out = Vec::with_capacity(rows.len());

    for mut row in rows {
        let Some(code) = row.delisting_code else {
            stats.not_delisted += 1;
            out.push(row);
            continue;
        };

        if let Some(dlret) = row.delisting_return {
            row.ret = Some(dlret);
            row.retx = Some(dlret);
            stats.delisting_return_used += 1;
        } else if config.is_liquidation(code) {
            row.ret = Some(config.liquidation_return);
            row.retx = Some(config.liquidation_return);
            stats.liquidation += 1;
        } else if config.is_neutral(code) {
            stats.neutral += 1;
        } else {
            match config.missing_policy {
                MissingDelistingPolicy::Exclude => {
                    stats.excluded += 1;
                    continue;
                }
                MissingDelistingPolicy::TotalLoss => {
                    row.ret = Some(-1.0);
                    row.retx = Some(-1.0);
                    stats.total_loss += 1;
                }
                MissingDelistingPolicy::KeepReturn => stats.kept += 1,
            }
        }
        out.push(row);
    }

    debug!(?stats, "Applied delisting adjustment");
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CompanyId, SecurityId};
    use chrono::NaiveDate;
    use rstest::rstest;

    fn row(code: Option<i64>, dlret: Option<f64>) -> SecurityMonth {
        let mut row = SecurityMonth::new(
            SecurityId(1),
            CompanyId(1),
            NaiveDate::from_ymd_opt(2001, 3, 31).unwrap(),
        );
        row.ret = Some(0.05);
        row.retx = Some(0.04);
        row.delisting_code = code;
        row.delisting_return = dlret;
        row
    }

    fn adjust(row: SecurityMonth, policy: MissingDelistingPolicy) -> Option<SecurityMonth> {
        let config = DelistingConfig {
            missing_policy: policy,
            ..Default::default()
        };
        apply_delisting(vec![row], &config).0.into_iter().next()
    }

    #[test]
    fn test_no_code_keeps_return() {
        let out = adjust(row(None, Some(-0.5)), MissingDelistingPolicy::Exclude).unwrap();
        assert_eq!(out.ret, Some(0.05));
        assert_eq!(out.retx, Some(0.04));
    }

    #[test]
    fn test_delisting_return_replaces_both_returns() {
        let out = adjust(row(Some(560), Some(-0.8)), MissingDelistingPolicy::Exclude).unwrap();
        assert_eq!(out.ret, Some(-0.8));
        assert_eq!(out.retx, Some(-0.8));
    }

    #[rstest]
    #[case(500)]
    #[case(520)]
    #[case(551)]
    #[case(574)]
    #[case(580)]
    #[case(584)]
    fn test_liquidation_codes_get_fixed_return(#[case] code: i64) {
        let out = adjust(row(Some(code), None), MissingDelistingPolicy::Exclude).unwrap();
        assert_eq!(out.ret, Some(-0.30));
    }

    #[test]
    fn test_neutral_code_keeps_return() {
        let out = adjust(row(Some(231), None), MissingDelistingPolicy::Exclude).unwrap();
        assert_eq!(out.ret, Some(0.05));
    }

    #[rstest]
    #[case(MissingDelistingPolicy::Exclude, None)]
    #[case(MissingDelistingPolicy::TotalLoss, Some(-1.0))]
    #[case(MissingDelistingPolicy::KeepReturn, Some(0.05))]
    fn test_unknown_code_follows_policy(
        #[case] policy: MissingDelistingPolicy,
        #[case] expected: Option<f64>,
    ) {
        let out = adjust(row(Some(585), None), policy);
        assert_eq!(out.and_then(|r| r.ret), expected);
    }

    #[test]
    fn test_stats_count_each_outcome() {
        let rows = vec![
            row(None, None),
            row(Some(500), None),
            row(Some(100), None),
            row(Some(470), None),
            row(Some(331), Some(0.01)),
        ];
        let (out, stats) = apply_delisting(rows, &DelistingConfig::default());
        assert_eq!(out.len(), 4);
        assert_eq!(stats.not_delisted, 1);
        assert_eq!(stats.liquidation, 1);
        assert_eq!(stats.neutral, 1);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.delisting_return_used, 1);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            MissingDelistingPolicy::parse("total-loss"),
            Some(MissingDelistingPolicy::TotalLoss)
        );
        assert_eq!(
            MissingDelistingPolicy::parse("keep"),
            Some(MissingDelistingPolicy::KeepReturn)
        );
        assert!(MissingDelistingPolicy::parse("drop").is_none());
    }
}
