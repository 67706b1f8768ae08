//! Annual quantile breakpoints on a reference subsample.

use crate::error::{PortfolioError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Quantile levels defining the cut points of a sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSet(Vec<f64>);

impl CutSet {
    /// Validated cut set: strictly increasing levels inside `(0, 1)`.
    pub fn new(levels: Vec<f64>) -> Result<Self> {
        if levels.is_empty() {
            return Err(PortfolioError::InvalidCutSet("no quantile levels".into()));
        }
        if levels.iter().any(|q| !(*q > 0.0 && *q < 1.0)) {
            return Err(PortfolioError::InvalidCutSet(format!(
                "levels must lie in (0, 1): {levels:?}"
            )));
        }
        if levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PortfolioError::InvalidCutSet(format!(
                "levels must be strictly increasing: {levels:?}"
            )));
        }
        Ok(Self(levels))
    }

    /// `n` equally spaced groups.
    pub fn equal(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(PortfolioError::InvalidCutSet(format!(
                "need at least two groups, got {n}"
            )));
        }
        Self::new((1..n).map(|i| i as f64 / n as f64).collect())
    }

    /// 30th and 70th percentiles.
    pub fn terciles() -> Self {
        Self(vec![0.3, 0.7])
    }

    /// 20th, 40th, 60th and 80th percentiles.
    pub fn quintiles() -> Self {
        Self(vec![0.2, 0.4, 0.6, 0.8])
    }

    /// 10th through 90th percentiles.
    pub fn deciles() -> Self {
        Self(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9])
    }

    /// Quantile levels.
    pub fn levels(&self) -> &[f64] {
        &self.0
    }

    /// Number of buckets the cut set produces.
    pub fn bucket_count(&self) -> usize {
        self.0.len() + 1
    }
}

/// Quantile of sorted data with linear interpolation between closest
/// ranks: `h = (n - 1) q`, `v[floor(h)] + (h - floor(h)) (v[floor(h)+1] - v[floor(h)])`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = (n - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Cut points for one formation year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Formation year the cut points belong to
    pub formation_year: i32,
    /// Ascending cut points
    pub cut_points: Vec<f64>,
    /// Reference firms the cut points were computed from
    pub population: usize,
}

impl Breakpoint {
    /// Zero-based bucket of `value`. A value equal to a cut point falls in
    /// the lower bucket.
    pub fn bucket(&self, value: f64) -> usize {
        self.cut_points.iter().filter(|c| **c < value).count()
    }
}

/// Breakpoints per formation year plus the number of low-population years.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakpoints {
    /// Breakpoints keyed by formation year
    pub by_year: BTreeMap<i32, Breakpoint>,
    /// Years whose reference population was below the minimum
    pub degenerate_years: usize,
}

impl Breakpoints {
    /// Breakpoints of a formation year.
    pub fn get(&self, year: i32) -> Option<&Breakpoint> {
        self.by_year.get(&year)
    }
}

/// Compute one breakpoint set per formation year from `(year, value)`
/// reference observations. Non-finite values are ignored.
pub fn compute_breakpoints(
    sample: impl IntoIterator<Item = (i32, f64)>,
    cuts: &CutSet,
    min_population: usize,
) -> Breakpoints {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (year, value) in sample {
        if value.is_finite() {
            by_year.entry(year).or_default().push(value);
        }
    }

    let mut out = Breakpoints::default();
    for (year, mut values) in by_year {
        values.sort_by(f64::total_cmp);
        let population = values.len();
        if population < min_population {
            out.degenerate_years += 1;
            warn!(
                year,
                population, min_population, "Low reference population for breakpoints"
            );
        }
        let cut_points = cuts
            .levels()
            .iter()
            .filter_map(|q| quantile(&values, *q))
            .collect();
        out.by_year.insert(
            year,
            Breakpoint {
                formation_year: year,
                cut_points,
                population,
            },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 2.0)]
    #[case(0.25, 4.0)]
    #[case(0.3, 4.4)]
    #[case(0.5, 6.0)]
    #[case(0.7, 7.6)]
    #[case(1.0, 10.0)]
    fn test_linear_quantile(#[case] q: f64, #[case] expected: f64) {
        let data = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert_relative_eq!(quantile(&data, q).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert!(quantile(&[], 0.5).is_none());
        assert_relative_eq!(quantile(&[3.0], 0.8).unwrap(), 3.0);
    }

    #[test]
    fn test_cut_set_validation() {
        assert!(CutSet::new(vec![]).is_err());
        assert!(CutSet::new(vec![0.5, 0.5]).is_err());
        assert!(CutSet::new(vec![0.0, 0.5]).is_err());
        assert_eq!(CutSet::equal(5).unwrap(), CutSet::quintiles());
        assert_eq!(CutSet::deciles().bucket_count(), 10);
    }

    #[test]
    fn test_ties_go_to_lower_bucket() {
        let bp = Breakpoint {
            formation_year: 2000,
            cut_points: vec![1.0, 2.0],
            population: 3,
        };
        assert_eq!(bp.bucket(0.5), 0);
        assert_eq!(bp.bucket(1.0), 0);
        assert_eq!(bp.bucket(1.5), 1);
        assert_eq!(bp.bucket(2.0), 1);
        assert_eq!(bp.bucket(2.1), 2);
    }

    #[test]
    fn test_breakpoints_are_per_year() {
        let sample = vec![(2000, 1.0), (2000, 2.0), (2000, 3.0), (2001, 10.0), (2001, 20.0)];
        let bps = compute_breakpoints(sample, &CutSet::new(vec![0.5]).unwrap(), 3);
        assert_relative_eq!(bps.get(2000).unwrap().cut_points[0], 2.0);
        assert_relative_eq!(bps.get(2001).unwrap().cut_points[0], 15.0);
        assert_eq!(bps.get(2001).unwrap().population, 2);
        assert_eq!(bps.degenerate_years, 1);
        assert!(bps.get(2002).is_none());
    }
}
