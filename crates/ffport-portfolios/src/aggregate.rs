//! Portfolio return aggregation.
//!
//! Each weighted observation is matched to its firm's bucket for the
//! observation's fiscal year, then grouped by (period, bucket):
//!
//! - value-weighted return `Σ w r / Σ w` over firms with both a weight and a
//!   return; null when no such firm exists or the weights sum to zero
//! - equal-weighted return, the mean return of firms with a return
//! - firm count, the number of firms with a return
//! - average firm size, the mean market equity of the bucket's firms
//!
//! Annual matrices compound each firm's monthly returns over the fiscal
//! year and weight them with the firm's fiscal-month-1 weight. Non-finite
//! weights are treated as missing.

use crate::assign::Assignments;
use crate::characteristics::{Characteristic, FirmCharacteristics};
use crate::error::{PortfolioError, Result};
use crate::fiscal::WeightedObservation;
use crate::frame::{floats, ints, positions};
use chrono::{Datelike, NaiveDate};
use ffport_data::period::month_end_of;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const KEY: &str = "key";
const FISCAL_YEAR: &str = "fiscal_year";
const COMPANY: &str = "company_id";
const FIRST: &str = "first_month";
const BUCKET: &str = "bucket";
const RET: &str = "ret";
const WEIGHT: &str = "weight";
const ME: &str = "me";
const GROSS: &str = "gross";
const WR_SUM: &str = "wr_sum";
const W_SUM: &str = "w_sum";
const W_COUNT: &str = "w_count";
const MISSING_WEIGHT: &str = "missing_weight";
const VW: &str = "vw";
const EW: &str = "ew";
const COUNT: &str = "count";
const SIZE: &str = "size";

/// Row key of a result matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowKey {
    /// Month-end date, written `YYYYMM`
    Month(NaiveDate),
    /// Fiscal or formation year, written `YYYY`
    Year(i32),
}

impl RowKey {
    /// Parse `YYYYMM`, `YYYY` or `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
            let year = s[..4].parse().ok()?;
            let month = s[4..].parse().ok()?;
            return month_end_of(year, month).map(Self::Month);
        }
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
            return s.parse().ok().map(Self::Year);
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        month_end_of(date.year(), date.month()).map(Self::Month)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month(date) => write!(f, "{}", date.format("%Y%m")),
            Self::Year(year) => write!(f, "{year}"),
        }
    }
}

/// A result table: rows are periods, columns are bucket labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioMatrix {
    /// Table name, e.g. `vw_monthly`
    pub name: String,
    /// Column labels in sort order
    pub labels: Vec<String>,
    /// Row values, one entry per label
    pub rows: BTreeMap<RowKey, Vec<Option<f64>>>,
}

impl PortfolioMatrix {
    /// Empty matrix with the given columns.
    pub fn new(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            labels,
            rows: BTreeMap::new(),
        }
    }

    /// Insert a row, checking its width.
    pub fn insert_row(&mut self, key: RowKey, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.labels.len() {
            return Err(PortfolioError::InvalidMatrix(format!(
                "{}: row {key} has {} values for {} labels",
                self.name,
                values.len(),
                self.labels.len()
            )));
        }
        self.rows.insert(key, values);
        Ok(())
    }

    /// Value at a row and label.
    pub fn get(&self, key: RowKey, label: &str) -> Option<f64> {
        let col = self.labels.iter().position(|l| l == label)?;
        self.rows.get(&key)?.get(col).copied().flatten()
    }

    /// One column as `(row, value)` pairs.
    pub fn column(&self, label: &str) -> Option<Vec<(RowKey, Option<f64>)>> {
        let col = self.labels.iter().position(|l| l == label)?;
        Some(self.rows.iter().map(|(k, v)| (*k, v[col])).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert to a `DataFrame` with a leading `period` column.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let periods: Vec<String> = self.rows.keys().map(|k| k.to_string()).collect();
        let mut columns: Vec<Column> = vec![Series::new("period".into(), periods).into()];
        for (i, label) in self.labels.iter().enumerate() {
            let values: Vec<Option<f64>> = self.rows.values().map(|r| r[i]).collect();
            columns.push(Series::new(label.as_str().into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Which return series is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnKind {
    /// Return including distributions
    #[default]
    Total,
    /// Return excluding distributions
    ExDistribution,
}

impl ReturnKind {
    fn pick(self, obs: &WeightedObservation) -> Option<f64> {
        match self {
            Self::Total => obs.ret,
            Self::ExDistribution => obs.retx,
        }
    }
}

/// Result matrices of one sort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioReturns {
    /// Monthly value-weighted returns
    pub vw_monthly: PortfolioMatrix,
    /// Monthly equal-weighted returns
    pub ew_monthly: PortfolioMatrix,
    /// Annual value-weighted returns
    pub vw_annual: PortfolioMatrix,
    /// Annual equal-weighted returns
    pub ew_annual: PortfolioMatrix,
    /// Monthly firm counts
    pub firm_count: PortfolioMatrix,
    /// Monthly average firm size
    pub avg_size: PortfolioMatrix,
    /// Formation-time averages of the sorting characteristics
    pub characteristic_averages: Vec<PortfolioMatrix>,
}

impl PortfolioReturns {
    /// Every table in output order.
    pub fn tables(&self) -> Vec<&PortfolioMatrix> {
        let mut tables = vec![
            &self.vw_monthly,
            &self.ew_monthly,
            &self.vw_annual,
            &self.ew_annual,
            &self.firm_count,
            &self.avg_size,
        ];
        tables.extend(self.characteristic_averages.iter());
        tables
    }
}

/// Counters from aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStats {
    /// Assigned firm-months with a return but no weight
    pub missing_weight: usize,
    /// Monthly and annual cells with returns whose value-weighted return is
    /// undefined
    pub zero_divisor_cells: usize,
}

/// Per-cell statistics of a frame with `key`, `bucket`, `ret`, `weight` and
/// `me` columns, one row per (key, bucket).
fn cell_statistics(frame: LazyFrame) -> Result<DataFrame> {
    Ok(frame
        .group_by_stable([col(KEY), col(BUCKET)])
        .agg([
            col(RET)
                .is_not_null()
                .and(col(WEIGHT).is_null())
                .sum()
                .alias(MISSING_WEIGHT),
            // weights only count where the firm has a return
            when(col(RET).is_not_null())
                .then(col(WEIGHT))
                .otherwise(lit(NULL))
                .count()
                .alias(W_COUNT),
            (col(WEIGHT) * col(RET)).sum().alias(WR_SUM),
            when(col(RET).is_not_null())
                .then(col(WEIGHT))
                .otherwise(lit(NULL))
                .sum()
                .alias(W_SUM),
            col(RET).mean().alias(EW),
            col(RET).count().alias(COUNT),
            col(ME).mean().alias(SIZE),
        ])
        .with_columns([when(col(W_COUNT).gt(lit(0)).and(col(W_SUM).neq(lit(0.0))))
            .then(col(WR_SUM) / col(W_SUM))
            .otherwise(lit(NULL))
            .alias(VW)])
        .collect()?)
}

/// Collected cell statistics with decoded row keys.
struct Cells {
    keys: Vec<RowKey>,
    buckets: Vec<usize>,
    stats: DataFrame,
}

impl Cells {
    fn new(stats: DataFrame, key: impl Fn(i64) -> Option<RowKey>) -> Result<Self> {
        let keys = ints(&stats, KEY)?
            .into_iter()
            .map(|k| {
                k.and_then(&key).ok_or_else(|| {
                    PortfolioError::InvalidMatrix(format!("invalid row key {k:?}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let buckets = positions(&stats, BUCKET)?;
        Ok(Self {
            keys,
            buckets,
            stats,
        })
    }

    /// Matrix of one statistic; buckets without observations in a row
    /// hold `empty`.
    fn matrix(
        &self,
        name: &str,
        labels: &[String],
        column: &str,
        empty: Option<f64>,
    ) -> Result<PortfolioMatrix> {
        let values = floats(&self.stats, column)?;
        let mut matrix = PortfolioMatrix::new(name, labels.to_vec());
        for ((key, &bucket), value) in self.keys.iter().zip(&self.buckets).zip(values) {
            let row = matrix
                .rows
                .entry(*key)
                .or_insert_with(|| vec![empty; labels.len()]);
            row[bucket] = value;
        }
        Ok(matrix)
    }

    fn zero_divisor_cells(&self) -> Result<usize> {
        let counts = ints(&self.stats, COUNT)?;
        let vw = floats(&self.stats, VW)?;
        Ok(counts
            .iter()
            .zip(&vw)
            .filter(|(n, v)| n.unwrap_or(0) > 0 && v.is_none())
            .count())
    }

    fn missing_weight(&self) -> Result<usize> {
        Ok(ints(&self.stats, MISSING_WEIGHT)?
            .into_iter()
            .flatten()
            .sum::<i64>() as usize)
    }
}

fn month_key(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 100 + i64::from(date.month())
}

fn from_month_key(key: i64) -> Option<RowKey> {
    let year = i32::try_from(key / 100).ok()?;
    let month = u32::try_from(key % 100).ok()?;
    month_end_of(year, month).map(RowKey::Month)
}

fn from_year_key(key: i64) -> Option<RowKey> {
    i32::try_from(key).ok().map(RowKey::Year)
}

fn observation_frame(
    observations: &[WeightedObservation],
    assignments: &Assignments,
    kind: ReturnKind,
) -> Result<DataFrame> {
    let assigned: Vec<(&WeightedObservation, usize)> = observations
        .iter()
        .filter_map(|o| {
            assignments
                .index(o.company_id, o.fiscal.year)
                .map(|bucket| (o, bucket))
        })
        .collect();
    Ok(df!(
        KEY => assigned.iter().map(|(o, _)| month_key(o.period)).collect::<Vec<i64>>(),
        FISCAL_YEAR => assigned.iter().map(|(o, _)| i64::from(o.fiscal.year)).collect::<Vec<i64>>(),
        FIRST => assigned.iter().map(|(o, _)| o.fiscal.is_first_month()).collect::<Vec<bool>>(),
        COMPANY => assigned.iter().map(|(o, _)| o.company_id.0).collect::<Vec<i64>>(),
        BUCKET => assigned.iter().map(|(_, b)| *b as u64).collect::<Vec<u64>>(),
        RET => assigned.iter().map(|(o, _)| kind.pick(o)).collect::<Vec<Option<f64>>>(),
        WEIGHT => assigned
            .iter()
            .map(|(o, _)| o.weight.filter(|w| w.is_finite()))
            .collect::<Vec<Option<f64>>>(),
        ME => assigned.iter().map(|(o, _)| o.market_equity).collect::<Vec<f64>>(),
    )?)
}

/// Aggregate observations into the monthly and annual matrices of one sort.
/// Characteristic averages are left empty.
pub fn aggregate_returns(
    observations: &[WeightedObservation],
    assignments: &Assignments,
    kind: ReturnKind,
) -> Result<(PortfolioReturns, AggregationStats)> {
    let labels = assignments.labels();
    let frame = observation_frame(observations, assignments, kind)?.lazy();

    let monthly = Cells::new(cell_statistics(frame.clone())?, from_month_key)?;

    // one row per firm and fiscal year: compounded return, July weight
    let firm_years = frame
        .group_by_stable([col(FISCAL_YEAR), col(COMPANY)])
        .agg([
            col(BUCKET).first(),
            (lit(1.0) + col(RET)).product().alias(GROSS),
            col(RET).count().alias(COUNT),
            col(WEIGHT).filter(col(FIRST)).first(),
            col(ME).mean(),
        ])
        .select([
            col(FISCAL_YEAR).alias(KEY),
            col(BUCKET),
            when(col(COUNT).gt(lit(0)))
                .then(col(GROSS) - lit(1.0))
                .otherwise(lit(NULL))
                .alias(RET),
            col(WEIGHT),
            col(ME),
        ]);
    let annual = Cells::new(cell_statistics(firm_years)?, from_year_key)?;

    let stats = AggregationStats {
        missing_weight: monthly.missing_weight()?,
        zero_divisor_cells: monthly.zero_divisor_cells()? + annual.zero_divisor_cells()?,
    };
    let returns = PortfolioReturns {
        vw_monthly: monthly.matrix("vw_monthly", labels, VW, None)?,
        ew_monthly: monthly.matrix("ew_monthly", labels, EW, None)?,
        vw_annual: annual.matrix("vw_annual", labels, VW, None)?,
        ew_annual: annual.matrix("ew_annual", labels, EW, None)?,
        firm_count: monthly.matrix("firm_count", labels, COUNT, Some(0.0))?,
        avg_size: monthly.matrix("avg_size", labels, SIZE, None)?,
        characteristic_averages: Vec::new(),
    };

    debug!(
        months = returns.vw_monthly.len(),
        years = returns.vw_annual.len(),
        missing_weight = stats.missing_weight,
        zero_divisor_cells = stats.zero_divisor_cells,
        "Aggregated portfolio returns"
    );
    Ok((returns, stats))
}

/// June-market-equity-weighted average of a characteristic per formation
/// year and bucket.
pub fn characteristic_average(
    firms: &[FirmCharacteristics],
    assignments: &Assignments,
    characteristic: Characteristic,
) -> Result<PortfolioMatrix> {
    let assigned: Vec<(&FirmCharacteristics, usize)> = firms
        .iter()
        .filter_map(|f| {
            assignments
                .index(f.company_id, f.formation_year)
                .map(|bucket| (f, bucket))
        })
        .collect();
    let frame = df!(
        KEY => assigned.iter().map(|(f, _)| i64::from(f.formation_year)).collect::<Vec<i64>>(),
        BUCKET => assigned.iter().map(|(_, b)| *b as u64).collect::<Vec<u64>>(),
        RET => assigned.iter().map(|(f, _)| characteristic.value(f)).collect::<Vec<Option<f64>>>(),
        WEIGHT => assigned.iter().map(|(f, _)| Some(f.june_me)).collect::<Vec<Option<f64>>>(),
        ME => assigned.iter().map(|(f, _)| f.june_me).collect::<Vec<f64>>(),
    )?;
    Cells::new(cell_statistics(frame.lazy())?, from_year_key)?.matrix(
        &format!("avg_{}", characteristic.code()),
        assignments.labels(),
        VW,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ffport_data::{CompanyId, FiscalPeriod, SecurityId};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn obs(
        company: i64,
        y: i32,
        m: u32,
        ret: Option<f64>,
        weight: Option<f64>,
    ) -> WeightedObservation {
        let period = month_end_of(y, m).unwrap();
        WeightedObservation {
            company_id: CompanyId(company),
            security_id: SecurityId(company),
            period,
            fiscal: FiscalPeriod::of(period),
            ret,
            retx: ret,
            market_equity: 100.0 * company as f64,
            lagged_me: weight,
            cum_retx: None,
            base_me: weight,
            weight,
        }
    }

    fn two_buckets() -> Assignments {
        let mut a = Assignments::new(vec!["Lo".into(), "Hi".into()]);
        for c in 1..=3 {
            a.insert(CompanyId(c), 2020, usize::from(c == 3));
        }
        a
    }

    #[test]
    fn test_value_and_equal_weighted_cell() {
        let rows = vec![
            obs(1, 2020, 7, Some(0.10), Some(100.0)),
            obs(2, 2020, 7, Some(-0.05), Some(300.0)),
            obs(3, 2020, 7, Some(0.02), Some(50.0)),
        ];
        let (out, stats) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        let key = RowKey::Month(month_end_of(2020, 7).unwrap());

        let vw = out.vw_monthly.get(key, "Lo").unwrap();
        assert_relative_eq!(vw, (100.0 * 0.10 + 300.0 * -0.05) / 400.0, epsilon = 1e-12);
        assert_relative_eq!(out.ew_monthly.get(key, "Lo").unwrap(), 0.025, epsilon = 1e-12);
        assert_relative_eq!(out.vw_monthly.get(key, "Hi").unwrap(), 0.02, epsilon = 1e-12);
        assert_eq!(out.firm_count.get(key, "Lo"), Some(2.0));
        assert_relative_eq!(out.avg_size.get(key, "Lo").unwrap(), 150.0);
        assert_eq!(stats, AggregationStats::default());
    }

    #[test]
    fn test_all_null_weights_give_null_not_zero() {
        let rows = vec![
            obs(1, 2020, 8, Some(0.10), None),
            obs(2, 2020, 8, Some(0.20), None),
        ];
        let (out, stats) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        let key = RowKey::Month(month_end_of(2020, 8).unwrap());
        assert!(out.vw_monthly.get(key, "Lo").is_none());
        assert_relative_eq!(out.ew_monthly.get(key, "Lo").unwrap(), 0.15, epsilon = 1e-12);
        assert_eq!(stats.missing_weight, 2);
        // the August cell and the 2020 annual cell, which has no July weight
        assert_eq!(stats.zero_divisor_cells, 2);
        assert!(out.vw_annual.get(RowKey::Year(2020), "Lo").is_none());
        assert!(out.ew_annual.get(RowKey::Year(2020), "Lo").is_some());
    }

    #[test]
    fn test_zero_weight_sum_is_null() {
        let rows = vec![obs(1, 2020, 8, Some(0.10), Some(0.0))];
        let (out, stats) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        let key = RowKey::Month(month_end_of(2020, 8).unwrap());
        assert!(out.vw_monthly.get(key, "Lo").is_none());
        assert_eq!(stats.zero_divisor_cells, 2);
    }

    #[test]
    fn test_annual_zero_weight_cell_is_counted() {
        let rows = vec![
            obs(1, 2020, 7, Some(0.10), Some(0.0)),
            obs(1, 2020, 8, Some(0.10), Some(0.0)),
            obs(3, 2020, 7, Some(0.05), Some(10.0)),
        ];
        let (out, stats) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        // July Lo, August Lo and annual Lo; Hi is defined throughout
        assert_eq!(stats.zero_divisor_cells, 3);
        assert_relative_eq!(out.vw_annual.get(RowKey::Year(2020), "Hi").unwrap(), 0.05);
    }

    #[test]
    fn test_non_finite_weight_is_missing() {
        let rows = vec![
            obs(1, 2020, 7, Some(-1.0), Some(f64::INFINITY)),
            obs(2, 2020, 7, Some(0.04), Some(100.0)),
        ];
        let (out, stats) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        let key = RowKey::Month(month_end_of(2020, 7).unwrap());
        assert_relative_eq!(out.vw_monthly.get(key, "Lo").unwrap(), 0.04, epsilon = 1e-12);
        assert_relative_eq!(out.ew_monthly.get(key, "Lo").unwrap(), -0.48, epsilon = 1e-12);
        assert_eq!(stats.missing_weight, 1);
    }

    #[test]
    fn test_empty_bucket_counts_zero_firms() {
        let rows = vec![obs(1, 2020, 7, Some(0.10), Some(1.0))];
        let (out, _) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        let key = RowKey::Month(month_end_of(2020, 7).unwrap());
        assert_eq!(out.firm_count.get(key, "Hi"), Some(0.0));
        assert!(out.vw_monthly.get(key, "Hi").is_none());
        assert!(out.avg_size.get(key, "Hi").is_none());
    }

    #[test]
    fn test_bucket_lookup_uses_fiscal_year() {
        // June 2021 still belongs to fiscal year 2020; July 2021 does not
        let rows = vec![
            obs(1, 2021, 6, Some(0.01), Some(1.0)),
            obs(1, 2021, 7, Some(0.01), Some(1.0)),
        ];
        let (out, _) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        assert_eq!(out.vw_monthly.len(), 1);
        assert!(
            out.vw_monthly
                .rows
                .contains_key(&RowKey::Month(month_end_of(2021, 6).unwrap()))
        );
    }

    #[test]
    fn test_annual_returns_compound_within_fiscal_year() {
        let rows = vec![
            obs(1, 2020, 7, Some(0.10), Some(200.0)),
            obs(1, 2020, 8, Some(0.10), Some(220.0)),
            obs(2, 2020, 7, Some(0.0), Some(600.0)),
            obs(2, 2020, 8, None, Some(600.0)),
        ];
        let (out, _) = aggregate_returns(&rows, &two_buckets(), ReturnKind::Total).unwrap();
        let key = RowKey::Year(2020);
        let firm1 = 1.1 * 1.1 - 1.0;
        assert_relative_eq!(out.ew_annual.get(key, "Lo").unwrap(), firm1 / 2.0, epsilon = 1e-12);
        assert_relative_eq!(
            out.vw_annual.get(key, "Lo").unwrap(),
            200.0 * firm1 / 800.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_value_weights_sum_to_one() {
        // with every return equal to one, each value-weighted cell is the
        // sum of its normalized weights
        let mut rng = StdRng::seed_from_u64(7);
        let mut assignments = Assignments::new(vec!["Lo".into(), "Hi".into()]);
        let mut rows = Vec::new();
        for company in 1..=60 {
            assignments.insert(CompanyId(company), 2020, rng.gen_range(0..2));
            for month in 7..=12 {
                let weight = rng.gen_bool(0.8).then(|| rng.gen_range(0.0..1e6));
                rows.push(obs(company, 2020, month, Some(1.0), weight));
            }
        }
        let (out, _) = aggregate_returns(&rows, &assignments, ReturnKind::Total).unwrap();
        let mut checked = 0;
        for values in out.vw_monthly.rows.values() {
            for value in values.iter().flatten() {
                assert!((value - 1.0).abs() < 1e-9);
                checked += 1;
            }
        }
        assert_eq!(checked, 12);
    }

    #[test]
    fn test_characteristic_average_weights_by_june_me() {
        let mut a = Assignments::new(vec!["B1".into()]);
        a.insert(CompanyId(1), 2020, 0);
        a.insert(CompanyId(2), 2020, 0);
        let firm = |c: i64, me: f64, bm: f64| FirmCharacteristics {
            company_id: CompanyId(c),
            security_id: SecurityId(c),
            formation_year: 2020,
            exchange: ffport_data::Exchange::Nyse,
            sic: None,
            june_me: me,
            december_me: None,
            fundamentals_id: None,
            history_years: 0,
            book_equity: None,
            operating_profitability: None,
            investment: None,
            earnings_to_price: None,
            cash_flow_to_price: None,
            book_to_market: Some(bm),
        };
        let firms = vec![firm(1, 100.0, 1.0), firm(2, 300.0, 0.5)];
        let avg = characteristic_average(&firms, &a, Characteristic::BookToMarket).unwrap();
        assert_eq!(avg.name, "avg_bm");
        assert_relative_eq!(avg.get(RowKey::Year(2020), "B1").unwrap(), 0.625);
    }

    #[test]
    fn test_row_key_round_trip_text() {
        let key = RowKey::Month(month_end_of(1963, 7).unwrap());
        assert_eq!(key.to_string(), "196307");
        assert_eq!(RowKey::parse("196307"), Some(key));
        assert_eq!(RowKey::parse("1963-07-15"), Some(key));
        assert_eq!(RowKey::parse("1990"), Some(RowKey::Year(1990)));
        assert_eq!(RowKey::parse("abc"), None);
    }

    #[test]
    fn test_matrix_to_dataframe() {
        let mut m = PortfolioMatrix::new("vw_monthly", vec!["Lo".into(), "Hi".into()]);
        m.insert_row(RowKey::Year(2000), vec![Some(1.0), None]).unwrap();
        assert!(m.insert_row(RowKey::Year(2001), vec![Some(1.0)]).is_err());
        let df = m.to_dataframe().unwrap();
        assert_eq!(df.shape(), (1, 3));
        assert_eq!(df.column("Hi").unwrap().null_count(), 1);
    }
}
