//! Month-end periods and the July-to-June fiscal calendar.
//!
//! Every period in the pipeline is a month-end `NaiveDate`. The fiscal
//! calendar shifts a period back six months, so July of calendar year `t`
//! is fiscal month 1 of fiscal year `t` and the following June is fiscal
//! month 12 of the same fiscal year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Month-end date `months` months after (or before, if negative) `date`.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let index = month_index(date) + months;
    from_month_index(index)
}

/// Month-end date for a calendar year and month.
pub fn month_end_of(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).map(month_end)
}

/// Months since year 0, used for month arithmetic.
pub fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn from_month_index(index: i32) -> NaiveDate {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    // month is always in 1..=12, so the date exists
    month_end_of(year, month).unwrap_or(NaiveDate::MIN)
}

/// Position of a month in the July-to-June fiscal calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Fiscal year; equals the portfolio formation year
    pub year: i32,
    /// Fiscal month, 1 = July through 12 = June
    pub month: u32,
}

impl FiscalPeriod {
    /// Fiscal period of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        let shifted = shift_months(date, -6);
        Self {
            year: shifted.year(),
            month: shifted.month(),
        }
    }

    /// Whether this is the first month (July) of the fiscal year.
    pub const fn is_first_month(&self) -> bool {
        self.month == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case(d(2020, 1, 15), d(2020, 1, 31))]
    #[case(d(2020, 2, 1), d(2020, 2, 29))]
    #[case(d(2021, 2, 28), d(2021, 2, 28))]
    #[case(d(2020, 12, 3), d(2020, 12, 31))]
    fn test_month_end(#[case] input: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(month_end(input), expected);
    }

    #[test]
    fn test_shift_months_crosses_years() {
        assert_eq!(shift_months(d(2020, 1, 31), -1), d(2019, 12, 31));
        assert_eq!(shift_months(d(2020, 11, 30), 3), d(2021, 2, 28));
        assert_eq!(shift_months(d(2020, 6, 30), -6), d(2019, 12, 31));
    }

    #[rstest]
    #[case(d(2020, 7, 31), 2020, 1)]
    #[case(d(2020, 12, 31), 2020, 6)]
    #[case(d(2021, 1, 31), 2020, 7)]
    #[case(d(2021, 6, 30), 2020, 12)]
    #[case(d(2021, 7, 31), 2021, 1)]
    #[case(d(2021, 2, 15), 2020, 8)]
    #[case(d(1926, 1, 30), 1925, 7)]
    fn test_fiscal_period(#[case] date: NaiveDate, #[case] year: i32, #[case] month: u32) {
        let fp = FiscalPeriod::of(date);
        assert_eq!(fp.year, year);
        assert_eq!(fp.month, month);
    }

    #[test]
    fn test_first_month_is_july() {
        assert!(FiscalPeriod::of(d(1999, 7, 31)).is_first_month());
        assert!(!FiscalPeriod::of(d(1999, 6, 30)).is_first_month());
    }
}
