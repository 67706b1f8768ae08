//! Typed table schemas validated at the loader boundary.
//!
//! Each input table is described by a [`TableSchema`]: canonical column
//! names, the raw CRSP/Compustat/CCM names accepted as aliases, and whether
//! the column is required. [`TableSchema::resolve`] checks a `DataFrame`
//! against the schema and returns a [`ResolvedTable`] whose typed accessors
//! decode columns into `Option` vectors. Missing optional columns decode to
//! all-`None`.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;

/// How a column is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer code or identifier
    Int,
    /// Floating point value
    Float,
    /// Calendar date
    Date,
    /// Free text
    Text,
}

/// One column of a table schema.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Canonical name
    pub name: &'static str,
    /// Accepted alternative names, tried in order after the canonical name
    pub aliases: &'static [&'static str],
    /// Decoding kind
    pub kind: ColumnKind,
    /// Whether absence of the column is fatal
    pub required: bool,
}

const fn required(
    name: &'static str,
    aliases: &'static [&'static str],
    kind: ColumnKind,
) -> ColumnSpec {
    ColumnSpec {
        name,
        aliases,
        kind,
        required: true,
    }
}

const fn optional(
    name: &'static str,
    aliases: &'static [&'static str],
    kind: ColumnKind,
) -> ColumnSpec {
    ColumnSpec {
        name,
        aliases,
        kind,
        required: false,
    }
}

/// Schema of one input table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// Table name used in error messages
    pub table: &'static str,
    /// Columns of the table
    pub columns: &'static [ColumnSpec],
}

/// Monthly security panel.
pub static SECURITY_MONTHS: TableSchema = TableSchema {
    table: "security_months",
    columns: &[
        required("security_id", &["permno"], ColumnKind::Int),
        required("company_id", &["permco"], ColumnKind::Int),
        required("period", &["date", "mthcaldt", "month"], ColumnKind::Date),
        required("return", &["ret", "mthret"], ColumnKind::Float),
        required("return_ex_distribution", &["retx", "mthretx"], ColumnKind::Float),
        required("shares_outstanding", &["shrout"], ColumnKind::Float),
        required("price", &["altprc", "prc", "mthprc"], ColumnKind::Float),
        optional("exchange", &["exchcd", "primaryexch"], ColumnKind::Text),
        optional("sic", &["siccd", "hsiccd"], ColumnKind::Int),
        optional("delisting_return", &["dlret"], ColumnKind::Float),
        optional("delisting_code", &["dlstcd"], ColumnKind::Int),
    ],
};

/// Annual fundamentals panel.
pub static FUNDAMENTALS: TableSchema = TableSchema {
    table: "fundamentals",
    columns: &[
        required("fundamentals_id", &["gvkey"], ColumnKind::Text),
        required("fiscal_period_end", &["datadate"], ColumnKind::Date),
        optional("sales", &["sale", "revt"], ColumnKind::Float),
        optional("cogs", &[], ColumnKind::Float),
        optional("sga", &["xsga"], ColumnKind::Float),
        optional("interest_expense", &["xint"], ColumnKind::Float),
        optional("total_assets", &["at"], ColumnKind::Float),
        optional("total_liabilities", &["lt"], ColumnKind::Float),
        optional("stockholders_equity", &["seq"], ColumnKind::Float),
        optional("common_equity", &["ceq"], ColumnKind::Float),
        optional("preferred_stock", &["pstk"], ColumnKind::Float),
        optional("preferred_redemption", &["pstkrv"], ColumnKind::Float),
        optional("preferred_liquidating", &["pstkl"], ColumnKind::Float),
        optional("deferred_taxes_itc", &["txditc"], ColumnKind::Float),
        optional("deferred_taxes", &["txdb"], ColumnKind::Float),
        optional("investment_tax_credit", &["itcb"], ColumnKind::Float),
        optional("net_income", &["ni", "ib"], ColumnKind::Float),
        optional("ebit", &[], ColumnKind::Float),
        optional("depreciation", &["dp"], ColumnKind::Float),
        optional("operating_cash_flow", &["oancf"], ColumnKind::Float),
        optional("sic", &["sich"], ColumnKind::Int),
    ],
};

/// CRSP/Compustat link table.
pub static LINKS: TableSchema = TableSchema {
    table: "links",
    columns: &[
        required("fundamentals_id", &["gvkey"], ColumnKind::Text),
        required("company_id", &["lpermco", "permco"], ColumnKind::Int),
        required("link_start", &["linkdt"], ColumnKind::Date),
        optional("link_end", &["linkenddt"], ColumnKind::Date),
        optional("link_type", &["linktype"], ColumnKind::Text),
        optional("link_primary", &["linkprim"], ColumnKind::Text),
    ],
};

impl TableSchema {
    /// Look up a column spec by canonical name.
    pub fn spec(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Match the schema against a frame, failing on the first missing
    /// required column.
    pub fn resolve<'a>(&'static self, df: &'a DataFrame) -> Result<ResolvedTable<'a>> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        let mut names = HashMap::new();
        for spec in self.columns {
            let found = std::iter::once(&spec.name)
                .chain(spec.aliases.iter())
                .find_map(|candidate| {
                    present
                        .iter()
                        .find(|p| p.eq_ignore_ascii_case(candidate))
                        .cloned()
                });
            match found {
                Some(actual) => {
                    names.insert(spec.name, actual);
                }
                None if spec.required => {
                    return Err(DataError::MissingColumn {
                        table: self.table,
                        column: spec.name,
                    });
                }
                None => {}
            }
        }

        Ok(ResolvedTable {
            schema: self,
            df,
            names,
        })
    }
}

/// A frame whose columns have been matched against a [`TableSchema`].
#[derive(Debug)]
pub struct ResolvedTable<'a> {
    schema: &'static TableSchema,
    df: &'a DataFrame,
    names: HashMap<&'static str, String>,
}

impl ResolvedTable<'_> {
    /// Number of rows.
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Whether an optional column was found.
    pub fn has(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn column(&self, name: &'static str) -> Result<Option<&Column>> {
        match self.names.get(name) {
            Some(actual) => Ok(Some(self.df.column(actual)?)),
            None => Ok(None),
        }
    }

    fn type_error(&self, name: &'static str, dtype: &DataType) -> DataError {
        DataError::ColumnType {
            table: self.schema.table,
            column: name,
            dtype: dtype.to_string(),
        }
    }

    /// Decode a float column. Non-finite values decode to `None`.
    pub fn floats(&self, name: &'static str) -> Result<Vec<Option<f64>>> {
        let Some(column) = self.column(name)? else {
            return Ok(vec![None; self.height()]);
        };
        let cast = column
            .cast(&DataType::Float64)
            .map_err(|_| self.type_error(name, column.dtype()))?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }

    /// Decode an integer column. Float columns are truncated.
    pub fn ints(&self, name: &'static str) -> Result<Vec<Option<i64>>> {
        let Some(column) = self.column(name)? else {
            return Ok(vec![None; self.height()]);
        };
        let cast = column
            .cast(&DataType::Float64)
            .map_err(|_| self.type_error(name, column.dtype()))?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()).map(|x| x as i64))
            .collect())
    }

    /// Decode a text column; numeric columns are rendered as text.
    pub fn texts(&self, name: &'static str) -> Result<Vec<Option<String>>> {
        let Some(column) = self.column(name)? else {
            return Ok(vec![None; self.height()]);
        };
        let cast = column
            .cast(&DataType::String)
            .map_err(|_| self.type_error(name, column.dtype()))?;
        Ok(cast
            .str()?
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from))
            .collect())
    }

    /// Decode a date column from a polars date/datetime, an ISO string or
    /// a `YYYYMMDD` integer.
    pub fn dates(&self, name: &'static str) -> Result<Vec<Option<NaiveDate>>> {
        let Some(column) = self.column(name)? else {
            return Ok(vec![None; self.height()]);
        };
        let column = match column.dtype() {
            DataType::Datetime(_, _) => column.cast(&DataType::Date)?,
            _ => column.clone(),
        };
        let cast = column
            .cast(&DataType::String)
            .map_err(|_| self.type_error(name, column.dtype()))?;
        cast.str()?
            .into_iter()
            .map(|v| v.map(|s| parse_date(self.schema.table, s)).transpose())
            .collect()
    }

    /// Decode a key column, failing on any null.
    pub fn required_ints(&self, name: &'static str) -> Result<Vec<i64>> {
        self.ints(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| self.null_key(name, row)))
            .collect()
    }

    /// Decode a key date column, failing on any null.
    pub fn required_dates(&self, name: &'static str) -> Result<Vec<NaiveDate>> {
        self.dates(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| self.null_key(name, row)))
            .collect()
    }

    /// Decode a key text column, failing on any null.
    pub fn required_texts(&self, name: &'static str) -> Result<Vec<String>> {
        self.texts(name)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| self.null_key(name, row)))
            .collect()
    }

    const fn null_key(&self, column: &'static str, row: usize) -> DataError {
        DataError::NullKey {
            table: self.schema.table,
            column,
            row,
        }
    }
}

fn parse_date(table: &str, raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map_err(|_| DataError::Parse(format!("{table}: invalid date '{raw}'")))
}
