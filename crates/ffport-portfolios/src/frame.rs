//! Column access on collected frames.
//!
//! Stages build a `DataFrame` from typed records, run a lazy query and read
//! the result back into records. These helpers do the reading.

use crate::error::Result;
use polars::prelude::*;

/// Float column; non-finite values read as `None`.
pub(crate) fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Integer column.
pub(crate) fn ints(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

/// Row positions written by the stage that built the frame.
pub(crate) fn positions(df: &DataFrame, name: &str) -> Result<Vec<usize>> {
    Ok(ints(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or_default() as usize)
        .collect())
}
