//! Export of result matrices, bucket assignments and the market index.
//!
//! Matrices are written one file per table under
//! `<out>/<family>/<sort>_<table>.<ext>`. CSV files carry a `period` column
//! followed by one column per bucket label; missing values are empty.

use ffport_portfolios::{
    BucketAssignment, MarketIndexRow, PortfolioMatrix, PortfolioReturns, RowKey,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Missing-value codes used in published reference files.
pub const MISSING_CODES: [f64; 2] = [-99.99, -999.0];

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

/// JSON layout of a matrix: rows keep their label order.
#[derive(Debug, Serialize)]
struct MatrixJson<'a> {
    name: &'a str,
    labels: &'a [String],
    rows: Vec<MatrixRowJson<'a>>,
}

#[derive(Debug, Serialize)]
struct MatrixRowJson<'a> {
    period: String,
    values: &'a [Option<f64>],
}

impl Exporter for PortfolioMatrix {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                let mut header = vec!["period".to_string()];
                header.extend(self.labels.iter().cloned());
                wtr.write_record(&header)?;
                for (key, values) in &self.rows {
                    let mut record = vec![key.to_string()];
                    record.extend(values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
                    wtr.write_record(&record)?;
                }
                csv_string(wtr)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => {
                let doc = MatrixJson {
                    name: &self.name,
                    labels: &self.labels,
                    rows: self
                        .rows
                        .iter()
                        .map(|(k, v)| MatrixRowJson {
                            period: k.to_string(),
                            values: v,
                        })
                        .collect(),
                };
                if format == ExportFormat::Json {
                    Ok(serde_json::to_string(&doc)?)
                } else {
                    Ok(serde_json::to_string_pretty(&doc)?)
                }
            }
        }
    }
}

fn export_records<T: Serialize>(records: &[T], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            for record in records {
                wtr.serialize(record)?;
            }
            csv_string(wtr)
        }
        ExportFormat::Json => Ok(serde_json::to_string(records)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(records)?),
    }
}

impl Exporter for Vec<BucketAssignment> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        export_records(self, format)
    }
}

impl Exporter for Vec<MarketIndexRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        export_records(self, format)
    }
}

/// Write every table of a sort to `<out>/<family>/<sort>_<table>.<ext>` and
/// return the paths written.
pub fn write_sort(
    out: &Path,
    family: &str,
    sort: &str,
    returns: &PortfolioReturns,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = out.join(family);
    fs::create_dir_all(&dir)?;
    let mut written = Vec::new();
    for table in returns.tables() {
        let path = dir.join(format!("{sort}_{}.{}", table.name, format.extension()));
        table.export_to_file(&path, format)?;
        written.push(path);
    }
    debug!(family, sort, files = written.len(), "Wrote sort tables");
    Ok(written)
}

fn parse_cell(raw: &str) -> Result<Option<f64>, ExportError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| ExportError::InvalidFormat(format!("not a number: {raw:?}")))?;
    if MISSING_CODES.iter().any(|code| (value - code).abs() < 1e-9) {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Read a matrix CSV: a period column (`YYYYMM`, `YYYY` or `YYYY-MM-DD`)
/// followed by one column per label. Empty cells and the codes in
/// [`MISSING_CODES`] read as missing.
pub fn read_matrix_csv(path: &Path) -> Result<PortfolioMatrix, ExportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let labels: Vec<String> = rdr.headers()?.iter().skip(1).map(str::to_string).collect();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut matrix = PortfolioMatrix::new(name, labels);
    for record in rdr.records() {
        let record = record?;
        let Some(first) = record.get(0) else {
            continue;
        };
        let key = RowKey::parse(first)
            .ok_or_else(|| ExportError::InvalidFormat(format!("bad period {first:?}")))?;
        let values = record
            .iter()
            .skip(1)
            .map(parse_cell)
            .collect::<Result<Vec<_>, _>>()?;
        matrix
            .insert_row(key, values)
            .map_err(|e| ExportError::InvalidFormat(e.to_string()))?;
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffport_data::CompanyId;
    use rstest::rstest;

    fn matrix() -> PortfolioMatrix {
        let mut m = PortfolioMatrix::new("vw_monthly", vec!["Lo 30".into(), "Hi 30".into()]);
        m.insert_row(RowKey::Year(2001), vec![Some(0.25), None]).unwrap();
        m.insert_row(RowKey::Year(2000), vec![Some(-0.5), Some(1.5)])
            .unwrap();
        m
    }

    #[test]
    fn test_matrix_csv_layout() {
        let csv = matrix().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["period,Lo 30,Hi 30", "2000,-0.5,1.5", "2001,0.25,"]);
    }

    #[test]
    fn test_matrix_json_keeps_label_order() {
        let json = matrix().export_to_string(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["labels"][0], "Lo 30");
        assert_eq!(value["rows"][1]["period"], "2001");
        assert!(value["rows"][1]["values"][1].is_null());

        let pretty = matrix().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  "));
    }

    #[test]
    fn test_assignment_records_csv() {
        let records = vec![BucketAssignment {
            company_id: CompanyId(7),
            formation_year: 2000,
            bucket_label: "Qnt 3".into(),
        }];
        let csv = records.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("company_id,formation_year,bucket_label"));
        assert!(csv.contains("7,2000,Qnt 3"));
    }

    #[rstest]
    #[case(ExportFormat::Csv, "csv")]
    #[case(ExportFormat::Json, "json")]
    #[case(ExportFormat::PrettyJson, "json")]
    fn test_export_format_extension(#[case] format: ExportFormat, #[case] expected: &str) {
        assert_eq!(format.extension(), expected);
    }

    #[test]
    fn test_read_treats_missing_codes_as_null() {
        let dir = std::env::temp_dir().join("ffport_export_missing_codes");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reference.csv");
        fs::write(&path, "date, Lo 30, Hi 30\n196307, -99.99, 1.2\n196308, 0.5, -999\n").unwrap();

        let m = read_matrix_csv(&path).unwrap();
        assert_eq!(m.labels, vec!["Lo 30", "Hi 30"]);
        let july = RowKey::parse("196307").unwrap();
        let august = RowKey::parse("196308").unwrap();
        assert_eq!(m.get(july, "Lo 30"), None);
        assert_eq!(m.get(july, "Hi 30"), Some(1.2));
        assert_eq!(m.get(august, "Hi 30"), None);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_write_then_read_matrix() {
        let out = std::env::temp_dir().join("ffport_export_write_sort");
        let returns = PortfolioReturns {
            vw_monthly: matrix(),
            ..Default::default()
        };
        let paths = write_sort(&out, "bm", "terciles", &returns, ExportFormat::Csv).unwrap();
        assert_eq!(paths.len(), 6);
        assert!(paths[0].ends_with("bm/terciles_vw_monthly.csv"));

        let read = read_matrix_csv(&paths[0]).unwrap();
        assert_eq!(read.rows, matrix().rows);
        fs::remove_dir_all(out).ok();
    }
}
