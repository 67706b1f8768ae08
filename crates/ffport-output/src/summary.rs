//! Summary statistics of result matrices.
//!
//! Per column: count of non-missing values, mean, sample standard deviation,
//! minimum, quartiles and maximum.

use ffport_portfolios::{PortfolioMatrix, quantile};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics of one matrix column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSummary {
    /// Column label.
    pub label: String,

    /// Non-missing values.
    pub count: usize,

    /// Mean.
    pub mean: Option<f64>,

    /// Sample standard deviation.
    pub std: Option<f64>,

    /// Minimum.
    pub min: Option<f64>,

    /// 25th percentile.
    pub q25: Option<f64>,

    /// Median.
    pub median: Option<f64>,

    /// 75th percentile.
    pub q75: Option<f64>,

    /// Maximum.
    pub max: Option<f64>,
}

impl ColumnSummary {
    /// Summarize a column of values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ffport_output::ColumnSummary;
    ///
    /// let s = ColumnSummary::from_values("Lo 30", &[Some(1.0), None, Some(3.0)]);
    /// assert_eq!(s.count, 2);
    /// assert_eq!(s.mean, Some(2.0));
    /// ```
    pub fn from_values(label: &str, values: &[Option<f64>]) -> Self {
        let mut present: Vec<f64> = values.iter().flatten().copied().collect();
        present.sort_by(f64::total_cmp);
        let count = present.len();

        let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
        let std = mean.filter(|_| count > 1).map(|m| {
            let ss: f64 = present.iter().map(|v| (v - m).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });

        Self {
            label: label.to_string(),
            count,
            mean,
            std,
            min: present.first().copied(),
            q25: quantile(&present, 0.25),
            median: quantile(&present, 0.5),
            q75: quantile(&present, 0.75),
            max: present.last().copied(),
        }
    }
}

/// Summary of every column of a matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixSummary {
    /// Matrix name.
    pub name: String,

    /// Number of rows.
    pub rows: usize,

    /// First row key.
    pub first: Option<String>,

    /// Last row key.
    pub last: Option<String>,

    /// Per-column statistics in label order.
    pub columns: Vec<ColumnSummary>,
}

fn cell(v: Option<f64>, scale: f64) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v * scale))
}

impl MatrixSummary {
    /// Format as ASCII table for terminal display. `scale` multiplies the
    /// value statistics (100 shows returns in percent).
    pub fn to_ascii_table(&self, scale: f64) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nSummary: {}\n", self.name));
        output.push_str(&format!(
            "Rows: {} ({} to {})\n",
            self.rows,
            self.first.as_deref().unwrap_or("-"),
            self.last.as_deref().unwrap_or("-")
        ));
        output.push_str(&"=".repeat(104));
        output.push('\n');
        output.push_str(&format!(
            "{:<14} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "Portfolio", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"
        ));
        output.push_str(&"-".repeat(104));
        output.push('\n');

        for c in &self.columns {
            output.push_str(&format!(
                "{:<14} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
                c.label,
                c.count,
                cell(c.mean, scale),
                cell(c.std, scale),
                cell(c.min, scale),
                cell(c.q25, scale),
                cell(c.median, scale),
                cell(c.q75, scale),
                cell(c.max, scale)
            ));
        }

        output.push_str(&"=".repeat(104));
        output.push('\n');
        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self, scale: f64) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Summary: {}\n\n", self.name));
        output.push_str(&format!("**Rows:** {}\n\n", self.rows));
        output.push_str("| Portfolio | Count | Mean | Std | Min | 25% | 50% | 75% | Max |\n");
        output.push_str("|-----------|-------|------|-----|-----|-----|-----|-----|-----|\n");

        for c in &self.columns {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                c.label,
                c.count,
                cell(c.mean, scale),
                cell(c.std, scale),
                cell(c.min, scale),
                cell(c.q25, scale),
                cell(c.median, scale),
                cell(c.q75, scale),
                cell(c.max, scale)
            ));
        }

        output
    }
}

impl fmt::Display for MatrixSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary: {} ({} rows)", self.name, self.rows)?;
        for c in &self.columns {
            writeln!(f, "  {}: n={} mean={}", c.label, c.count, cell(c.mean, 1.0))?;
        }
        Ok(())
    }
}

/// Summarize every column of a matrix.
pub fn describe(matrix: &PortfolioMatrix) -> MatrixSummary {
    let columns = matrix
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let values: Vec<Option<f64>> = matrix.rows.values().map(|r| r[i]).collect();
            ColumnSummary::from_values(label, &values)
        })
        .collect();

    MatrixSummary {
        name: matrix.name.clone(),
        rows: matrix.len(),
        first: matrix.rows.keys().next().map(|k| k.to_string()),
        last: matrix.rows.keys().next_back().map(|k| k.to_string()),
        columns,
    }
}
