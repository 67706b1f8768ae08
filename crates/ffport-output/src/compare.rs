//! Tracking statistics of a replicated matrix against a reference matrix.

use ffport_portfolios::PortfolioMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracking statistics of one label present in both matrices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnComparison {
    /// Bucket label.
    pub label: String,

    /// Rows where both values are present.
    pub overlap: usize,

    /// Pearson correlation over the overlap.
    pub correlation: Option<f64>,

    /// Mean absolute difference.
    pub mean_abs_diff: Option<f64>,

    /// Maximum absolute difference.
    pub max_abs_diff: Option<f64>,

    /// Mean of the replicated values over the overlap.
    pub replicated_mean: Option<f64>,

    /// Mean of the reference values over the overlap.
    pub reference_mean: Option<f64>,
}

impl ColumnComparison {
    fn from_pairs(label: &str, pairs: &[(f64, f64)]) -> Self {
        let n = pairs.len();
        let mean = |f: fn(&(f64, f64)) -> f64| {
            (n > 0).then(|| pairs.iter().map(f).sum::<f64>() / n as f64)
        };
        let replicated_mean = mean(|p| p.0);
        let reference_mean = mean(|p| p.1);
        let mean_abs_diff = mean(|p| (p.0 - p.1).abs());
        let max_abs_diff = pairs
            .iter()
            .map(|(a, b)| (a - b).abs())
            .reduce(f64::max);

        let correlation = replicated_mean.zip(reference_mean).and_then(|(ma, mb)| {
            let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
            for (a, b) in pairs {
                sab += (a - ma) * (b - mb);
                saa += (a - ma).powi(2);
                sbb += (b - mb).powi(2);
            }
            (n > 1 && saa > 0.0 && sbb > 0.0).then(|| sab / (saa * sbb).sqrt())
        });

        Self {
            label: label.to_string(),
            overlap: n,
            correlation,
            mean_abs_diff,
            max_abs_diff,
            replicated_mean,
            reference_mean,
        }
    }
}

/// Comparison of two matrices aligned on row keys and labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    /// Replicated matrix name.
    pub name: String,

    /// Per-label statistics, in the replicated matrix's label order.
    pub columns: Vec<ColumnComparison>,

    /// Labels of the replicated matrix absent from the reference.
    pub missing_in_reference: Vec<String>,

    /// Labels of the reference absent from the replicated matrix.
    pub missing_in_replicated: Vec<String>,
}

impl Comparison {
    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nComparison: {}\n", self.name));
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<14} {:>8} {:>12} {:>14} {:>14}\n",
            "Portfolio", "Overlap", "Correlation", "Mean |diff|", "Max |diff|"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"));
        for c in &self.columns {
            output.push_str(&format!(
                "{:<14} {:>8} {:>12} {:>14} {:>14}\n",
                c.label,
                c.overlap,
                fmt(c.correlation),
                fmt(c.mean_abs_diff),
                fmt(c.max_abs_diff)
            ));
        }
        if !self.missing_in_reference.is_empty() {
            output.push_str(&format!(
                "Not in reference: {}\n",
                self.missing_in_reference.join(", ")
            ));
        }
        if !self.missing_in_replicated.is_empty() {
            output.push_str(&format!(
                "Not replicated: {}\n",
                self.missing_in_replicated.join(", ")
            ));
        }
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii_table())
    }
}

/// Compare `replicated` with `reference`. Reference values are multiplied
/// by `reference_scale` first (0.01 for files published in percent).
pub fn compare(
    replicated: &PortfolioMatrix,
    reference: &PortfolioMatrix,
    reference_scale: f64,
) -> Comparison {
    let columns = replicated
        .labels
        .iter()
        .filter(|label| reference.labels.contains(label))
        .map(|label| {
            let pairs: Vec<(f64, f64)> = replicated
                .rows
                .keys()
                .filter_map(|key| {
                    let a = replicated.get(*key, label)?;
                    let b = reference.get(*key, label)?;
                    Some((a, b * reference_scale))
                })
                .collect();
            ColumnComparison::from_pairs(label, &pairs)
        })
        .collect();

    let missing = |from: &PortfolioMatrix, other: &PortfolioMatrix| {
        from.labels
            .iter()
            .filter(|l| !other.labels.contains(l))
            .cloned()
            .collect()
    };

    Comparison {
        name: replicated.name.clone(),
        columns,
        missing_in_reference: missing(replicated, reference),
        missing_in_replicated: missing(reference, replicated),
    }
}
