//! JSON run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Files written for one sort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortReport {
    /// Family name.
    pub family: String,

    /// Sort name.
    pub sort: String,

    /// Bucket labels.
    pub labels: Vec<String>,

    /// Paths of the files written.
    pub files: Vec<PathBuf>,
}

/// A report of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Crate version that produced the run.
    pub version: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Configuration the run used.
    pub config: serde_json::Value,

    /// Exclusion counters.
    pub diagnostics: serde_json::Value,

    /// Sorts and their files.
    pub sorts: Vec<SortReport>,
}

impl Report {
    /// Create a new report.
    pub fn new(
        version: String,
        config: serde_json::Value,
        diagnostics: serde_json::Value,
        sorts: Vec<SortReport>,
    ) -> Self {
        Self {
            version,
            timestamp: Utc::now(),
            config,
            diagnostics,
            sorts,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    version: Option<String>,
    config: Option<serde_json::Value>,
    diagnostics: Option<serde_json::Value>,
    sorts: Vec<SortReport>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the configuration.
    pub fn config<T: Serialize>(mut self, config: &T) -> Result<Self, ReportError> {
        self.config = Some(serde_json::to_value(config)?);
        Ok(self)
    }

    /// Set the diagnostics.
    pub fn diagnostics<T: Serialize>(mut self, diagnostics: &T) -> Result<Self, ReportError> {
        self.diagnostics = Some(serde_json::to_value(diagnostics)?);
        Ok(self)
    }

    /// Add a sort.
    pub fn sort(mut self, sort: SortReport) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Build the report.
    pub fn build(self) -> Report {
        Report::new(
            self.version.unwrap_or_default(),
            self.config.unwrap_or(serde_json::Value::Null),
            self.diagnostics.unwrap_or(serde_json::Value::Null),
            self.sorts,
        )
    }
}
