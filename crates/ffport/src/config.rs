//! Pipeline configuration.
//!
//! Every field has a default, so a configuration file only needs the
//! settings it changes:
//!
//! ```json
//! {
//!   "families": ["bm", "op_inv"],
//!   "delisting": { "missing_policy": "total-loss" },
//!   "characteristics": { "fundamentals_scale": 1000.0 }
//! }
//! ```

use crate::error::{PipelineError, Result};
use ffport_data::{DelistingConfig, Exchange, LinkConfig};
use ffport_output::ExportFormat;
use ffport_portfolios::{
    CharacteristicConfig, CutSet, ReferenceScreen, ReturnKind, available_families,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Exchanges whose securities enter the universe
    pub universe: Vec<Exchange>,

    /// Delisting return adjustment
    pub delisting: DelistingConfig,

    /// Eligible company-to-fundamentals links
    pub links: LinkConfig,

    /// Breakpoint reference subsample
    pub reference: ReferenceScreen,

    /// Characteristic derivation
    pub characteristics: CharacteristicConfig,

    /// Return series aggregated into portfolio returns
    pub return_kind: ReturnKind,

    /// Families to build, by registry name
    pub families: Vec<String>,

    /// Quantile levels of both `op_inv` sorts
    pub op_inv_cuts: CutSet,

    /// Format of the exported tables
    pub format: ExportFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            universe: vec![Exchange::Nyse, Exchange::Amex, Exchange::Nasdaq],
            delisting: DelistingConfig::default(),
            links: LinkConfig::default(),
            reference: ReferenceScreen::default(),
            characteristics: CharacteristicConfig::default(),
            return_kind: ReturnKind::default(),
            families: available_families()
                .iter()
                .map(|f| f.name.to_string())
                .collect(),
            op_inv_cuts: CutSet::quintiles(),
            format: ExportFormat::default(),
        }
    }
}

impl PipelineConfig {
    /// File name of the configuration under the user configuration directory.
    pub const FILE_NAME: &'static str = "config.json";

    /// Default configuration location, `<config dir>/ffport/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ffport").join(Self::FILE_NAME))
    }

    /// Read a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw).map_err(|source| PipelineError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Read `path` if given, else the default location if it exists, else
    /// the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    /// Write the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| PipelineError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffport_data::MissingDelistingPolicy;
    use rstest::rstest;

    #[test]
    fn test_default_builds_every_family() {
        let config = PipelineConfig::default();
        assert_eq!(config.families.len(), 5);
        assert_eq!(config.universe.len(), 3);
        assert_eq!(config.delisting.missing_policy, MissingDelistingPolicy::Exclude);
        assert_eq!(config.reference.exchanges, vec![Exchange::Nyse]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{
            "families": ["bm"],
            "delisting": { "missing_policy": "total-loss" },
            "characteristics": { "fundamentals_scale": 1000.0 }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.families, vec!["bm"]);
        assert_eq!(config.delisting.missing_policy, MissingDelistingPolicy::TotalLoss);
        assert_eq!(config.delisting.liquidation_return, -0.30);
        assert_eq!(config.characteristics.fundamentals_scale, 1000.0);
        assert_eq!(config.op_inv_cuts, CutSet::quintiles());
    }

    #[rstest]
    #[case(r#"{"return_kind": "total"}"#, ReturnKind::Total)]
    #[case(r#"{"return_kind": "ex-distribution"}"#, ReturnKind::ExDistribution)]
    #[case("{}", ReturnKind::Total)]
    fn test_return_kind(#[case] json: &str, #[case] expected: ReturnKind) {
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.return_kind, expected);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join("ffport_config_save_load");
        let path = dir.join(PipelineConfig::FILE_NAME);
        let config = PipelineConfig {
            families: vec!["ep".into(), "cfp".into()],
            return_kind: ReturnKind::ExDistribution,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = std::env::temp_dir().join("ffport_config_malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        fs::write(&path, "{ families: ").unwrap();
        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
        fs::remove_dir_all(dir).ok();
    }
}
