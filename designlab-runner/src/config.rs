//! Serializable diagnosis configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for a diagnosis run.
///
/// Loadable from TOML; unspecified fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    /// Number of bootstrap replicates (default 100; 0 disables bootstrapping).
    pub bootstrap_replicates: usize,
    /// Master RNG seed for reproducibility.
    pub seed: u64,
    /// Extra grouping columns appended to the default composite key.
    pub extra_group_by: Vec<String>,
    /// Run bootstrap replicates on a thread pool.
    pub parallel: bool,
    /// Significance level for the default diagnosand set.
    pub alpha: f64,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            bootstrap_replicates: 100,
            seed: 42,
            extra_group_by: Vec::new(),
            parallel: false,
            alpha: 0.05,
        }
    }
}

/// Errors from config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl DiagnosisConfig {
    /// Load a config from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = DiagnosisConfig::default();
        assert_eq!(c.bootstrap_replicates, 100);
        assert_eq!(c.seed, 42);
        assert!(!c.parallel);
        assert!((c.alpha - 0.05).abs() < 1e-12);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let c: DiagnosisConfig = toml::from_str("bootstrap_replicates = 500").unwrap();
        assert_eq!(c.bootstrap_replicates, 500);
        assert_eq!(c.seed, 42);
    }

    #[test]
    fn toml_round_trip() {
        let c = DiagnosisConfig {
            bootstrap_replicates: 200,
            seed: 7,
            extra_group_by: vec!["arm".to_string()],
            parallel: true,
            alpha: 0.1,
        };
        let text = toml::to_string(&c).unwrap();
        let back: DiagnosisConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, c);
    }
}
