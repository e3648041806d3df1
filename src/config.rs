use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_MERGE_THRESHOLD_MS: u32 = 500;

/// Analysis settings, loadable from a TOML file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Largest gap between two kiai intervals that still merges them.
    pub merge_threshold_ms: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            merge_threshold_ms: DEFAULT_MERGE_THRESHOLD_MS,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str::<AnalysisConfig>(&contents).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
