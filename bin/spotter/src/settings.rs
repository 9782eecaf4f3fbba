use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::Result;
use optimizer::GeneticConfig;
use strategy::StrategySettings;

/// Tunables file (TOML), see `config/spotter.toml`.
///
/// Both tables are optional. A missing file means all defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotterFileConfig {
    pub strategy: StrategySettings,
    pub optimizer: GeneticConfig,
}

impl SpotterFileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found; using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.strategy.validate()?;
        config.optimizer.validate()?;
        info!(path = %path.display(), "Config file loaded");
        Ok(config)
    }
}
