//! Runner configuration loading.

use serde::Deserialize;
use std::path::Path;

/// Optional tuning for the scenario runner, loaded from a TOML file next to
/// the scene. Everything here has a default; the file only overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Log filter applied when RUST_LOG is not set (error/warn/info/debug/trace).
    pub log_level: String,
    /// Overrides the scene's RNG seed when present.
    pub seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            log_level: "info".to_string(),
            seed: None,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }
}
