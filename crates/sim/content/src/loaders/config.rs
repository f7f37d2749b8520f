//! Simulation configuration loader.

use std::path::Path;

use sim_core::SimConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for [`SimConfig`] from TOML files.
///
/// Missing keys fall back to the [`SimConfig`] defaults.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<SimConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<SimConfig> {
        let config: SimConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        if config.max_logic_depth == 0 {
            anyhow::bail!("max_logic_depth must be at least 1");
        }
        if config.default_stasis_interval < 0 {
            anyhow::bail!(
                "default_stasis_interval must not be negative, got {}",
                config.default_stasis_interval
            );
        }
        if config.arrival_distance < 0.0 || config.max_path_length < 0.0 {
            anyhow::bail!("arrival_distance and max_path_length must not be negative");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config = ConfigLoader::parse("seed = 42\nplacement_rings = 2\n").unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.placement_rings, 2);
        assert_eq!(config.default_stasis_interval, SimConfig::DEFAULT_STASIS_INTERVAL);
        assert_eq!(config.max_logic_depth, SimConfig::DEFAULT_MAX_LOGIC_DEPTH);
    }

    #[test]
    fn zero_logic_depth_is_rejected() {
        let error = ConfigLoader::parse("max_logic_depth = 0").unwrap_err();
        assert!(error.to_string().contains("max_logic_depth"));
    }

    #[test]
    fn malformed_toml_reports_context() {
        let error = ConfigLoader::parse("seed = \"many\"").unwrap_err();
        assert!(error.to_string().starts_with("Failed to parse config TOML"));
    }
}
