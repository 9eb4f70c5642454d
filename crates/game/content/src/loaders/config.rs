//! Game configuration loader.

use std::path::Path;

use tactics_core::GameConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for game configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<GameConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<GameConfig> {
        let config: GameConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        if config.ai_actions_per_turn == 0 {
            anyhow::bail!("ai_actions_per_turn must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("max_rounds = 12\n").unwrap();
        assert_eq!(config.max_rounds, Some(12));
        assert_eq!(
            config.ai_actions_per_turn,
            GameConfig::DEFAULT_AI_ACTIONS_PER_TURN
        );
        assert_eq!(config.sight_range, None);
    }

    #[test]
    fn zero_ai_budget_is_rejected() {
        assert!(ConfigLoader::parse("ai_actions_per_turn = 0\n").is_err());
    }
}
