//! Runtime configuration for headless battle runs.

use std::env;
use std::path::PathBuf;

/// Where content comes from and where checkpoints go.
///
/// Defaults can be overridden through `SKIRMISH_*` environment variables,
/// typically set in a `.env` file next to the binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Directory holding the RON catalogs, `party.ron` and `maps/`.
    pub data_dir: PathBuf,
    /// Map name without extension, looked up under `data_dir/maps`.
    pub map: String,
    /// Dice seed. The same seed replays the same battle.
    pub seed: u64,
    pub save_dir: PathBuf,
    /// Save a checkpoint after every turn.
    pub checkpoints: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            map: "guard_post".to_string(),
            seed: 0,
            save_dir: default_save_dir(),
            checkpoints: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = read_env::<PathBuf>("SKIRMISH_DATA_DIR") {
            config.data_dir = dir;
        }
        if let Some(map) = read_env::<String>("SKIRMISH_MAP") {
            config.map = map;
        }
        if let Some(seed) = read_env::<u64>("SKIRMISH_SEED") {
            config.seed = seed;
        }
        if let Some(dir) = read_env::<PathBuf>("SKIRMISH_SAVE_DIR") {
            config.save_dir = dir;
        }
        if let Some(enabled) = read_env_bool("SKIRMISH_CHECKPOINTS") {
            config.checkpoints = enabled;
        }

        config
    }
}

/// Platform data directory, e.g. `~/.local/share/skirmish` on Linux.
fn default_save_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "skirmish")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./save_data"))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_shipped_data() {
        let config = RuntimeConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.map, "guard_post");
        assert!(!config.checkpoints);
    }
}
