//! Config and data file locations

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "trickle";
pub const CONFIG_FILE: &str = "trickle.json";
pub const LOG_FILE: &str = "trickle.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (TRICKLE_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("TRICKLE_CONFIG_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. TRICKLE_CONFIG_DIR environment variable
/// 3. Current directory IF trickle.json exists there
/// 4. Platform config directory from dirs-next (e.g. ~/.config/trickle)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_dir(config, dirs_next::config_dir).join(name)
}

/// Get path to a data file (logs)
///
/// Same priority as `config_file`, with the platform data directory
/// (e.g. ~/.local/share/trickle) as the default.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_dir(config, dirs_next::data_dir).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_dir(config, dirs_next::config_dir);
    let data_dir = get_dir(config, dirs_next::data_dir);

    for dir in [&config_dir, &data_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
    }

    Ok(())
}

fn has_local_config(dir: &Path) -> bool {
    dir.join(CONFIG_FILE).exists()
}

fn get_dir(config: &PathConfig, platform_dir: fn() -> Option<PathBuf>) -> PathBuf {
    // Priority 1: Custom directory from CLI or ENV
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    // Priority 2: Local folder IF a config file exists there
    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_config(&current_dir) {
            return current_dir;
        }
    }

    // Priority 3: Platform-specific directory
    if let Some(dir) = platform_dir() {
        return dir.join(APP_DIR);
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };

        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file(LOG_FILE, &config), PathBuf::from("/custom/trickle.log"));
    }

    #[test]
    fn test_cli_dir_wins() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from/cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from/cli")));
    }

    #[test]
    fn test_ensure_dirs_creates_custom_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/cfg");
        let config = PathConfig { config_dir: Some(dir.clone()) };

        ensure_dirs(&config).unwrap();
        assert!(dir.is_dir());
    }
}
