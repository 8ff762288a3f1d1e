//! Loader configuration, persisted as JSON.
//!
//! Missing fields fall back to defaults, so a config file only needs the
//! values it changes:
//! ```json
//! { "delay": { "FixedSeconds": 0.25 }, "filter_mode": "Point" }
//! ```

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::core::budget::MemoryBudget;
use crate::core::load_queue::DelayPolicy;
use crate::core::workers::default_threads;
use crate::entities::{FilterMode, ImageDecoder, PixelFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Sampling hint handed to the decoder
    pub filter_mode: FilterMode,
    /// Pause between two queued decodes
    pub delay: DelayPolicy,
    /// Destination pixel layout (platform default when absent)
    pub pixel_format: Option<PixelFormat>,
    /// Fetch threads (`num_cpus * 3/4` when absent)
    pub workers: Option<usize>,
    /// Fraction of available memory the cache may report as its budget
    pub mem_fraction: f64,
    /// Memory kept out of the budget (GB)
    pub reserve_gb: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::default(),
            delay: DelayPolicy::default(),
            pixel_format: None,
            workers: None,
            mem_fraction: 0.25,
            reserve_gb: 0.5,
        }
    }
}

impl LoaderConfig {
    /// Read config from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Read config if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format.unwrap_or_else(PixelFormat::platform_default)
    }

    pub fn worker_threads(&self) -> usize {
        self.workers.unwrap_or_else(default_threads).max(1)
    }

    /// Stock decoder configured with this filter mode and pixel format
    pub fn image_decoder(&self) -> ImageDecoder {
        ImageDecoder::new(self.filter_mode, self.pixel_format())
    }

    /// Memory budget sized from the current system
    pub fn memory_budget(&self) -> Arc<MemoryBudget> {
        Arc::new(MemoryBudget::from_system(self.mem_fraction, self.reserve_gb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{ "delay": { "FixedSeconds": 0.25 }, "filter_mode": "Point" }"#)
                .unwrap();
        assert_eq!(config.delay, DelayPolicy::FixedSeconds(0.25));
        assert_eq!(config.filter_mode, FilterMode::Point);
        assert_eq!(config.mem_fraction, 0.25);
        assert_eq!(config.workers, None);
    }

    #[test]
    fn test_frame_boundary_json() {
        let config: LoaderConfig = serde_json::from_str(r#"{ "delay": "FrameBoundary" }"#).unwrap();
        assert_eq!(config.delay, DelayPolicy::FrameBoundary);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trickle.json");

        let config = LoaderConfig {
            filter_mode: FilterMode::Trilinear,
            delay: DelayPolicy::FixedSeconds(1.5),
            pixel_format: Some(PixelFormat::Rgb8),
            workers: Some(3),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = LoaderConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.worker_threads(), 3);
        assert_eq!(loaded.image_decoder().format(), PixelFormat::Rgb8);
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = LoaderConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));

        let missing = dir.path().join("missing.json");
        assert_eq!(LoaderConfig::load_or_default(&missing).unwrap(), LoaderConfig::default());
    }

    #[test]
    fn test_worker_threads_at_least_one() {
        let config = LoaderConfig { workers: Some(0), ..Default::default() };
        assert_eq!(config.worker_threads(), 1);
    }
}
