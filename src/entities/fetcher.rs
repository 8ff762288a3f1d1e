//! Byte sources for the loader.
//!
//! - `FileFetcher`: `root/<subdir>/<key><extension>` on the local file system
//! - `MemoryFetcher`: in-memory table (bundled assets, tests)
//!
//! Fetchers report their own failures to the log; the service only sees the
//! `LoadError`.

use log::{trace, warn};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::traits::Fetcher;
use crate::error::LoadError;

pub const DEFAULT_SUBDIR: &str = "Cards";
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Reads `root/<subdir>/<key><extension>`
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
    subdir: String,
    extension: String,
}

impl FileFetcher {
    /// Fetcher with the default `Cards/` subdirectory and `.jpg` extension
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subdir: DEFAULT_SUBDIR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    /// Accepts "png" or ".png"
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = if extension.is_empty() || extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };
        self
    }

    /// Resolve the file path for a key.
    ///
    /// Keys are plain names (optionally nested with `/`); anything that could
    /// escape the root is rejected.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, LoadError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(LoadError::InvalidRequest(key.to_string()));
        }

        let mut path = self.root.clone();
        if !self.subdir.is_empty() {
            path.push(&self.subdir);
        }
        path.push(format!("{}{}", key, self.extension));
        Ok(path)
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.path_for(key).inspect_err(|e| warn!("FileFetcher: {}", e))?;
        trace!("FileFetcher: reading {}", path.display());

        std::fs::read(&path).map_err(|e| {
            warn!("FileFetcher: can't read {}: {}", path.display(), e);
            LoadError::fetch(key, format!("{}: {}", path.display(), e))
        })
    }
}

/// In-memory byte table
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), bytes);
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
    }

    /// Number of `fetch` calls so far (hits and misses)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, LoadError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(bytes) => Ok(bytes.clone()),
            None => {
                warn!("MemoryFetcher: no entry for '{}'", key);
                Err(LoadError::fetch(key, "no such entry"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_fetcher_reads_card() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Cards")).unwrap();
        std::fs::write(dir.path().join("Cards/card_ace.jpg"), [7u8; 37]).unwrap();

        let fetcher = FileFetcher::new(dir.path());
        let bytes = fetcher.fetch("card_ace").unwrap();
        assert_eq!(bytes.len(), 37);
    }

    #[test]
    fn test_file_fetcher_custom_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("icon.png"), b"png").unwrap();

        let fetcher = FileFetcher::new(dir.path()).with_subdir("").with_extension("png");
        assert_eq!(fetcher.path_for("icon").unwrap(), dir.path().join("icon.png"));
        assert_eq!(fetcher.fetch("icon").unwrap(), b"png".to_vec());
    }

    #[test]
    fn test_file_fetcher_missing_and_escaping() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FileFetcher::new(dir.path());

        assert!(matches!(fetcher.fetch("nope"), Err(LoadError::Fetch { .. })));
        assert_eq!(
            fetcher.path_for("../secret"),
            Err(LoadError::InvalidRequest("../secret".into()))
        );
        assert!(matches!(fetcher.path_for("/etc/passwd"), Err(LoadError::InvalidRequest(_))));
        assert!(matches!(fetcher.fetch(""), Err(LoadError::InvalidRequest(_))));
        assert!(fetcher.path_for("suits/hearts").is_ok());
    }

    #[test]
    fn test_memory_fetcher() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("a", vec![1, 2, 3]);

        assert_eq!(fetcher.fetch("a").unwrap(), vec![1, 2, 3]);
        assert!(fetcher.fetch("b").is_err());
        assert_eq!(fetcher.fetch_count(), 2);

        assert_eq!(fetcher.remove("a"), Some(vec![1, 2, 3]));
        assert!(fetcher.fetch("a").is_err());
    }
}
