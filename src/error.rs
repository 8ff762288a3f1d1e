//! Error types for the loader core.
//!
//! Nothing here crosses the cache/queue boundary as a panic: every failure
//! is terminal for one request and leaves the cache, the queue and other
//! in-flight requests untouched.

use thiserror::Error;

/// Why a single request did not produce a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Key that can't name a resource (empty, or escapes the asset root).
    #[error("invalid key '{0}'")]
    InvalidRequest(String),
    /// Bytes could not be obtained for the key.
    #[error("fetch failed for '{key}': {reason}")]
    Fetch { key: String, reason: String },
    /// Fetch succeeded but returned zero bytes.
    #[error("empty payload for '{0}'")]
    EmptyPayload(String),
    /// Bytes were present but the decoder rejected them.
    #[error("decode failed for '{key}': {reason}")]
    Decode { key: String, reason: String },
}

impl LoadError {
    pub fn fetch(key: &str, reason: impl ToString) -> Self {
        LoadError::Fetch { key: key.to_string(), reason: reason.to_string() }
    }

    pub fn decode(key: &str, reason: impl ToString) -> Self {
        LoadError::Decode { key: key.to_string(), reason: reason.to_string() }
    }

    /// Key this error refers to
    pub fn key(&self) -> &str {
        match self {
            LoadError::Fetch { key, .. } | LoadError::Decode { key, .. } => key,
            LoadError::InvalidRequest(key) | LoadError::EmptyPayload(key) => key,
        }
    }
}

/// Cache mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("resource '{0}' is already cached")]
    AlreadyCached(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = LoadError::fetch("card_ace", "not found");
        assert_eq!(e.to_string(), "fetch failed for 'card_ace': not found");
        assert_eq!(e.key(), "card_ace");

        let e = LoadError::EmptyPayload("card_two".into());
        assert_eq!(e.to_string(), "empty payload for 'card_two'");

        let e = LoadError::InvalidRequest("../secret".into());
        assert_eq!(e.to_string(), "invalid key '../secret'");
        assert_eq!(e.key(), "../secret");

        let e = CacheError::AlreadyCached("card_ace".into());
        assert_eq!(e.to_string(), "resource 'card_ace' is already cached");
    }
}
