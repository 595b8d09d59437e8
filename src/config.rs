//! Configuration file parser for the embedding host.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields`
//! off), though we log a warning when the file contains potential typos.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed URL: {0}")]
    InvalidFeedUrl(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Panel pipeline configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote news controller.
    pub feed_url: String,

    /// Per-request timeout in seconds. `None` (the default) applies no
    /// timeout; there is no retry or backoff either way.
    pub request_timeout_secs: Option<u64>,

    /// Maximum accepted response body, in bytes.
    pub max_feed_bytes: usize,

    /// Parallel image requests per enrichment pass.
    pub image_concurrency: usize,

    /// Wire the pagination prefetch trigger to actually start enrichment of
    /// the next page. Off by default; the trigger is computed either way.
    pub prefetch_enabled: bool,

    /// SQLite path for durable engagement counters. `:memory:` keeps them
    /// session-scoped.
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            request_timeout_secs: None,
            max_feed_bytes: 10 * 1024 * 1024,
            image_concurrency: 4,
            prefetch_enabled: false,
            database_path: "feedpanel.db".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Non-empty `feed_url` that does not parse → `Err(ConfigError::InvalidFeedUrl)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feed_url",
                "request_timeout_secs",
                "max_feed_bytes",
                "image_concurrency",
                "prefetch_enabled",
                "database_path",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        if !config.feed_url.is_empty() {
            url::Url::parse(&config.feed_url)
                .map_err(|e| ConfigError::InvalidFeedUrl(format!("{}: {}", config.feed_url, e)))?;
        }

        tracing::info!(
            path = %path.display(),
            feed_url = %config.feed_url,
            prefetch_enabled = config.prefetch_enabled,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.feed_url.is_empty());
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.max_feed_bytes, 10 * 1024 * 1024);
        assert_eq!(config.image_concurrency, 4);
        assert!(!config.prefetch_enabled);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedpanel_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert!(!config.prefetch_enabled);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("feedpanel_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "prefetch_enabled = true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.prefetch_enabled);
        assert_eq!(config.image_concurrency, 4); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("feedpanel_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
feed_url = "https://news.example/api/v1"
request_timeout_secs = 30
max_feed_bytes = 1048576
image_concurrency = 8
prefetch_enabled = true
database_path = ":memory:"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_url, "https://news.example/api/v1");
        assert_eq!(config.request_timeout_secs, Some(30));
        assert_eq!(config.max_feed_bytes, 1_048_576);
        assert_eq!(config.image_concurrency, 8);
        assert!(config.prefetch_enabled);
        assert_eq!(config.database_path, ":memory:");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("feedpanel_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_feed_url_rejected() {
        let dir = std::env::temp_dir().join("feedpanel_config_test_badurl");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "feed_url = \"not a url\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFeedUrl(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("feedpanel_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "totally_fake_key = \"ignored\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.feed_url.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("feedpanel_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }
}
