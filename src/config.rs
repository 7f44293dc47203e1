//! Configuration file parser for ~/.config/duorou/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, though we log a warning for each one
//! since they are usually typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::{validate_catalog_url, UrlValidationError};

/// Published catalog bundle on the static site.
pub const DEFAULT_CATALOG_URL: &str = "https://dai1254473705.github.io/flower/data/image-links.json";

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

    #[error("Invalid catalog_url: {0}")]
    CatalogUrl(#[from] UrlValidationError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the catalog JSON is fetched from.
    pub catalog_url: String,

    /// Age after which a cached snapshot is no longer served without a
    /// synchronous refetch.
    pub cache_ttl_hours: u64,

    /// Upper bound on a single catalog fetch.
    pub fetch_timeout_secs: u64,

    /// Entries per page on paginated surfaces.
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            cache_ttl_hours: 24,
            fetch_timeout_secs: 10,
            page_size: 20,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Longest accepted cache TTL (one year).
    const MAX_CACHE_TTL_HOURS: u64 = 24 * 365;

    const KNOWN_KEYS: [&'static str; 4] = [
        "catalog_url",
        "cache_ttl_hours",
        "fetch_timeout_secs",
        "page_size",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Out-of-range values → `Err(ConfigError::InvalidValue)`
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
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            catalog_url = %config.catalog_url,
            ttl_hours = config.cache_ttl_hours,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values that would make the cache or pagination meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog_url(&self.catalog_url)?;
        if self.cache_ttl_hours == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache_ttl_hours",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache_ttl_hours > Self::MAX_CACHE_TTL_HOURS {
            return Err(ConfigError::InvalidValue {
                key: "cache_ttl_hours",
                reason: format!("must be at most {}", Self::MAX_CACHE_TTL_HOURS),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Saturates at the validated maximum for configs built without `validate`.
    pub fn cache_ttl(&self) -> chrono::Duration {
        let hours = self.cache_ttl_hours.min(Self::MAX_CACHE_TTL_HOURS) as i64;
        chrono::Duration::hours(hours)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
