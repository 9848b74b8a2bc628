//! Core Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Core configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Periodic role cache refresh in seconds (default: 1800 = 30 min)
    pub role_cache_refresh_secs: u64,

    /// Minimum visible tag length (default: 2)
    pub tag_min_length: usize,

    /// Maximum visible tag length (default: 32)
    pub tag_max_length: usize,

    /// Maximum note length (default: 500)
    pub note_max_length: usize,

    /// Maximum length of ban, lock, watch, clear and report reasons (default: 200)
    pub reason_max_length: usize,

    /// Minimum appeal reason length (default: 10)
    pub appeal_min_length: usize,

    /// Maximum appeal reason length (default: 1000)
    pub appeal_max_length: usize,

    /// Maximum role name length (default: 32)
    pub role_name_max_length: usize,

    /// API keys a single player may hold (default: 5)
    pub max_api_keys: usize,

    /// Length of generated gift codes (default: 16)
    pub gift_code_length: usize,
}

/// Parse an optional numeric variable, failing on malformed values.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            role_cache_refresh_secs: parse_var("ROLE_CACHE_REFRESH_SECS", 1800)?,
            tag_min_length: parse_var("TAG_MIN_LENGTH", 2)?,
            tag_max_length: parse_var("TAG_MAX_LENGTH", 32)?,
            note_max_length: parse_var("NOTE_MAX_LENGTH", 500)?,
            reason_max_length: parse_var("REASON_MAX_LENGTH", 200)?,
            appeal_min_length: parse_var("APPEAL_MIN_LENGTH", 10)?,
            appeal_max_length: parse_var("APPEAL_MAX_LENGTH", 1000)?,
            role_name_max_length: parse_var("ROLE_NAME_MAX_LENGTH", 32)?,
            max_api_keys: parse_var("MAX_API_KEYS", 5)?,
            gift_code_length: parse_var("GIFT_CODE_LENGTH", 16)?,
        };

        if config.tag_min_length > config.tag_max_length {
            anyhow::bail!("TAG_MIN_LENGTH must not exceed TAG_MAX_LENGTH");
        }
        if config.appeal_min_length > config.appeal_max_length {
            anyhow::bail!("APPEAL_MIN_LENGTH must not exceed APPEAL_MAX_LENGTH");
        }
        if config.role_cache_refresh_secs == 0 {
            anyhow::bail!("ROLE_CACHE_REFRESH_SECS must be positive");
        }
        if config.gift_code_length < 8 {
            anyhow::bail!("GIFT_CODE_LENGTH must be at least 8");
        }

        Ok(config)
    }

    /// Role cache refresh interval.
    #[must_use]
    pub const fn role_cache_refresh(&self) -> Duration {
        Duration::from_secs(self.role_cache_refresh_secs)
    }

    /// Create a default configuration for testing.
    ///
    /// This should only be used in tests.
    #[must_use]
    pub const fn default_for_test() -> Self {
        Self {
            role_cache_refresh_secs: 1800,
            tag_min_length: 2,
            tag_max_length: 32,
            note_max_length: 500,
            reason_max_length: 200,
            appeal_min_length: 10,
            appeal_max_length: 1000,
            role_name_max_length: 32,
            max_api_keys: 5,
            gift_code_length: 16,
        }
    }
}
