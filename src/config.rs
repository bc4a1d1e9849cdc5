use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{BYTES_PER_MB, DB_FILENAME, ENHANCED_DIR_NAME, PROVIDER_API_URL};

fn default_api_url() -> String {
    PROVIDER_API_URL.to_string()
}

fn default_max_upload_mb() -> u64 {
    100
}

fn default_storage_days() -> u64 {
    7
}

fn default_max_concurrent_enhancements() -> usize {
    5
}

fn default_slack_channel() -> String {
    "#audio-enhancer".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_port() -> u16 {
    8000
}

/// Server configuration
///
/// Built once at startup (optional TOML file, then environment overrides) and
/// shared with every component behind an `Arc`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// ai-coustics API key (AI_COUSTICS_API_KEY). Requests fail while unset.
    pub api_key: Option<String>,
    /// Provider base URL (default: https://api.ai-coustics.io/v1)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Maximum upload size in MB (UPLOAD_MAX_SIZE_MB, default: 100)
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
    /// Days an enhanced file is kept on disk (STORAGE_DAYS, default: 7)
    #[serde(default = "default_storage_days")]
    pub storage_days: u64,
    /// Size of the blocking pool used to measure audio duration
    /// (MAX_CONCURRENT_ENHANCEMENTS, default: 5)
    #[serde(default = "default_max_concurrent_enhancements")]
    pub max_concurrent_enhancements: usize,
    /// Slack incoming webhook for the daily summary (SLACK_WEBHOOK_URL)
    pub slack_webhook_url: Option<String>,
    /// Channel named in the summary payload (SLACK_CHANNEL, default: #audio-enhancer)
    #[serde(default = "default_slack_channel")]
    pub slack_channel: String,
    /// Directory holding the database and the enhanced files (default: data)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding enhance.html and other static assets (default: static)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// HTTP port (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            max_upload_mb: default_max_upload_mb(),
            storage_days: default_storage_days(),
            max_concurrent_enhancements: default_max_concurrent_enhancements(),
            slack_webhook_url: None,
            slack_channel: default_slack_channel(),
            data_dir: default_data_dir(),
            static_dir: default_static_dir(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    format!("Failed to read config file '{}': {}", path.display(), e)
                })?;
                Self::from_toml_str(&content).map_err(|e| {
                    format!("Failed to parse config file '{}': {}", path.display(), e)
                })?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply environment-style overrides. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("AI_COUSTICS_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(value) = get("UPLOAD_MAX_SIZE_MB") {
            self.max_upload_mb = parse_env_number("UPLOAD_MAX_SIZE_MB", &value)?;
        }
        if let Some(value) = get("STORAGE_DAYS") {
            self.storage_days = parse_env_number("STORAGE_DAYS", &value)?;
        }
        if let Some(value) = get("MAX_CONCURRENT_ENHANCEMENTS") {
            self.max_concurrent_enhancements =
                parse_env_number("MAX_CONCURRENT_ENHANCEMENTS", &value)?;
        }
        if let Some(url) = get("SLACK_WEBHOOK_URL") {
            self.slack_webhook_url = Some(url);
        }
        if let Some(channel) = get("SLACK_CHANNEL") {
            self.slack_channel = channel;
        }
        Ok(())
    }

    /// Validate values that cannot be expressed through types alone
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_enhancements == 0 {
            return Err("max_concurrent_enhancements must be at least 1".to_string());
        }
        if self.max_upload_mb == 0 {
            return Err("max_upload_mb must be at least 1".to_string());
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| format!("Invalid api_url '{}': {}", self.api_url, e))?;
        if let Some(webhook) = &self.slack_webhook_url {
            url::Url::parse(webhook)
                .map_err(|e| format!("Invalid SLACK_WEBHOOK_URL: {}", e))?;
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.storage_days.saturating_mul(24 * 60 * 60))
    }

    pub fn enhanced_dir(&self) -> PathBuf {
        self.data_dir.join(ENHANCED_DIR_NAME)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILENAME)
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value for {}: '{}'", key, value))
}
