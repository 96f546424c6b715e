//! # Configuration Management Module
//!
//! TOML configuration for the mention engine and its CLI.
//!
//! - [`MentionsConfig`] - trigger character, candidate cap, quote handling, permitted groups
//! - [`StorageConfig`] - data directory and sled database location
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [mentions]
//! trigger = "@"
//! max_candidate_chars = 60
//! strip_quotes = true
//! mention_groups = []        # empty: every member may mention
//!
//! [storage]
//! data_dir = "./data"
//! # db_path = "./data/mentions"
//!
//! [logging]
//! level = "info"
//! file = "storybb-mentions.log"
//! ```
//!
//! Every section is optional; missing values take the defaults shown.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::mentions::scanner::{ScanOptions, DEFAULT_MAX_CANDIDATE_CHARS, DEFAULT_TRIGGER};
use crate::validation::NameRules;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mentions: MentionsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionsConfig {
    /// Single character that opens a mention. Letters, digits and whitespace
    /// are rejected; an invalid value falls back to "@".
    #[serde(default = "default_trigger")]
    pub trigger: String,
    /// Names longer than this (in decoded characters) cannot be mentioned.
    #[serde(default = "default_max_candidate_chars")]
    pub max_candidate_chars: usize,
    /// Ignore mentions inside [quote] blocks.
    #[serde(default = "default_strip_quotes")]
    pub strip_quotes: bool,
    /// Groups allowed to mention. Empty means everyone.
    #[serde(default)]
    pub mention_groups: Vec<u32>,
}

fn default_trigger() -> String {
    DEFAULT_TRIGGER.to_string()
}

fn default_max_candidate_chars() -> usize {
    DEFAULT_MAX_CANDIDATE_CHARS
}

fn default_strip_quotes() -> bool {
    true
}

impl Default for MentionsConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            max_candidate_chars: default_max_candidate_chars(),
            strip_quotes: default_strip_quotes(),
            mention_groups: Vec::new(),
        }
    }
}

impl MentionsConfig {
    /// The configured trigger, or `@` when the setting is unusable.
    pub fn trigger_char(&self) -> char {
        let mut chars = self.trigger.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_alphanumeric() && !c.is_whitespace() && c != '_' => c,
            _ => {
                warn!(
                    "Invalid mention trigger '{}', defaulting to '{}'",
                    self.trigger, DEFAULT_TRIGGER
                );
                DEFAULT_TRIGGER
            }
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            trigger: self.trigger_char(),
            max_candidate_chars: self.max_candidate_chars.max(1),
            strip_quotes: self.strip_quotes,
        }
    }

    /// Name rules that keep every stored name mentionable.
    pub fn name_rules(&self) -> NameRules {
        NameRules::with_max_length(self.max_candidate_chars.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Sled database directory; defaults to `<data_dir>/mentions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("mentions"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("storybb-mentions.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Parsed level; unknown strings mean `info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
