// Run configuration, stored as JSON next to the database

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/reelsort/";
pub const DATABASE_FILE: &str = "reelsort.db";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root volumes and media-type folders that are never classified.
    pub excluded_folders: BTreeSet<String>,
    /// Studio labels stripped from genre lists and never stored as genres.
    pub studio_labels: BTreeSet<String>,
    /// Content ratings from least to most restrictive.
    pub rating_order: Vec<String>,
    pub release_date_format: String,
    pub list_delimiter: String,
    /// Value the metadata provider uses for "unknown".
    pub placeholder: String,
    pub augment: AugmentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            excluded_folders: ["E:", "Films", "Media", "Series", "Movies"]
                .into_iter()
                .map(String::from)
                .collect(),
            studio_labels: ["DC", "Marvel"].into_iter().map(String::from).collect(),
            rating_order: ["G", "PG", "TV-PG", "PG-13", "R", "NC-17"]
                .into_iter()
                .map(String::from)
                .collect(),
            release_date_format: "%d %b %Y".to_string(),
            list_delimiter: ",".to_string(),
            placeholder: "N/A".to_string(),
            augment: AugmentConfig::default(),
        }
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:4891".to_string(),
            model: "Meta-Llama-3-8B-Instruct.Q4_0.gguf".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.list_delimiter.is_empty() {
            return Err(CoreError::Config("list_delimiter must not be empty".to_string()));
        }
        if self.rating_order.is_empty() {
            return Err(CoreError::Config("rating_order must not be empty".to_string()));
        }
        if self.release_date_format.is_empty() {
            return Err(CoreError::Config(
                "release_date_format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
