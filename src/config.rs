//! Engine Configuration
//!
//! Loaded from JSON; every field has a default so an empty object is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_OPEN_DELIMITER: &str = "{{";
pub const DEFAULT_CLOSE_DELIMITER: &str = "}}";
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 32;
pub const DEFAULT_MAX_CACHED_TEMPLATES: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid delimiters: open {open:?}, close {close:?}")]
    InvalidDelimiters { open: String, close: String },

    #[error("maxChainLength must be at least 1")]
    InvalidChainLength,

    #[error("maxCachedTemplates must be at least 1 when cacheTemplates is on")]
    InvalidCacheSize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "default_open")]
    pub open_delimiter: String,
    #[serde(default = "default_close")]
    pub close_delimiter: String,
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
    #[serde(default = "default_true")]
    pub cache_templates: bool,
    /// The cache is emptied before an insert that would exceed this.
    #[serde(default = "default_max_cached_templates")]
    pub max_cached_templates: usize,
}

fn default_open() -> String { DEFAULT_OPEN_DELIMITER.to_string() }
fn default_close() -> String { DEFAULT_CLOSE_DELIMITER.to_string() }
fn default_max_chain_length() -> usize { DEFAULT_MAX_CHAIN_LENGTH }
fn default_true() -> bool { true }
fn default_max_cached_templates() -> usize { DEFAULT_MAX_CACHED_TEMPLATES }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            open_delimiter: default_open(),
            close_delimiter: default_close(),
            max_chain_length: default_max_chain_length(),
            cache_templates: true,
            max_cached_templates: default_max_cached_templates(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.syntax()?;
        if self.max_chain_length == 0 {
            return Err(ConfigError::InvalidChainLength);
        }
        if self.cache_templates && self.max_cached_templates == 0 {
            return Err(ConfigError::InvalidCacheSize);
        }
        Ok(())
    }

    pub fn syntax(&self) -> Result<Syntax, ConfigError> {
        Syntax::new(&self.open_delimiter, &self.close_delimiter)
    }
}

/// A validated pair of placeholder delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    open: String,
    close: String,
}

impl Syntax {
    pub fn new(open: &str, close: &str) -> Result<Self, ConfigError> {
        let invalid = open.is_empty()
            || close.is_empty()
            || open == close
            || open.contains('|')
            || close.contains('|')
            || open.contains('"')
            || close.contains('"');
        if invalid {
            return Err(ConfigError::InvalidDelimiters {
                open: open.to_string(),
                close: close.to_string(),
            });
        }
        Ok(Self {
            open: open.to_string(),
            close: close.to_string(),
        })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN_DELIMITER.to_string(),
            close: DEFAULT_CLOSE_DELIMITER.to_string(),
        }
    }
}
