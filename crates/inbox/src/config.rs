//! Configuration loading for the inbox engine
//!
//! Settings are read from (in order of priority):
//! 1. Environment variables (`INBOX_API_URL`, `INBOX_API_TOKEN`,
//!    `INBOX_PAGE_SIZE`, `INBOX_KEY_ORDER`)
//! 2. JSON file (~/.config/inbox/inbox.json, or an explicit path)
//! 3. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::grouping::KeyOrder;
use crate::source::DEFAULT_PAGE_SIZE;

/// Config filename in the inbox config directory
const CONFIG_FILE: &str = "inbox.json";

const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Runtime settings for fetching and grouping messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Base URL of the messages backend
    pub api_base_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Messages per page
    pub page_size: u32,
    /// Address order inside fallback group keys
    pub key_order: KeyOrder,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            key_order: KeyOrder::default(),
        }
    }
}

impl InboxConfig {
    /// Load from the default config file (if present), then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let base: Self = if config::config_exists(CONFIG_FILE) {
            config::load_json(CONFIG_FILE)?
        } else {
            Self::default()
        };
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Load from a specific JSON file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let base: Self = config::load_json_file(path)?;
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse inbox config JSON")
    }

    /// Apply overrides looked up through `var`
    pub fn with_env_overrides<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("INBOX_API_URL") {
            self.api_base_url = url;
        }
        if let Some(token) = var("INBOX_API_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Some(size) = var("INBOX_PAGE_SIZE") {
            self.page_size = size
                .trim()
                .parse()
                .with_context(|| format!("Invalid INBOX_PAGE_SIZE: {}", size))?;
        }
        if let Some(order) = var("INBOX_KEY_ORDER") {
            self.key_order = order.parse()?;
        }
        Ok(self)
    }

    /// Save to the default config file
    pub fn save(&self) -> Result<()> {
        config::save_json(CONFIG_FILE, self)
    }

    /// Get the default config file path (~/.config/inbox/inbox.json)
    pub fn default_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }
}
