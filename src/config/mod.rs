//! Configuration management for Banterbot
//!
//! Configuration is loaded from `~/.banterbot/config.json` (or an explicit
//! path) with `BANTERBOT_*` environment variable overrides applied on top.
//! There is no global instance: the loaded [`Config`] is passed explicitly to
//! whatever needs it.

mod types;
pub mod validate;

pub use types::*;

use crate::error::{BanterError, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

impl Config {
    /// Returns the Banterbot configuration directory path (~/.banterbot)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".banterbot")
    }

    /// Returns the path to the config file (~/.banterbot/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, starts from the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    ///
    /// Unknown keys are reported as warnings, never as errors.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let raw: serde_json::Value = serde_json::from_str(&content)?;
            for diag in validate::unknown_field_diagnostics(&raw) {
                warn!("{}", diag);
            }
            serde_json::from_value(raw)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (the process environment
    /// in production, a map in tests).
    pub(crate) fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("BANTERBOT_TELEGRAM_TOKEN") {
            self.telegram.token = val;
        }
        if let Some(val) = lookup("BANTERBOT_CHAT_ID") {
            self.monitor.chat_id = val;
        }

        // Backend
        if let Some(val) = lookup("BANTERBOT_OPENAI_API_KEY") {
            self.provider.api_key = Some(val);
        }
        if let Some(val) = lookup("BANTERBOT_OPENAI_API_BASE") {
            self.provider.api_base = Some(val);
        }
        if let Some(val) = lookup("BANTERBOT_OPENAI_MODEL") {
            self.provider.model = val;
        }

        // Monitor thresholds
        if let Some(v) = lookup("BANTERBOT_ACTIVITY_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.monitor.activity_timeout_secs = v;
        }
        if let Some(v) = lookup("BANTERBOT_THRESHOLD_MIN").and_then(|v| v.parse().ok()) {
            self.monitor.threshold_min = v;
        }
        if let Some(v) = lookup("BANTERBOT_THRESHOLD_MAX").and_then(|v| v.parse().ok()) {
            self.monitor.threshold_max = v;
        }
        if let Some(v) = lookup("BANTERBOT_MENTION_COOLDOWN_SECS").and_then(|v| v.parse().ok()) {
            self.monitor.mention_cooldown_secs = v;
        }

        if let Some(val) = lookup("BANTERBOT_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every required setting and cross-field constraint.
    ///
    /// All problems are collected into a single `BanterError::Config` so the
    /// operator sees the full list at once.
    pub fn validate(&self) -> Result<()> {
        let errors = validate::validate_config(self);
        if errors.is_empty() {
            return Ok(());
        }
        let joined = errors
            .iter()
            .map(|d| format!("{}: {}", d.path, d.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(BanterError::Config(joined))
    }

    /// The backend API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
