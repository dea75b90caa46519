//! Configuration type definitions for Banterbot
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a config file only needs the secrets and the chat id.

use serde::{Deserialize, Serialize};

/// Main configuration struct for Banterbot
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Telegram transport configuration
    pub telegram: TelegramConfig,
    /// Completion backend configuration
    pub provider: ProviderConfig,
    /// Monitored chat and activity thresholds
    pub monitor: MonitorConfig,
    /// Daily scheduled posts
    pub schedule: ScheduleConfig,
    /// Sampling parameters for generated content
    pub generation: GenerationConfig,
    /// System persona, prompt templates and fallback lines
    pub persona: PersonaConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

// ============================================================================
// Transport
// ============================================================================

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub token: String,
}

// ============================================================================
// Backend
// ============================================================================

/// OpenAI-compatible completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key
    pub api_key: Option<String>,
    /// Base URL override (OpenAI-compatible gateways, local models)
    pub api_base: Option<String>,
    /// Model identifier
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

// ============================================================================
// Activity monitoring
// ============================================================================

/// The monitored chat and the knobs of the reactive response policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Chat id of the monitored group or channel (e.g. `-1001234567890`)
    pub chat_id: String,
    /// Seconds after the last message during which the chat counts as active
    pub activity_timeout_secs: u64,
    /// Minimum messages since the last comment before the bot may comment (inclusive)
    pub threshold_min: u32,
    /// Maximum messages since the last comment for which a comment is still relevant (inclusive)
    pub threshold_max: u32,
    /// Minimum seconds between two mention replies to the same user
    pub mention_cooldown_secs: u64,
    /// Number of recent messages kept as comment context
    pub recent_context_size: usize,
    /// Delay before a mention reply is sent, in milliseconds
    pub mention_reply_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            chat_id: String::new(),
            activity_timeout_secs: 3600,
            threshold_min: 5,
            threshold_max: 10,
            mention_cooldown_secs: 30,
            recent_context_size: 3,
            mention_reply_delay_ms: 1500,
        }
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// A base wall-clock time for a daily post, before randomization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTime {
    pub hour: u32,
    pub minute: u32,
}

impl PostTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }
}

/// Daily scheduled posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whether scheduled posts are enabled
    pub enabled: bool,
    /// Base local times of the daily posts
    pub posts: Vec<PostTime>,
    /// Each post time is shifted by a uniform offset in `[-max, +max]` minutes
    pub max_offset_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            posts: vec![
                PostTime::new(10, 0),
                PostTime::new(15, 0),
                PostTime::new(20, 0),
            ],
            max_offset_minutes: 30,
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Sampling parameters for each kind of generated content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature (high: creative output)
    pub temperature: f32,
    pub joke_max_tokens: u32,
    pub quote_max_tokens: u32,
    pub comment_max_tokens: u32,
    pub mention_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            joke_max_tokens: 200,
            quote_max_tokens: 150,
            comment_max_tokens: 150,
            mention_max_tokens: 150,
        }
    }
}

/// Persona and prompt material.
///
/// Templates use `{context}`, `{username}` and `{message}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub system_prompt: String,
    pub joke_prompt: String,
    pub quote_prompt: String,
    /// Must contain `{context}`
    pub comment_template: String,
    /// Must contain `{username}` and `{message}`
    pub mention_template: String,
    pub joke_fallback: String,
    pub comment_fallback: String,
    pub mention_fallback: String,
    /// Pool used when quote generation fails
    pub canned_quotes: Vec<String>,
    /// Used as comment context when no recent text was captured
    pub empty_context_placeholder: String,
    /// Used as the display name when a user has neither handle nor first name
    pub unknown_user_name: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        use crate::content::prompts;

        Self {
            system_prompt: prompts::SYSTEM_PROMPT.to_string(),
            joke_prompt: prompts::JOKE_PROMPT.to_string(),
            quote_prompt: prompts::QUOTE_PROMPT.to_string(),
            comment_template: prompts::COMMENT_TEMPLATE.to_string(),
            mention_template: prompts::MENTION_TEMPLATE.to_string(),
            joke_fallback: prompts::JOKE_FALLBACK.to_string(),
            comment_fallback: prompts::COMMENT_FALLBACK.to_string(),
            mention_fallback: prompts::MENTION_FALLBACK.to_string(),
            canned_quotes: prompts::CANNED_QUOTES
                .iter()
                .map(|q| q.to_string())
                .collect(),
            empty_context_placeholder: prompts::EMPTY_CONTEXT_PLACEHOLDER.to_string(),
            unknown_user_name: prompts::UNKNOWN_USER_NAME.to_string(),
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    #[default]
    Component,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Append JSON lines to this file instead of stdout (json format only)
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            file: None,
        }
    }
}
