//! Error types for Banterbot
//!
//! This module defines all error types used throughout the crate.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! The three failure families the controllers care about map onto variants:
//! - configuration problems: [`BanterError::Config`], fatal at startup
//! - generation backend failures: [`BanterError::ProviderTyped`], recovered
//!   locally by falling back to canned content
//! - transport failures: [`BanterError::Channel`], logged and the event dropped

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Provides fine-grained categorization of completion backend failures so the
/// logs say *why* a fallback line was posted instead of generated text.
#[derive(Debug)]
pub enum ProviderError {
    /// 401/403: Invalid API key or authentication failure
    Auth(String),
    /// 429: Rate limit or quota exceeded
    RateLimit(String),
    /// 402: Payment required or billing issue
    Billing(String),
    /// 500/502/503/504: Server-side errors
    ServerError(String),
    /// 400: Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404: Model not found or endpoint not available
    ModelNotFound(String),
    /// Connection or read timeout
    Timeout(String),
    /// Provider is overloaded: transient
    Overloaded(String),
    /// The backend answered but produced no usable text
    EmptyResponse(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::Billing(msg) => write!(f, "Billing error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ProviderError::Overloaded(msg) => write!(f, "Overloaded error: {}", msg),
            ProviderError::EmptyResponse(msg) => write!(f, "Empty response: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns `true` if the failure is transient (a later call may succeed).
    ///
    /// Nothing retries automatically; this only decides the log level.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_)
                | ProviderError::ServerError(_)
                | ProviderError::Timeout(_)
                | ProviderError::Overloaded(_)
        )
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::Billing(_) => Some(402),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ModelNotFound(_) => Some(404),
            ProviderError::Overloaded(_) => Some(503),
            ProviderError::Timeout(_)
            | ProviderError::EmptyResponse(_)
            | ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for BanterError {
    fn from(err: ProviderError) -> Self {
        BanterError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Banterbot operations.
#[derive(Error, Debug)]
pub enum BanterError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unclassified provider errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error with classification.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// Channel errors (send failures, connection failures, bad chat ids, etc.)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Message bus channel closed unexpectedly
    #[error("Bus error: channel closed")]
    BusClosed,
}

impl BanterError {
    /// Returns `true` for failures that came from the completion backend.
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            BanterError::Provider(_) | BanterError::ProviderTyped(_) | BanterError::Http(_)
        )
    }
}

/// A specialized `Result` type for Banterbot operations.
pub type Result<T> = std::result::Result<T, BanterError>;
