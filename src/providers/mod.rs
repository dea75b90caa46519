//! Providers module - text-generation backends
//!
//! This module defines the `LLMProvider` trait, the single-turn
//! `CompletionRequest`, and the OpenAI-compatible implementation. Backend
//! failures are classified into [`ProviderError`] so callers can log a
//! meaningful reason before falling back to canned text.
//!
//! # Example
//!
//! ```rust,ignore
//! use banterbot::providers::{CompletionRequest, LLMProvider, OpenAIProvider};
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key", "gpt-4o-mini");
//!     let request = CompletionRequest::new("You are terse.", "Hello!").with_max_tokens(50);
//!
//!     let text = provider.complete(request).await.unwrap();
//!     println!("Response: {}", text);
//! }
//! ```

mod error_classifier;
pub mod openai;
mod types;

use crate::error::ProviderError;

pub use error_classifier::classify_error_message;
pub use openai::OpenAIProvider;
pub use types::{CompletionRequest, LLMProvider};

#[cfg(test)]
pub use types::MockLLMProvider;

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}
