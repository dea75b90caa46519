//! Provider types for Banterbot
//!
//! This module defines the `LLMProvider` trait and the single-turn
//! completion request the content generator sends through it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cap on generated tokens when a request does not set one.
const DEFAULT_MAX_TOKENS: u32 = 150;

/// Default sampling temperature; high on purpose, output should vary.
const DEFAULT_TEMPERATURE: f32 = 0.9;

/// A single-turn completion request: one system persona, one user prompt.
///
/// Use the builder methods to set sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Fixed persona instructions
    pub system_prompt: String,
    /// The templated prompt for this particular generation
    pub user_prompt: String,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create a request with default sampling parameters.
    ///
    /// # Example
    /// ```
    /// use banterbot::providers::CompletionRequest;
    ///
    /// let req = CompletionRequest::new("You are terse.", "Say hi")
    ///     .with_max_tokens(20)
    ///     .with_temperature(0.5);
    /// assert_eq!(req.max_tokens, 20);
    /// assert_eq!(req.temperature, 0.5);
    /// ```
    pub fn new(system_prompt: &str, user_prompt: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for text-generation backends.
///
/// A backend is stateless: every call stands alone, and any transport,
/// quota or parse problem comes back as an error for the caller to degrade
/// gracefully.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Run a single completion and return the generated text as-is.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Get the provider name (e.g., "openai").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_defaults() {
        let req = CompletionRequest::new("system", "user");
        assert_eq!(req.system_prompt, "system");
        assert_eq!(req.user_prompt, "user");
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(req.temperature, DEFAULT_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_mock_provider_returns_scripted_text() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .withf(|req| req.max_tokens == 200)
            .times(1)
            .returning(|_| Ok("scripted".to_string()));

        let req = CompletionRequest::new("s", "u").with_max_tokens(200);
        assert_eq!(mock.complete(req).await.unwrap(), "scripted");
    }
}
