//! OpenAI Provider Implementation
//!
//! This module implements the `LLMProvider` trait for OpenAI's Chat Completions API
//! (and any OpenAI-compatible gateway), sending a system + user message pair and
//! returning the first choice's text.
//!
//! # Example
//!
//! ```rust,ignore
//! use banterbot::providers::{CompletionRequest, LLMProvider, OpenAIProvider};
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key", "gpt-4o-mini");
//!     let request = CompletionRequest::new("You are grumpy.", "Tell a joke")
//!         .with_max_tokens(200);
//!
//!     let text = provider.complete(request).await.unwrap();
//!     println!("OpenAI: {}", text);
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{BanterError, ProviderError, Result};

use super::{classify_error_message, parse_provider_error, CompletionRequest, LLMProvider};

/// The OpenAI API endpoint URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// OpenAI API Request Types
// ============================================================================

/// OpenAI API request body.
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    /// System persona followed by the user prompt
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// A message in OpenAI's format.
#[derive(Debug, Serialize)]
struct OpenAIMessage {
    /// Role: "system" or "user"
    role: &'static str,
    content: String,
}

// ============================================================================
// OpenAI API Response Types
// ============================================================================

/// OpenAI API response body.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    /// Text content (may be null for refusals or filtered output)
    content: Option<String>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

/// OpenAI API error details.
#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// OpenAI Provider
// ============================================================================

/// OpenAI-compatible completion backend.
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// API base URL without trailing slash
    api_base: String,
    /// Model identifier sent with every request
    model: String,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider against the default OpenAI endpoint.
    ///
    /// # Example
    /// ```
    /// use banterbot::providers::{LLMProvider, OpenAIProvider};
    ///
    /// let provider = OpenAIProvider::new("sk-xxx", "gpt-4o-mini");
    /// assert_eq!(provider.name(), "openai");
    /// ```
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_client(api_key, OPENAI_API_URL, model, Client::new())
    }

    /// Create a provider with a custom base URL and HTTP client.
    ///
    /// The trailing slash of `api_base` is removed.
    pub fn with_client(api_key: &str, api_base: &str, model: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        }
    }

    /// Build a provider from configuration, applying the request timeout.
    ///
    /// # Errors
    /// Returns `BanterError::Config` if no API key is configured.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BanterError::Config("provider.api_key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::with_client(
            api_key,
            config.api_base.as_deref().unwrap_or(OPENAI_API_URL),
            &config.model,
            client,
        ))
    }

    /// The model this provider requests.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                OpenAIMessage {
                    role: "user",
                    content: request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

/// Map a failed HTTP response to a classified provider error.
///
/// The status code decides first; statuses without a fixed meaning fall back
/// to pattern matching on the error body.
fn classify_http_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(parsed) => match parsed.error.r#type {
            Some(kind) => format!("{} - {}", kind, parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.to_string(),
    };

    match parse_provider_error(status, &message) {
        ProviderError::Unknown(_) => classify_error_message(&format!("HTTP {}: {}", status, message)),
        classified => classified,
    }
}

/// Extract the first choice's text. Missing or blank content is an error.
fn extract_text(response: OpenAIResponse) -> std::result::Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ProviderError::EmptyResponse("no text in first choice".to_string()))
}

// ============================================================================
// LLMProvider Implementation
// ============================================================================

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = self.build_request(request);

        debug!(
            "OpenAI request to model {} (max_tokens: {})",
            self.model, body.max_tokens
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(format!("OpenAI request timed out: {}", e))
                } else {
                    classify_error_message(&format!("OpenAI request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &error_text).into());
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidRequest(format!("Failed to parse OpenAI response: {}", e))
        })?;

        debug!("OpenAI response received");
        Ok(extract_text(openai_response)?)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Tests
// ============================================================================
