//! Content generation.
//!
//! [`ContentGenerator`] turns the persona and prompt templates into backend
//! requests for the four kinds of text the agent posts: jokes, quotes,
//! comments on recent chatter, and replies to direct mentions.
//!
//! Generation never fails from the caller's point of view. A backend error,
//! or a completion that is blank after trimming, is logged and replaced by a
//! fallback line from the persona (a random canned quote for quotes).

pub mod prompts;

use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{GenerationConfig, PersonaConfig};
use crate::error::{BanterError, ProviderError, Result};
use crate::providers::{CompletionRequest, LLMProvider};
use crate::utils::string::log_preview;

/// What a piece of generated text was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Joke,
    Quote,
    Comment,
    MentionReply,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Joke => "joke",
            ContentKind::Quote => "quote",
            ContentKind::Comment => "comment",
            ContentKind::MentionReply => "mention_reply",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generated text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub kind: ContentKind,
    /// Trimmed, never empty
    pub text: String,
    /// True if the backend failed and a fallback line was used
    pub fallback: bool,
}

/// Produces persona-consistent text through an [`LLMProvider`].
pub struct ContentGenerator {
    provider: Arc<dyn LLMProvider>,
    generation: GenerationConfig,
    persona: PersonaConfig,
}

impl ContentGenerator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        generation: GenerationConfig,
        persona: PersonaConfig,
    ) -> Self {
        Self {
            provider,
            generation,
            persona,
        }
    }

    /// A joke or a quote, picked 50/50.
    pub async fn generate_ambient_content(&self) -> Generated {
        // The RNG is not Send; pick before the first await
        if pick_joke() {
            self.generate_joke().await
        } else {
            self.generate_quote().await
        }
    }

    pub async fn generate_joke(&self) -> Generated {
        let result = self
            .complete(&self.persona.joke_prompt, self.generation.joke_max_tokens)
            .await;
        self.finish(ContentKind::Joke, result, || {
            non_empty_or(&self.persona.joke_fallback, prompts::JOKE_FALLBACK)
        })
    }

    /// A quote; on failure a random entry from the canned pool.
    pub async fn generate_quote(&self) -> Generated {
        let result = self
            .complete(&self.persona.quote_prompt, self.generation.quote_max_tokens)
            .await;
        self.finish(ContentKind::Quote, result, || {
            canned_quote(&self.persona.canned_quotes)
        })
    }

    /// A remark on `recent_context` (recent messages, one per line).
    pub async fn generate_comment(&self, recent_context: &str) -> Generated {
        let prompt = render(
            &self.persona.comment_template,
            &[("context", recent_context)],
        );
        let result = self
            .complete(&prompt, self.generation.comment_max_tokens)
            .await;
        self.finish(ContentKind::Comment, result, || {
            non_empty_or(&self.persona.comment_fallback, prompts::COMMENT_FALLBACK)
        })
    }

    /// A reply to `message_text`, addressed to `display_name`.
    pub async fn generate_mention_reply(&self, message_text: &str, display_name: &str) -> Generated {
        let prompt = render(
            &self.persona.mention_template,
            &[("username", display_name), ("message", message_text)],
        );
        let result = self
            .complete(&prompt, self.generation.mention_max_tokens)
            .await;
        self.finish(ContentKind::MentionReply, result, || {
            non_empty_or(&self.persona.mention_fallback, prompts::MENTION_FALLBACK)
        })
    }

    async fn complete(&self, user_prompt: &str, max_tokens: u32) -> Result<String> {
        let request = CompletionRequest::new(&self.persona.system_prompt, user_prompt)
            .with_max_tokens(max_tokens)
            .with_temperature(self.generation.temperature);

        let text = self.provider.complete(request).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::EmptyResponse("completion was blank".to_string()).into());
        }
        Ok(trimmed.to_string())
    }

    fn finish<F>(&self, kind: ContentKind, result: Result<String>, fallback: F) -> Generated
    where
        F: FnOnce() -> String,
    {
        match result {
            Ok(text) => {
                crate::log_component!(
                    info,
                    "content",
                    "generated text",
                    kind = kind.as_str(),
                    preview = log_preview(&text).as_str()
                );
                Generated {
                    kind,
                    text,
                    fallback: false,
                }
            }
            Err(e) => {
                if is_transient(&e) {
                    crate::log_component!(
                        warn,
                        "content",
                        "generation failed, using fallback",
                        kind = kind.as_str(),
                        status = status_code(&e),
                        error = tracing::field::display(&e)
                    );
                } else {
                    crate::log_component!(
                        error,
                        "content",
                        "generation failed, using fallback",
                        kind = kind.as_str(),
                        status = status_code(&e),
                        error = tracing::field::display(&e)
                    );
                }
                Generated {
                    kind,
                    text: fallback(),
                    fallback: true,
                }
            }
        }
    }
}

fn is_transient(err: &BanterError) -> bool {
    match err {
        BanterError::ProviderTyped(pe) => pe.is_transient(),
        BanterError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

fn status_code(err: &BanterError) -> Option<u16> {
    match err {
        BanterError::ProviderTyped(pe) => pe.status_code(),
        BanterError::Http(e) => e.status().map(|s| s.as_u16()),
        _ => None,
    }
}

fn pick_joke() -> bool {
    rand::thread_rng().gen_bool(0.5)
}

fn canned_quote(pool: &[String]) -> String {
    let mut rng = rand::thread_rng();
    let configured: Vec<&String> = pool.iter().filter(|q| !q.trim().is_empty()).collect();
    match configured.choose(&mut rng) {
        Some(quote) => quote.to_string(),
        None => prompts::CANNED_QUOTES
            .choose(&mut rng)
            .copied()
            .unwrap_or(prompts::JOKE_FALLBACK)
            .to_string(),
    }
}

fn non_empty_or(configured: &str, default: &str) -> String {
    if configured.trim().is_empty() {
        default.to_string()
    } else {
        configured.to_string()
    }
}

/// Substitute `{name}` placeholders in one pass.
///
/// Substituted values are never rescanned, so user text containing
/// `{message}` cannot pull in other values. Unknown placeholders are kept
/// verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockLLMProvider;

    fn generator(mock: MockLLMProvider) -> ContentGenerator {
        ContentGenerator::new(
            Arc::new(mock),
            GenerationConfig::default(),
            PersonaConfig::default(),
        )
    }

    fn failing() -> MockLLMProvider {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .returning(|_| Err(ProviderError::RateLimit("429".into()).into()));
        mock
    }

    #[test]
    fn test_failure_status_for_logging() {
        let rate_limited: BanterError = ProviderError::RateLimit("slow down".into()).into();
        assert_eq!(status_code(&rate_limited), Some(429));
        assert!(is_transient(&rate_limited));

        let auth: BanterError = ProviderError::Auth("bad key".into()).into();
        assert_eq!(status_code(&auth), Some(401));
        assert!(!is_transient(&auth));

        let empty: BanterError = ProviderError::EmptyResponse("blank".into()).into();
        assert_eq!(status_code(&empty), None);
        assert_eq!(status_code(&BanterError::Channel("down".into())), None);
    }

    #[test]
    fn test_render_substitutes_each_placeholder() {
        let out = render(
            "{username} said: {message}",
            &[("username", "ann"), ("message", "hi")],
        );
        assert_eq!(out, "ann said: hi");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let out = render(
            "{username}: {message}",
            &[("username", "{message}"), ("message", "x")],
        );
        assert_eq!(out, "{message}: x");
    }

    #[test]
    fn test_render_keeps_unknown_and_unbalanced_braces() {
        assert_eq!(render("{other} {context", &[("context", "c")]), "{other} {context");
        assert_eq!(render("a{context}b", &[("context", "привет")]), "aприветb");
    }

    #[tokio::test]
    async fn test_joke_uses_persona_and_token_budget() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .withf(|req| {
                req.system_prompt == prompts::SYSTEM_PROMPT
                    && req.user_prompt == prompts::JOKE_PROMPT
                    && req.max_tokens == 200
                    && req.temperature == 0.9
            })
            .times(1)
            .returning(|_| Ok("  a joke  \n".to_string()));

        let out = generator(mock).generate_joke().await;
        assert_eq!(out.text, "a joke");
        assert_eq!(out.kind, ContentKind::Joke);
        assert!(!out.fallback);
    }

    #[tokio::test]
    async fn test_comment_prompt_includes_context() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .withf(|req| req.user_prompt.contains("first\nsecond") && req.max_tokens == 150)
            .times(1)
            .returning(|_| Ok("meh".to_string()));

        let out = generator(mock).generate_comment("first\nsecond").await;
        assert_eq!(out.text, "meh");
    }

    #[tokio::test]
    async fn test_mention_prompt_names_user() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .withf(|req| req.user_prompt.contains("ann") && req.user_prompt.contains("you there?"))
            .times(1)
            .returning(|_| Ok("what".to_string()));

        let out = generator(mock)
            .generate_mention_reply("you there?", "ann")
            .await;
        assert_eq!(out.kind, ContentKind::MentionReply);
        assert_eq!(out.text, "what");
    }

    #[tokio::test]
    async fn test_backend_failure_yields_fallbacks() {
        let gen = generator(failing());

        let joke = gen.generate_joke().await;
        assert!(joke.fallback);
        assert_eq!(joke.text, prompts::JOKE_FALLBACK);

        let comment = gen.generate_comment("ctx").await;
        assert_eq!(comment.text, prompts::COMMENT_FALLBACK);

        let reply = gen.generate_mention_reply("hi", "ann").await;
        assert_eq!(reply.text, prompts::MENTION_FALLBACK);

        let quote = gen.generate_quote().await;
        assert!(quote.fallback);
        assert!(prompts::CANNED_QUOTES.contains(&quote.text.as_str()));
    }

    #[tokio::test]
    async fn test_blank_completion_is_a_failure() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete().returning(|_| Ok("   \n".to_string()));

        let out = generator(mock).generate_joke().await;
        assert!(out.fallback);
        assert!(!out.text.is_empty());
    }

    #[tokio::test]
    async fn test_quote_fallback_uses_configured_pool() {
        let mut persona = PersonaConfig::default();
        persona.canned_quotes = vec!["only one".to_string()];
        let gen = ContentGenerator::new(
            Arc::new(failing()),
            GenerationConfig::default(),
            persona,
        );
        assert_eq!(gen.generate_quote().await.text, "only one");
    }

    #[tokio::test]
    async fn test_empty_configured_fallbacks_use_builtins() {
        let mut persona = PersonaConfig::default();
        persona.joke_fallback = "  ".to_string();
        persona.canned_quotes = Vec::new();
        let gen = ContentGenerator::new(
            Arc::new(failing()),
            GenerationConfig::default(),
            persona,
        );
        assert_eq!(gen.generate_joke().await.text, prompts::JOKE_FALLBACK);
        assert!(prompts::CANNED_QUOTES.contains(&gen.generate_quote().await.text.as_str()));
    }

    #[tokio::test]
    async fn test_ambient_content_is_joke_or_quote() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .returning(|req| Ok(format!("echo {}", req.max_tokens)));
        let gen = generator(mock);

        let mut seen_joke = false;
        let mut seen_quote = false;
        for _ in 0..64 {
            let out = gen.generate_ambient_content().await;
            match out.kind {
                ContentKind::Joke => {
                    assert_eq!(out.text, "echo 200");
                    seen_joke = true;
                }
                ContentKind::Quote => {
                    assert_eq!(out.text, "echo 150");
                    seen_quote = true;
                }
                other => panic!("unexpected ambient kind {:?}", other),
            }
        }
        // 2^-63 chance of a false failure
        assert!(seen_joke && seen_quote);
    }
}
