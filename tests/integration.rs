//! Integration tests for Banterbot
//!
//! These tests drive the conversation and schedule controllers through the
//! public API with an in-memory transport and a scripted backend, checking
//! the observable behaviour: what gets sent, when, and what state survives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::tempdir;

use banterbot::{
    bus::{InboundMessage, MessageBus, OutboundMessage},
    channels::{AgentIdentity, Channel},
    config::Config,
    content::prompts,
    error::{BanterError, ProviderError, Result},
    providers::{CompletionRequest, LLMProvider},
    runtime::AgentContext,
    schedule::FireOutcome,
    HandleOutcome,
};

const CHAT: &str = "-1001";
const AGENT_ID: &str = "7";

// ============================================================================
// Test doubles
// ============================================================================

/// Transport that records every send and can fail the next N sends.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<OutboundMessage>>,
    failures_left: AtomicUsize,
}

impl RecordingChannel {
    fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn identity(&self) -> Result<AgentIdentity> {
        Ok(AgentIdentity::new(AGENT_ID, Some("mybot")))
    }

    async fn send(&self, msg: OutboundMessage) -> Result<()> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BanterError::Channel("scripted send failure".into()));
        }
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }
}

/// Backend that replays scripted results, then echoes the user prompt.
#[derive(Default)]
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn push(&self, result: Result<String>) {
        self.script.lock().unwrap().push_back(result);
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(format!("  generated: {}  ", request.user_prompt)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct Harness {
    ctx: AgentContext,
    channel: Arc<RecordingChannel>,
    provider: Arc<ScriptedProvider>,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.monitor.chat_id = CHAT.to_string();
    config.monitor.threshold_min = 5;
    config.monitor.threshold_max = 10;
    config.monitor.mention_cooldown_secs = 30;
    config.monitor.mention_reply_delay_ms = 0;
    config.monitor.activity_timeout_secs = 3600;
    config.schedule.enabled = false;
    config
}

fn harness() -> Harness {
    harness_with(test_config())
}

fn harness_with(config: Config) -> Harness {
    let channel = Arc::new(RecordingChannel::default());
    let provider = Arc::new(ScriptedProvider::default());
    let ctx = AgentContext::new(
        &config,
        AgentIdentity::new(AGENT_ID, Some("mybot")),
        Arc::new(MessageBus::new()),
        Arc::clone(&provider) as Arc<dyn LLMProvider>,
        Arc::clone(&channel) as Arc<dyn Channel>,
    );
    Harness {
        ctx,
        channel,
        provider,
    }
}

fn chatter(sender: &str, text: &str) -> InboundMessage {
    InboundMessage::group(CHAT, sender, text)
}

// ============================================================================
// Ambient tracking
// ============================================================================

#[tokio::test]
async fn test_counter_counts_only_non_agent_messages() {
    let h = harness();
    let now = Instant::now();

    for i in 0..4 {
        h.ctx
            .conversation
            .handle(&chatter(&format!("u{i}"), "hello"), now)
            .await;
        h.ctx
            .conversation
            .handle(&chatter(AGENT_ID, "my own post"), now)
            .await;
    }

    assert_eq!(h.ctx.monitor.counter(), 4);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_threshold_comment_is_one_shot() {
    let h = harness();
    let now = Instant::now();
    let texts = ["one", "two", "three", "four", "five"];

    let mut outcomes = Vec::new();
    for text in texts {
        outcomes.push(h.ctx.conversation.handle(&chatter("42", text), now).await);
    }
    assert_eq!(outcomes[4], HandleOutcome::Commented { fallback: false });

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, CHAT);
    assert!(sent[0].reply_to.is_none());
    // Only the last three texts make it into the prompt, newest last
    assert!(sent[0].content.contains("three\nfour\nfive"));
    assert!(!sent[0].content.contains("two"));
    // Completion whitespace is trimmed
    assert!(sent[0].content.starts_with("generated:"));
    assert_eq!(h.ctx.monitor.counter(), 0);

    // The same sequence needs the full threshold again
    for text in &texts[..4] {
        h.ctx.conversation.handle(&chatter("42", text), now).await;
    }
    assert_eq!(h.channel.sent().len(), 1);
    h.ctx.conversation.handle(&chatter("42", texts[4]), now).await;
    assert_eq!(h.channel.sent().len(), 2);
}

#[tokio::test]
async fn test_stale_chatter_still_counts_toward_threshold() {
    let h = harness();
    let start = Instant::now();

    for _ in 0..4 {
        h.ctx.conversation.handle(&chatter("42", "x"), start).await;
    }
    // Fifth message is itself fresh activity, so the chat is active again
    let later = start + Duration::from_secs(7200);
    assert_eq!(
        h.ctx.conversation.handle(&chatter("42", "x"), later).await,
        HandleOutcome::Commented { fallback: false }
    );
}

#[tokio::test]
async fn test_send_failure_drops_comment_and_starts_fresh() {
    let h = harness();
    let now = Instant::now();
    h.channel.fail_next(1);

    for _ in 0..4 {
        h.ctx.conversation.handle(&chatter("42", "x"), now).await;
    }
    let failed = h.ctx.conversation.handle(&chatter("42", "x"), now).await;
    assert!(matches!(failed, HandleOutcome::SendFailed { .. }));
    assert_eq!(h.ctx.monitor.counter(), 0);
    assert_eq!(h.ctx.conversation.buffered_messages(), 0);

    // The next message starts a new count instead of retrying
    let next = h.ctx.conversation.handle(&chatter("42", "y"), now).await;
    assert_eq!(next, HandleOutcome::Tracked { counter: 1 });
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_commenting_resumes_after_transport_outage() {
    let mut config = test_config();
    config.monitor.threshold_min = 3;
    config.monitor.threshold_max = 5;
    let h = harness_with(config);
    let now = Instant::now();
    h.channel.fail_next(3);

    for i in 0..50 {
        h.ctx
            .conversation
            .handle(&chatter("42", &format!("msg {i}")), now)
            .await;
    }

    // Triggers on every third message; the first three are lost to the outage
    assert_eq!(h.channel.sent().len(), 13);
    assert_eq!(h.ctx.monitor.counter(), 2);
    assert!(h.ctx.monitor.counter() <= 5);
}

#[tokio::test]
async fn test_foreign_chat_is_ignored() {
    let h = harness();
    let outcome = h
        .ctx
        .conversation
        .handle(&InboundMessage::group("-999", "42", "@mybot hi"), Instant::now())
        .await;
    assert_eq!(outcome, HandleOutcome::IgnoredForeignChat);
    assert_eq!(h.ctx.monitor.counter(), 0);
    assert!(h.provider.requests().is_empty());
}

#[tokio::test]
async fn test_signature_only_channel_posts_count_as_activity() {
    let h = harness();
    let now = Instant::now();
    let post = InboundMessage::channel_post(CHAT, "news").with_signature("Editor");

    h.ctx.conversation.handle(&post, now).await;
    h.ctx.conversation.handle(&post.clone().edited(), now).await;
    assert_eq!(h.ctx.monitor.counter(), 2);
}

// ============================================================================
// Mentions
// ============================================================================

#[tokio::test]
async fn test_mention_reply_threads_and_skips_ambient_state() {
    let h = harness();
    let msg = chatter("42", "hey @MyBot what's up")
        .with_username("ann")
        .with_message_id(99);

    let outcome = h.ctx.conversation.handle(&msg, Instant::now()).await;
    assert_eq!(outcome, HandleOutcome::MentionReplied { fallback: false });

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to, Some(99));
    assert!(sent[0].content.contains("ann"));
    assert!(sent[0].content.contains("what's up"));
    assert_eq!(h.ctx.monitor.counter(), 0);
    assert!(h.ctx.monitor.last_activity().is_none());
}

#[tokio::test]
async fn test_reply_to_agent_counts_as_mention() {
    let h = harness();
    let msg = chatter("42", "no handle here").replying_to(AGENT_ID);
    assert!(matches!(
        h.ctx.conversation.handle(&msg, Instant::now()).await,
        HandleOutcome::MentionReplied { .. }
    ));
}

#[tokio::test]
async fn test_mention_cooldown_is_per_user() {
    let h = harness();
    let start = Instant::now();
    let from_ann = chatter("1", "@mybot one");
    let from_bob = chatter("2", "@mybot two");

    assert!(matches!(
        h.ctx.conversation.handle(&from_ann, start).await,
        HandleOutcome::MentionReplied { .. }
    ));
    let ten = start + Duration::from_secs(10);
    assert!(matches!(
        h.ctx.conversation.handle(&from_ann, ten).await,
        HandleOutcome::MentionSuppressed { .. }
    ));
    assert!(matches!(
        h.ctx.conversation.handle(&from_bob, ten).await,
        HandleOutcome::MentionReplied { .. }
    ));
    let thirty_one = start + Duration::from_secs(31);
    assert!(matches!(
        h.ctx.conversation.handle(&from_ann, thirty_one).await,
        HandleOutcome::MentionReplied { .. }
    ));
    assert_eq!(h.channel.sent().len(), 3);
}

#[tokio::test]
async fn test_suppressed_mention_does_not_call_backend() {
    let h = harness();
    let start = Instant::now();
    let msg = chatter("1", "@mybot");

    h.ctx.conversation.handle(&msg, start).await;
    let calls = h.provider.requests().len();
    h.ctx
        .conversation
        .handle(&msg, start + Duration::from_secs(5))
        .await;
    assert_eq!(h.provider.requests().len(), calls);
}

// ============================================================================
// Backend failures
// ============================================================================

#[tokio::test]
async fn test_backend_failure_yields_fallback_reply() {
    let h = harness();
    h.provider
        .push(Err(ProviderError::RateLimit("quota".into()).into()));

    let outcome = h
        .ctx
        .conversation
        .handle(&chatter("42", "@mybot hi"), Instant::now())
        .await;
    assert_eq!(outcome, HandleOutcome::MentionReplied { fallback: true });
    assert_eq!(h.channel.sent()[0].content, prompts::MENTION_FALLBACK);
}

#[tokio::test]
async fn test_blank_completion_is_treated_as_failure() {
    let h = harness();
    for _ in 0..4 {
        h.ctx.conversation.handle(&chatter("42", "x"), Instant::now()).await;
    }
    h.provider.push(Ok("   \n".to_string()));

    let outcome = h
        .ctx
        .conversation
        .handle(&chatter("42", "x"), Instant::now())
        .await;
    assert_eq!(outcome, HandleOutcome::Commented { fallback: true });
    assert!(!h.channel.sent()[0].content.trim().is_empty());
}

#[tokio::test]
async fn test_requests_carry_persona_and_sampling() {
    let h = harness();
    h.ctx
        .conversation
        .handle(&chatter("42", "@mybot"), Instant::now())
        .await;

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system_prompt, prompts::SYSTEM_PROMPT);
    assert!((requests[0].temperature - 0.9).abs() < f32::EPSILON);
    assert_eq!(requests[0].max_tokens, 150);
}

// ============================================================================
// Schedule
// ============================================================================

#[tokio::test]
async fn test_scheduled_post_skipped_while_chat_active() {
    let h = harness();
    let now = Instant::now();
    h.ctx.conversation.handle(&chatter("42", "busy"), now).await;

    let outcome = h.ctx.schedule.fire(now + Duration::from_secs(600)).await;
    assert_eq!(outcome, FireOutcome::SkippedActive);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_scheduled_post_sent_when_quiet() {
    let h = harness();
    let outcome = h.ctx.schedule.fire(Instant::now()).await;
    assert!(matches!(outcome, FireOutcome::Posted { .. }));

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, CHAT);
    assert!(sent[0].reply_to.is_none());
}

#[tokio::test]
async fn test_scheduled_quote_falls_back_to_canned_pool() {
    let mut config = test_config();
    config.persona.canned_quotes = vec!["Only one quote.".to_string()];
    let h = harness_with(config);
    h.provider
        .push(Err(ProviderError::ServerError("502".into()).into()));

    let quote = h.ctx.generator.generate_quote().await;
    assert!(quote.fallback);
    assert_eq!(quote.text, "Only one quote.");
}

// ============================================================================
// Event loop
// ============================================================================

#[tokio::test]
async fn test_inbound_loop_drives_controller() {
    let h = harness();
    let inbound = Arc::new(h.ctx.inbound_loop());
    let runner = Arc::clone(&inbound);
    let task = tokio::spawn(async move { runner.run().await });

    for i in 0..5 {
        h.ctx
            .bus
            .publish_inbound(chatter("42", &format!("msg {i}")))
            .await
            .unwrap();
    }

    for _ in 0..100 {
        if !h.channel.sent().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.channel.sent().len(), 1);

    inbound.stop();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop should stop")
        .unwrap()
        .unwrap();
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_roundtrip_and_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "telegram": {"token": "123:abc"},
            "provider": {"api_key": "sk-test", "model": "gpt-4o-mini"},
            "monitor": {"chat_id": "-1001", "threshold_min": 3, "threshold_max": 6},
            "schedule": {"posts": [{"hour": 9, "minute": 30}]}
        }"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.monitor.threshold_min, 3);
    assert_eq!(config.monitor.recent_context_size, 3);
    assert_eq!(config.schedule.posts.len(), 1);
    assert_eq!(config.schedule.max_offset_minutes, 30);
}

#[test]
fn test_invalid_thresholds_fail_validation() {
    let mut config = test_config();
    config.telegram.token = "123:abc".into();
    config.provider.api_key = Some("sk-test".into());
    config.monitor.threshold_min = 10;
    config.monitor.threshold_max = 5;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("threshold"));
}
