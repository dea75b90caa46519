//! Telegram Channel Implementation
//!
//! Receives updates from the Telegram Bot API via teloxide, normalizes them
//! into [`InboundMessage`] values and publishes them to the message bus.
//! Outbound messages are sent with `sendMessage`, as replies when requested.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────┐
//! │   Telegram API   │ <────── │  TelegramChannel │
//! │   (Bot Father)   │ ──────> │   (teloxide)     │
//! └──────────────────┘         └────────┬─────────┘
//!                                       │
//!                                       │ InboundMessage
//!                                       ▼
//!                              ┌──────────────────┐
//!                              │    MessageBus    │
//!                              └──────────────────┘
//! ```
//!
//! Four update kinds are accepted: group messages, channel posts and the
//! edited variants of both. Edits collapse onto their base kind with
//! `is_edited` set. Private chats are dropped here and never reach the bus.

use async_trait::async_trait;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use teloxide::types::{Message, MessageEntityKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bus::{InboundMessage, MentionSpan, MessageBus, MessageKind, OutboundMessage, Sender};
use crate::config::TelegramConfig;
use crate::error::{BanterError, Result};
use crate::utils::string::log_preview;

use super::{AgentIdentity, Channel};

/// Maximum number of startup connectivity retries before giving up.
const MAX_STARTUP_RETRIES: u32 = 10;
/// Base delay (in seconds) for exponential backoff on startup retries.
const BASE_RETRY_DELAY_SECS: u64 = 2;
/// Maximum delay (in seconds) for exponential backoff on startup retries.
const MAX_RETRY_DELAY_SECS: u64 = 120;

type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Telegram channel implementation using teloxide.
///
/// The channel is shared as `Arc<dyn Channel>`, so its mutable parts (the
/// cached bot, the resolved identity, the shutdown sender) sit behind
/// short-lived mutexes that are never held across an `.await`.
pub struct TelegramChannel {
    config: TelegramConfig,
    /// Reference to the message bus for publishing inbound messages
    bus: Arc<MessageBus>,
    /// Shared with the spawned polling task so state stays in sync
    running: Arc<AtomicBool>,
    /// Sender to signal shutdown to the polling task
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    /// Cached bot instance for sending messages (avoids rebuilding HTTP client)
    bot: Mutex<Option<teloxide::Bot>>,
    /// Result of the startup `getMe` call
    identity: Mutex<Option<AgentIdentity>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel with the given configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use banterbot::bus::MessageBus;
    /// use banterbot::config::TelegramConfig;
    /// use banterbot::channels::{Channel, TelegramChannel};
    ///
    /// let config = TelegramConfig { token: "BOT_TOKEN".to_string() };
    /// let channel = TelegramChannel::new(config, Arc::new(MessageBus::new()));
    ///
    /// assert_eq!(channel.name(), "telegram");
    /// assert!(!channel.is_running());
    /// ```
    pub fn new(config: TelegramConfig, bus: Arc<MessageBus>) -> Self {
        Self {
            config,
            bus,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Mutex::new(None),
            bot: Mutex::new(None),
            identity: Mutex::new(None),
        }
    }

    /// Calculates the exponential backoff delay for a startup retry attempt.
    fn startup_backoff_delay(attempt: u32) -> Duration {
        let delay_secs = BASE_RETRY_DELAY_SECS
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY_SECS);
        Duration::from_secs(delay_secs)
    }

    /// Build a Telegram bot client with explicit proxy behavior.
    ///
    /// Automatic system proxy detection is disabled; it crashes in some
    /// sandboxed environments.
    fn build_bot(token: &str) -> Result<teloxide::Bot> {
        let client = teloxide::net::default_reqwest_settings()
            .no_proxy()
            .build()
            .map_err(|e| {
                BanterError::Channel(format!("Failed to build Telegram HTTP client: {}", e))
            })?;
        Ok(teloxide::Bot::with_client(token.to_string(), client))
    }

    /// Resolve the bot's own identity with `getMe`.
    ///
    /// Transient failures (network, I/O, flood control) are retried with
    /// exponential backoff; anything else fails on the first attempt.
    async fn fetch_identity(bot: &teloxide::Bot) -> Result<AgentIdentity> {
        use teloxide::prelude::*;
        use teloxide::RequestError;

        let mut attempt: u32 = 0;
        loop {
            match bot.get_me().await {
                Ok(me) => {
                    return Ok(AgentIdentity {
                        id: me.user.id.0.to_string(),
                        handle: me.user.username.clone(),
                    });
                }
                Err(e) => {
                    let is_transient = matches!(
                        &e,
                        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
                    );

                    if !is_transient || attempt >= MAX_STARTUP_RETRIES {
                        return Err(BanterError::Channel(format!(
                            "Telegram startup check failed after {} attempt(s): {}",
                            attempt + 1,
                            e
                        )));
                    }

                    let delay = Self::startup_backoff_delay(attempt);
                    warn!(
                        "Telegram startup check failed (attempt {}/{}), retrying in {}s: {}",
                        attempt + 1,
                        MAX_STARTUP_RETRIES,
                        delay.as_secs(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn cached_bot(&self) -> Option<teloxide::Bot> {
        self.bot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reset_state(&self) {
        self.running.store(false, Ordering::SeqCst);
        *self.bot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Normalize a Telegram message into an [`InboundMessage`].
///
/// Returns `None` for chats the agent never acts in (private chats).
/// Captions stand in for text on media messages; mention spans are the
/// byte ranges of `@username` entities within that text.
pub(crate) fn normalize_message(msg: &Message, edited: bool) -> Option<InboundMessage> {
    let kind = if msg.chat.is_channel() {
        MessageKind::ChannelPost
    } else if msg.chat.is_group() || msg.chat.is_supergroup() {
        MessageKind::GroupMessage
    } else {
        return None;
    };

    let (text, entities) = match msg.text() {
        Some(text) => (Some(text.to_string()), msg.parse_entities()),
        None => (
            msg.caption().map(str::to_string),
            msg.parse_caption_entities(),
        ),
    };

    let mention_spans = entities
        .unwrap_or_default()
        .iter()
        .filter(|entity| matches!(entity.kind(), MessageEntityKind::Mention))
        .map(|entity| {
            let range = entity.range();
            MentionSpan {
                start: range.start,
                end: range.end,
            }
        })
        .collect();

    let sender = msg.from.as_ref().map(|user| Sender {
        id: user.id.0.to_string(),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
    });

    let reply_to_sender_id = msg
        .reply_to_message()
        .and_then(|original| original.from.as_ref())
        .map(|user| user.id.0.to_string());

    Some(InboundMessage {
        kind,
        message_id: Some(msg.id.0),
        chat_id: msg.chat.id.0.to_string(),
        sender,
        author_signature: msg.author_signature().map(str::to_string),
        text,
        is_edited: edited,
        reply_to_sender_id,
        mention_spans,
    })
}

/// Normalize and publish one update. Publishing failures are logged, never
/// returned, so a closed bus cannot stop the dispatcher.
async fn forward(msg: Message, bus: Arc<MessageBus>, edited: bool) -> HandlerResult {
    let Some(inbound) = normalize_message(&msg, edited) else {
        debug!(chat_id = msg.chat.id.0, "Telegram: ignoring update from private chat");
        return Ok(());
    };

    info!(
        "Telegram: Received {:?}{} in chat {}: {}",
        inbound.kind,
        if edited { " (edited)" } else { "" },
        inbound.chat_id,
        log_preview(inbound.text().unwrap_or(""))
    );

    if let Err(e) = bus.publish_inbound(inbound).await {
        error!("Failed to publish inbound message to bus: {}", e);
    }
    Ok(())
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    /// Starts the Telegram channel.
    ///
    /// This method:
    /// 1. Builds a teloxide Bot with the configured token
    /// 2. Resolves the bot identity with `getMe` (retrying transient failures)
    /// 3. Spawns the update dispatcher that publishes to the message bus
    ///
    /// Returns once the dispatcher is spawned; identity is available from then on.
    async fn start(&self) -> Result<()> {
        // Prevent double-start
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Telegram channel already running");
            return Ok(());
        }

        if self.config.token.is_empty() {
            error!("Telegram bot token is empty");
            self.running.store(false, Ordering::SeqCst);
            return Err(BanterError::Config("Telegram bot token is empty".into()));
        }

        info!("Starting Telegram channel");

        let bot = match Self::build_bot(&self.config.token) {
            Ok(bot) => bot,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let identity = match Self::fetch_identity(&bot).await {
            Ok(identity) => identity,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        info!(
            "Telegram: connected as {} (@{})",
            identity.id,
            identity.handle().unwrap_or("-")
        );

        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity);
        *self.bot.lock().unwrap_or_else(PoisonError::into_inner) = Some(bot.clone());

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(shutdown_tx);

        let bus = Arc::clone(&self.bus);
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            use teloxide::prelude::*;

            let task_result = std::panic::AssertUnwindSafe(async move {
                let handler = dptree::entry()
                    .branch(Update::filter_message().endpoint(
                        |msg: Message, bus: Arc<MessageBus>| async move {
                            forward(msg, bus, false).await
                        },
                    ))
                    .branch(Update::filter_edited_message().endpoint(
                        |msg: Message, bus: Arc<MessageBus>| async move {
                            forward(msg, bus, true).await
                        },
                    ))
                    .branch(Update::filter_channel_post().endpoint(
                        |msg: Message, bus: Arc<MessageBus>| async move {
                            forward(msg, bus, false).await
                        },
                    ))
                    .branch(Update::filter_edited_channel_post().endpoint(
                        |msg: Message, bus: Arc<MessageBus>| async move {
                            forward(msg, bus, true).await
                        },
                    ));

                let mut dispatcher = Dispatcher::builder(bot, handler)
                    .dependencies(dptree::deps![bus])
                    .build();

                info!("Telegram bot dispatcher started, waiting for messages...");

                tokio::select! {
                    _ = dispatcher.dispatch() => {
                        info!("Telegram dispatcher completed");
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Telegram channel shutdown signal received");
                    }
                }
            })
            .catch_unwind()
            .await;

            if task_result.is_err() {
                error!("Telegram polling task panicked");
            }

            running.store(false, Ordering::SeqCst);
            info!("Telegram polling task stopped");
        });

        Ok(())
    }

    /// Stops the Telegram polling loop and drops the cached bot.
    async fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            info!("Telegram channel already stopped");
            return Ok(());
        }

        info!("Stopping Telegram channel");

        let shutdown_tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = shutdown_tx {
            if tx.send(()).await.is_err() {
                warn!("Telegram shutdown channel already closed");
            }
        }

        self.reset_state();
        info!("Telegram channel stopped");
        Ok(())
    }

    async fn identity(&self) -> Result<AgentIdentity> {
        self.identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| BanterError::Channel("Telegram identity not resolved yet".to_string()))
    }

    /// Sends an outbound message to a Telegram chat.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The channel is not running
    /// - The chat_id cannot be parsed as an integer
    /// - The Telegram API request fails
    async fn send(&self, msg: OutboundMessage) -> Result<()> {
        use teloxide::prelude::*;
        use teloxide::types::{ChatId, MessageId, ReplyParameters};

        if !self.running.load(Ordering::SeqCst) {
            warn!("Telegram channel not running, cannot send message");
            return Err(BanterError::Channel(
                "Telegram channel not running".to_string(),
            ));
        }

        let chat_id: i64 = msg.chat_id.parse().map_err(|_| {
            BanterError::Channel(format!("Invalid Telegram chat ID: {}", msg.chat_id))
        })?;

        let bot = self
            .cached_bot()
            .ok_or_else(|| BanterError::Channel("Telegram bot not initialized".to_string()))?;

        debug!(
            "Telegram: Sending message to chat {} (reply_to: {:?})",
            chat_id, msg.reply_to
        );

        let mut request = bot.send_message(ChatId(chat_id), msg.content);
        if let Some(reply_to) = msg.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
        }
        request
            .await
            .map_err(|e| BanterError::Channel(format!("Failed to send Telegram message: {}", e)))?;

        info!("Telegram: Message sent successfully to chat {}", chat_id);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel(token: &str) -> TelegramChannel {
        let config = TelegramConfig {
            token: token.to_string(),
        };
        TelegramChannel::new(config, Arc::new(MessageBus::new()))
    }

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).expect("valid Telegram message fixture")
    }

    fn supergroup() -> serde_json::Value {
        json!({"id": -1001234567890i64, "type": "supergroup", "title": "Banter"})
    }

    #[test]
    fn test_telegram_channel_creation() {
        let channel = channel("test-token");
        assert_eq!(channel.name(), "telegram");
        assert!(!channel.is_running());
    }

    #[tokio::test]
    async fn test_telegram_start_without_token() {
        let channel = channel("");
        let result = channel.start().await;
        assert!(matches!(result, Err(BanterError::Config(_))));
        assert!(!channel.is_running());
    }

    #[tokio::test]
    async fn test_telegram_stop_not_running() {
        let channel = channel("test-token");
        assert!(channel.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_telegram_send_not_running() {
        let channel = channel("test-token");
        let result = channel.send(OutboundMessage::new("12345", "Hello")).await;
        assert!(matches!(result, Err(BanterError::Channel(_))));
    }

    #[tokio::test]
    async fn test_telegram_identity_before_start() {
        let channel = channel("test-token");
        assert!(channel.identity().await.is_err());
    }

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_normalize_group_message() {
        let msg = message(json!({
            "message_id": 17,
            "date": 1700000000,
            "chat": supergroup(),
            "from": {"id": 42, "is_bot": false, "first_name": "Ann", "username": "ann"},
            "text": "hello there"
        }));

        let inbound = normalize_message(&msg, false).unwrap();
        assert_eq!(inbound.kind, MessageKind::GroupMessage);
        assert_eq!(inbound.message_id, Some(17));
        assert_eq!(inbound.chat_id, "-1001234567890");
        assert_eq!(inbound.sender_id(), Some("42"));
        let sender = inbound.sender.as_ref().unwrap();
        assert_eq!(sender.username.as_deref(), Some("ann"));
        assert_eq!(sender.first_name.as_deref(), Some("Ann"));
        assert_eq!(inbound.text(), Some("hello there"));
        assert!(!inbound.is_edited);
        assert!(inbound.mention_spans.is_empty());
        assert!(inbound.reply_to_sender_id.is_none());
    }

    #[test]
    fn test_normalize_mention_entity_spans() {
        let msg = message(json!({
            "message_id": 18,
            "date": 1700000000,
            "chat": supergroup(),
            "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
            "text": "hey @mybot what's up",
            "entities": [{"type": "mention", "offset": 4, "length": 6}]
        }));

        let inbound = normalize_message(&msg, false).unwrap();
        assert_eq!(inbound.mention_spans, vec![MentionSpan { start: 4, end: 10 }]);
        let text = inbound.text().unwrap();
        assert_eq!(text.get(4..10), Some("@mybot"));
    }

    #[test]
    fn test_normalize_mention_span_after_multibyte_text() {
        // Telegram offsets count UTF-16 units; spans must be byte ranges
        let msg = message(json!({
            "message_id": 19,
            "date": 1700000000,
            "chat": supergroup(),
            "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
            "text": "привет @mybot",
            "entities": [{"type": "mention", "offset": 7, "length": 6}]
        }));

        let inbound = normalize_message(&msg, false).unwrap();
        let span = inbound.mention_spans[0];
        assert_eq!(&inbound.text().unwrap()[span.start..span.end], "@mybot");
    }

    #[test]
    fn test_normalize_reply_to_sender() {
        let msg = message(json!({
            "message_id": 20,
            "date": 1700000000,
            "chat": supergroup(),
            "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
            "text": "no you",
            "reply_to_message": {
                "message_id": 5,
                "date": 1699999990,
                "chat": supergroup(),
                "from": {"id": 7, "is_bot": true, "first_name": "Bot", "username": "mybot"},
                "text": "earlier remark"
            }
        }));

        let inbound = normalize_message(&msg, false).unwrap();
        assert_eq!(inbound.reply_to_sender_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_normalize_channel_post_with_signature() {
        let msg = message(json!({
            "message_id": 3,
            "date": 1700000000,
            "chat": {"id": -1009876543210i64, "type": "channel", "title": "News"},
            "author_signature": "Editor",
            "text": "breaking"
        }));

        let inbound = normalize_message(&msg, true).unwrap();
        assert_eq!(inbound.kind, MessageKind::ChannelPost);
        assert!(inbound.is_edited);
        assert!(inbound.sender.is_none());
        assert_eq!(inbound.author_signature.as_deref(), Some("Editor"));
    }

    #[test]
    fn test_normalize_ignores_private_chat() {
        let msg = message(json!({
            "message_id": 1,
            "date": 1700000000,
            "chat": {"id": 42, "type": "private", "first_name": "Ann"},
            "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
            "text": "hi bot"
        }));

        assert!(normalize_message(&msg, false).is_none());
    }

    // -----------------------------------------------------------------------
    // Startup retry backoff
    // -----------------------------------------------------------------------

    #[test]
    fn test_startup_backoff_delay_increases() {
        assert_eq!(TelegramChannel::startup_backoff_delay(0), Duration::from_secs(2));
        assert_eq!(TelegramChannel::startup_backoff_delay(1), Duration::from_secs(4));
        assert_eq!(TelegramChannel::startup_backoff_delay(2), Duration::from_secs(8));
    }

    #[test]
    fn test_startup_backoff_delay_caps_at_max() {
        let d_high = TelegramChannel::startup_backoff_delay(20);
        assert_eq!(d_high, Duration::from_secs(MAX_RETRY_DELAY_SECS));
        let d_max = TelegramChannel::startup_backoff_delay(u32::MAX);
        assert_eq!(d_max, Duration::from_secs(MAX_RETRY_DELAY_SECS));
    }
}
