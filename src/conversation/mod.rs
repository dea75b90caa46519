//! Conversation controller.
//!
//! Every inbound message from the monitored chat goes through
//! [`ConversationController::handle`]. A message that addresses the agent
//! takes the mention path and never counts as ambient chatter. Everything
//! else feeds the activity monitor and the recent-message buffer, and may
//! trigger a one-shot comment once enough fresh messages have piled up.
//!
//! Controller state (buffer and cooldown table) sits behind one mutex that is
//! released before any backend or transport call and re-acquired to commit.
//! Commits happen only after a successful send: a failed send leaves the
//! counter, buffer and cooldowns as they were.
//!
//! ```
//! use banterbot::bus::{InboundMessage, MessageBus};
//! use banterbot::conversation::{resolve_sender_id, RecentMessageBuffer};
//!
//! # tokio_test::block_on(async {
//! let bus = MessageBus::new();
//! let post = InboundMessage::channel_post("-100", "news").with_signature("Editor");
//! bus.publish_inbound(post).await.unwrap();
//!
//! let received = bus.consume_inbound().await.unwrap();
//! assert!(resolve_sender_id(&received).starts_with("sig:"));
//!
//! let mut buffer = RecentMessageBuffer::new(2);
//! for text in ["a", "b", "c"] {
//!     buffer.push(text);
//! }
//! assert_eq!(buffer.joined().as_deref(), Some("b\nc"));
//! # })
//! ```

mod buffer;
mod cooldown;

pub use buffer::RecentMessageBuffer;
pub use cooldown::MentionCooldownTable;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::bus::{InboundMessage, OutboundMessage};
use crate::channels::{AgentIdentity, Channel};
use crate::config::Config;
use crate::content::{ContentGenerator, ContentKind};
use crate::mention::is_mentioned;
use crate::monitor::ActivityMonitor;
use crate::utils::string::log_preview;

/// Length of the hex digest prefix used for signature-derived identities.
const SIGNATURE_ID_HEX_LEN: usize = 16;

/// Knobs of the reactive response policy.
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    /// Only messages from this chat are considered
    pub chat_id: String,
    pub activity_timeout: Duration,
    /// Inclusive message-count window in which a comment is posted
    pub threshold_min: u32,
    pub threshold_max: u32,
    pub mention_cooldown: Duration,
    pub mention_reply_delay: Duration,
    pub recent_context_size: usize,
    /// Comment context when the buffer is empty
    pub empty_context_placeholder: String,
    /// Display name when a sender has neither handle nor first name
    pub unknown_user_name: String,
}

impl ConversationSettings {
    pub fn from_config(config: &Config) -> Self {
        let monitor = &config.monitor;
        Self {
            chat_id: monitor.chat_id.clone(),
            activity_timeout: Duration::from_secs(monitor.activity_timeout_secs),
            threshold_min: monitor.threshold_min,
            threshold_max: monitor.threshold_max,
            mention_cooldown: Duration::from_secs(monitor.mention_cooldown_secs),
            mention_reply_delay: Duration::from_millis(monitor.mention_reply_delay_ms),
            recent_context_size: monitor.recent_context_size,
            empty_context_placeholder: config.persona.empty_context_placeholder.clone(),
            unknown_user_name: config.persona.unknown_user_name.clone(),
        }
    }
}

/// What `handle` did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The message came from a chat other than the monitored one
    IgnoredForeignChat,
    /// Activity recorded (or skipped for the agent's own message); no reply
    Tracked { counter: u32 },
    /// A comment was posted and the ambient state reset
    Commented { fallback: bool },
    /// A mention reply was posted and the cooldown recorded
    MentionReplied { fallback: bool },
    /// A mention was dropped because the sender is in cooldown
    MentionSuppressed { remaining: Duration },
    /// Text was generated but could not be delivered; nothing was committed
    SendFailed { kind: ContentKind },
}

struct ConversationState {
    buffer: RecentMessageBuffer,
    cooldowns: MentionCooldownTable,
}

/// Decides, per inbound message, whether and how the agent speaks.
pub struct ConversationController {
    settings: ConversationSettings,
    identity: AgentIdentity,
    monitor: Arc<ActivityMonitor>,
    generator: Arc<ContentGenerator>,
    channel: Arc<dyn Channel>,
    state: Mutex<ConversationState>,
}

impl ConversationController {
    pub fn new(
        settings: ConversationSettings,
        identity: AgentIdentity,
        monitor: Arc<ActivityMonitor>,
        generator: Arc<ContentGenerator>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        let state = ConversationState {
            buffer: RecentMessageBuffer::new(settings.recent_context_size),
            cooldowns: MentionCooldownTable::new(settings.mention_cooldown),
        };
        Self {
            settings,
            identity,
            monitor,
            generator,
            channel,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one inbound message received at `now`.
    pub async fn handle(&self, msg: &InboundMessage, now: Instant) -> HandleOutcome {
        if msg.chat_id != self.settings.chat_id {
            crate::log_component!(
                debug,
                "conversation",
                "ignoring message from foreign chat",
                chat_id = msg.chat_id.as_str()
            );
            return HandleOutcome::IgnoredForeignChat;
        }

        let sender_id = resolve_sender_id(msg);

        if is_mentioned(msg, &self.identity) {
            return self.handle_mention(msg, &sender_id, now).await;
        }

        self.track(msg, &sender_id, now).await
    }

    async fn track(&self, msg: &InboundMessage, sender_id: &str, now: Instant) -> HandleOutcome {
        let counted = self.monitor.record_activity(sender_id, now);
        if counted {
            if let Some(text) = msg.text() {
                self.lock().buffer.push(text);
            }
        }

        let counter = self.monitor.counter();
        crate::log_component!(
            debug,
            "conversation",
            "activity recorded",
            sender = sender_id,
            counted = counted,
            counter = counter,
            edited = msg.is_edited
        );

        let settings = &self.settings;
        if !self.monitor.should_respond(
            now,
            settings.activity_timeout,
            settings.threshold_min,
            settings.threshold_max,
        ) {
            return HandleOutcome::Tracked { counter };
        }

        crate::log_component!(
            info,
            "conversation",
            "comment threshold reached",
            counter = counter
        );

        // Snapshot the context, release the lock, then generate
        let context = self
            .lock()
            .buffer
            .joined()
            .unwrap_or_else(|| settings.empty_context_placeholder.clone());

        let comment = self.generator.generate_comment(&context).await;
        let outbound = OutboundMessage::new(&settings.chat_id, &comment.text);

        let sent = self.channel.send(outbound).await;

        // One-shot: a triggered comment is consumed even when delivery fails
        self.monitor.reset_counter();
        self.lock().buffer.clear();

        match sent {
            Ok(()) => {
                crate::log_component!(
                    info,
                    "conversation",
                    "comment posted",
                    fallback = comment.fallback,
                    preview = log_preview(&comment.text).as_str()
                );
                HandleOutcome::Commented {
                    fallback: comment.fallback,
                }
            }
            Err(e) => {
                crate::log_component!(
                    error,
                    "conversation",
                    "failed to send comment, dropping it",
                    error = tracing::field::display(&e)
                );
                HandleOutcome::SendFailed {
                    kind: ContentKind::Comment,
                }
            }
        }
    }

    async fn handle_mention(
        &self,
        msg: &InboundMessage,
        sender_id: &str,
        now: Instant,
    ) -> HandleOutcome {
        let display_name = self.display_name(msg);

        let remaining = self.lock().cooldowns.remaining(sender_id, now);
        if let Some(remaining) = remaining {
            crate::log_component!(
                info,
                "conversation",
                "mention suppressed by cooldown",
                sender = sender_id,
                remaining_secs = remaining.as_secs()
            );
            return HandleOutcome::MentionSuppressed { remaining };
        }

        crate::log_component!(
            info,
            "conversation",
            "mention received",
            sender = sender_id,
            name = display_name.as_str()
        );

        let text = msg.text().unwrap_or_default();
        let reply = self
            .generator
            .generate_mention_reply(text, &display_name)
            .await;

        if !self.settings.mention_reply_delay.is_zero() {
            tokio::time::sleep(self.settings.mention_reply_delay).await;
        }

        match self
            .channel
            .send(OutboundMessage::reply_to(msg, &reply.text))
            .await
        {
            Ok(()) => {
                self.lock().cooldowns.mark_replied(sender_id, now);
                crate::log_component!(
                    info,
                    "conversation",
                    "mention reply posted",
                    sender = sender_id,
                    fallback = reply.fallback
                );
                HandleOutcome::MentionReplied {
                    fallback: reply.fallback,
                }
            }
            Err(e) => {
                crate::log_component!(
                    error,
                    "conversation",
                    "failed to send mention reply",
                    sender = sender_id,
                    error = tracing::field::display(&e)
                );
                HandleOutcome::SendFailed {
                    kind: ContentKind::MentionReply,
                }
            }
        }
    }

    /// Handle, else first name, else the configured placeholder.
    fn display_name(&self, msg: &InboundMessage) -> String {
        let sender = msg.sender.as_ref();
        sender
            .and_then(|s| s.username.as_deref())
            .filter(|name| !name.is_empty())
            .or_else(|| {
                sender
                    .and_then(|s| s.first_name.as_deref())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or(&self.settings.unknown_user_name)
            .to_string()
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Number of texts currently held as comment context.
    pub fn buffered_messages(&self) -> usize {
        self.lock().buffer.len()
    }
}

/// Stable identity of a message's author.
///
/// The explicit sender id wins. Signature-only channel posts get
/// `sig:<hex prefix of sha256(signature)>`. Anything else falls back to the
/// chat id.
pub fn resolve_sender_id(msg: &InboundMessage) -> String {
    if let Some(id) = msg.sender_id() {
        return id.to_string();
    }
    if let Some(signature) = msg.author_signature.as_deref().filter(|s| !s.is_empty()) {
        let digest = hex::encode(Sha256::digest(signature.as_bytes()));
        return format!("sig:{}", &digest[..SIGNATURE_ID_HEX_LEN]);
    }
    msg.chat_id.clone()
}
