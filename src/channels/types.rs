//! Channel trait and types for Banterbot
//!
//! This module defines the `Channel` trait that the transport adapter
//! implements, along with the agent identity it reports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bus::OutboundMessage;
use crate::error::Result;

/// The agent's own identity on the transport.
///
/// `id` is compared against message senders so the agent never counts or
/// answers itself. `handle` is the public `@name` used for mention matching;
/// it may be absent, in which case only reply-to mentions are recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub id: String,
    pub handle: Option<String>,
}

impl AgentIdentity {
    pub fn new(id: &str, handle: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            handle: handle.map(str::to_string),
        }
    }

    /// The handle, if configured and non-empty.
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref().filter(|h| !h.is_empty())
    }
}

/// The `Channel` trait is the transport boundary.
///
/// Channels are responsible for:
/// - Receiving platform updates, normalizing them and publishing them to the message bus
/// - Sending outbound messages (optionally as replies) to the monitored chat
/// - Reporting the agent's own identity
/// - Managing their connection lifecycle (start/stop)
///
/// All methods take `&self` so a single channel can be shared as
/// `Arc<dyn Channel>` between the conversation and schedule controllers.
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
/// use banterbot::channels::{AgentIdentity, Channel};
/// use banterbot::bus::OutboundMessage;
/// use banterbot::error::Result;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct StdoutChannel {
///     running: AtomicBool,
/// }
///
/// #[async_trait]
/// impl Channel for StdoutChannel {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     async fn start(&self) -> Result<()> {
///         self.running.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<()> {
///         self.running.store(false, Ordering::SeqCst);
///         Ok(())
///     }
///
///     async fn identity(&self) -> Result<AgentIdentity> {
///         Ok(AgentIdentity::new("0", Some("stdoutbot")))
///     }
///
///     async fn send(&self, msg: OutboundMessage) -> Result<()> {
///         println!("{}", msg.content);
///         Ok(())
///     }
///
///     fn is_running(&self) -> bool {
///         self.running.load(Ordering::SeqCst)
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Channel: Send + Sync {
    /// Returns the unique name of this channel (e.g., "telegram").
    fn name(&self) -> &str;

    /// Starts the channel, establishing connections and beginning to listen
    /// for incoming messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails to start (e.g., invalid token,
    /// network failure, etc.).
    async fn start(&self) -> Result<()>;

    /// Stops the channel. Inbound publishing ends; sends fail afterwards.
    async fn stop(&self) -> Result<()>;

    /// Returns the agent's own identity (id and handle).
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is not known yet (channel not
    /// started) or cannot be fetched.
    async fn identity(&self) -> Result<AgentIdentity>;

    /// Sends an outbound message through this channel.
    ///
    /// When `msg.reply_to` is set the message is posted as a reply to that
    /// message id.
    ///
    /// # Errors
    ///
    /// Returns an error if the message fails to send (e.g., network failure,
    /// invalid chat ID, rate limiting, etc.).
    async fn send(&self, msg: OutboundMessage) -> Result<()>;

    /// Returns whether the channel is currently running and accepting messages.
    fn is_running(&self) -> bool;
}
