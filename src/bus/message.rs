//! Message types for the Banterbot message bus
//!
//! Transport adapters normalize whatever their platform delivers (group
//! messages, channel posts, and edited variants of both) into a single
//! [`InboundMessage`] before it reaches the controllers. Controllers answer
//! with [`OutboundMessage`] values handed back to the transport.

use serde::{Deserialize, Serialize};

/// Base kind of an inbound message. Edited variants collapse onto their base
/// kind with [`InboundMessage::is_edited`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A message posted by a member of a group or supergroup
    GroupMessage,
    /// A post in a broadcast channel (usually without a sender user)
    ChannelPost,
}

/// The user who wrote a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform user id
    pub id: String,
    /// Public handle without the leading `@`
    pub username: Option<String>,
    pub first_name: Option<String>,
}

/// Byte range of a declared `@mention` inside the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionSpan {
    pub start: usize,
    pub end: usize,
}

/// A normalized incoming chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub kind: MessageKind,
    /// Platform message id, used to reply to this exact message
    pub message_id: Option<i32>,
    /// Chat the message was posted in
    pub chat_id: String,
    /// Author, if the platform exposes one
    pub sender: Option<Sender>,
    /// Author signature of anonymous channel posts
    pub author_signature: Option<String>,
    /// Text or caption; `None` for stickers, photos without caption, etc.
    pub text: Option<String>,
    pub is_edited: bool,
    /// Sender id of the message this one replies to
    pub reply_to_sender_id: Option<String>,
    /// Declared mention entities
    pub mention_spans: Vec<MentionSpan>,
}

impl InboundMessage {
    /// Creates a group message from a known sender.
    ///
    /// # Example
    /// ```
    /// use banterbot::bus::InboundMessage;
    ///
    /// let msg = InboundMessage::group("-100123", "42", "hello there");
    /// assert_eq!(msg.sender_id(), Some("42"));
    /// assert!(!msg.is_edited);
    /// ```
    pub fn group(chat_id: &str, sender_id: &str, text: &str) -> Self {
        Self {
            kind: MessageKind::GroupMessage,
            message_id: None,
            chat_id: chat_id.to_string(),
            sender: Some(Sender {
                id: sender_id.to_string(),
                username: None,
                first_name: None,
            }),
            author_signature: None,
            text: Some(text.to_string()),
            is_edited: false,
            reply_to_sender_id: None,
            mention_spans: Vec::new(),
        }
    }

    /// Creates a channel post without a sender user.
    pub fn channel_post(chat_id: &str, text: &str) -> Self {
        Self {
            kind: MessageKind::ChannelPost,
            message_id: None,
            chat_id: chat_id.to_string(),
            sender: None,
            author_signature: None,
            text: Some(text.to_string()),
            is_edited: false,
            reply_to_sender_id: None,
            mention_spans: Vec::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: i32) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// Sets the sender's public handle (builder pattern).
    pub fn with_username(mut self, username: &str) -> Self {
        if let Some(sender) = self.sender.as_mut() {
            sender.username = Some(username.to_string());
        }
        self
    }

    pub fn with_first_name(mut self, first_name: &str) -> Self {
        if let Some(sender) = self.sender.as_mut() {
            sender.first_name = Some(first_name.to_string());
        }
        self
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.author_signature = Some(signature.to_string());
        self
    }

    pub fn replying_to(mut self, sender_id: &str) -> Self {
        self.reply_to_sender_id = Some(sender_id.to_string());
        self
    }

    pub fn with_mention_span(mut self, start: usize, end: usize) -> Self {
        self.mention_spans.push(MentionSpan { start, end });
        self
    }

    pub fn without_text(mut self) -> Self {
        self.text = None;
        self
    }

    pub fn edited(mut self) -> Self {
        self.is_edited = true;
        self
    }

    /// Explicit sender id, if the platform exposed one.
    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().map(|s| s.id.as_str())
    }

    /// Non-empty text of the message.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Represents an outgoing message to be sent via the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The chat to send to
    pub chat_id: String,
    /// The text content to send
    pub content: String,
    /// Optional message ID to reply to
    pub reply_to: Option<i32>,
}

impl OutboundMessage {
    /// Creates a new outbound message.
    ///
    /// # Example
    /// ```
    /// use banterbot::bus::OutboundMessage;
    ///
    /// let msg = OutboundMessage::new("-100123", "Good morning");
    /// assert!(msg.reply_to.is_none());
    /// ```
    pub fn new(chat_id: &str, content: &str) -> Self {
        Self {
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            reply_to: None,
        }
    }

    /// Creates a reply to a specific inbound message in the same chat.
    ///
    /// # Example
    /// ```
    /// use banterbot::bus::{InboundMessage, OutboundMessage};
    ///
    /// let inbound = InboundMessage::group("-100123", "42", "hey").with_message_id(7);
    /// let reply = OutboundMessage::reply_to(&inbound, "what?");
    /// assert_eq!(reply.chat_id, "-100123");
    /// assert_eq!(reply.reply_to, Some(7));
    /// ```
    pub fn reply_to(msg: &InboundMessage, content: &str) -> Self {
        Self {
            chat_id: msg.chat_id.clone(),
            content: content.to_string(),
            reply_to: msg.message_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_message_builders() {
        let msg = InboundMessage::group("-1", "42", "hi")
            .with_username("ann")
            .with_first_name("Ann")
            .with_message_id(3)
            .replying_to("7")
            .edited();
        let sender = msg.sender.as_ref().unwrap();
        assert_eq!(sender.username.as_deref(), Some("ann"));
        assert_eq!(sender.first_name.as_deref(), Some("Ann"));
        assert_eq!(msg.message_id, Some(3));
        assert_eq!(msg.reply_to_sender_id.as_deref(), Some("7"));
        assert!(msg.is_edited);
        assert_eq!(msg.kind, MessageKind::GroupMessage);
    }

    #[test]
    fn test_channel_post_has_no_sender() {
        let msg = InboundMessage::channel_post("-100", "news").with_signature("Editor");
        assert!(msg.sender_id().is_none());
        assert_eq!(msg.author_signature.as_deref(), Some("Editor"));
        // Username builders are no-ops without a sender
        let msg = msg.with_username("ignored");
        assert!(msg.sender.is_none());
    }

    #[test]
    fn test_empty_text_counts_as_no_text() {
        let msg = InboundMessage::group("-1", "42", "");
        assert!(msg.text().is_none());
        assert!(InboundMessage::group("-1", "42", "x").without_text().text().is_none());
    }

    #[test]
    fn test_outbound_reply_without_message_id() {
        let inbound = InboundMessage::group("-1", "42", "hi");
        let reply = OutboundMessage::reply_to(&inbound, "yo");
        assert_eq!(reply.reply_to, None);
        assert_eq!(reply.content, "yo");
    }
}
