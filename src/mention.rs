//! Mention detection.
//!
//! A message is directed at the agent when any of the following holds,
//! checked in order with the first hit winning:
//! 1. the text contains `@handle` (case-insensitive)
//! 2. the message replies to one of the agent's own messages
//! 3. a declared mention span, sliced from the text, contains `@handle`
//!
//! The agent's own messages and messages without text never count.

use crate::bus::InboundMessage;
use crate::channels::AgentIdentity;

/// Decide whether `msg` addresses the agent.
///
/// # Example
/// ```
/// use banterbot::bus::InboundMessage;
/// use banterbot::channels::AgentIdentity;
/// use banterbot::mention::is_mentioned;
///
/// let agent = AgentIdentity::new("7", Some("mybot"));
/// let msg = InboundMessage::group("-1", "42", "hey @MyBot what's up");
/// assert!(is_mentioned(&msg, &agent));
/// ```
pub fn is_mentioned(msg: &InboundMessage, agent: &AgentIdentity) -> bool {
    let Some(text) = msg.text() else {
        return false;
    };
    if msg.sender_id() == Some(agent.id.as_str()) {
        return false;
    }

    let needle = agent.handle().map(|h| format!("@{}", h.to_lowercase()));
    let lower = text.to_lowercase();

    if let Some(needle) = &needle {
        if lower.contains(needle.as_str()) {
            return true;
        }
    }

    if !agent.id.is_empty() && msg.reply_to_sender_id.as_deref() == Some(agent.id.as_str()) {
        return true;
    }

    match &needle {
        Some(needle) => msg.mention_spans.iter().any(|span| {
            text.get(span.start..span.end)
                .is_some_and(|slice| slice.to_lowercase().contains(needle.as_str()))
        }),
        None => false,
    }
}
