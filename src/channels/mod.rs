//! Channels module - the transport boundary
//!
//! A channel receives raw platform updates, normalizes them into
//! [`InboundMessage`](crate::bus::InboundMessage) values and publishes them on
//! the [`MessageBus`](crate::bus::MessageBus). Controllers send text back
//! through the same channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  normalize   ┌────────────┐  consume  ┌──────────────┐
//! │ Telegram API │ ───────────> │ MessageBus │ ────────> │ inbound loop │
//! └──────────────┘              └────────────┘           └──────┬───────┘
//!        ^                                                      │
//!        └──────────────── Channel::send(OutboundMessage) ──────┘
//! ```

pub mod telegram;
mod types;

pub use telegram::TelegramChannel;
pub use types::{AgentIdentity, Channel};

#[cfg(test)]
pub use types::MockChannel;
