//! Banterbot - an activity-aware companion for a single Telegram group
//!
//! The agent watches one chat, drops a comment once enough fresh chatter has
//! piled up, answers when addressed (with a per-user cooldown), and posts a
//! joke or quote at randomized daily times while the chat is quiet.

pub mod bus;
pub mod channels;
pub mod config;
pub mod content;
pub mod conversation;
pub mod error;
pub mod mention;
pub mod monitor;
pub mod providers;
pub mod runtime;
pub mod schedule;
pub mod utils;

pub use bus::{InboundMessage, MessageBus, OutboundMessage};
pub use channels::{AgentIdentity, Channel};
pub use config::Config;
pub use content::ContentGenerator;
pub use conversation::{ConversationController, HandleOutcome};
pub use error::{BanterError, Result};
pub use monitor::ActivityMonitor;
pub use providers::LLMProvider;
pub use runtime::AgentContext;
pub use schedule::{ScheduleController, ScheduleEntry};
