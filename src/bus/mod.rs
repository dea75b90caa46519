//! Message Bus Module
//!
//! The `MessageBus` carries normalized inbound messages from the transport
//! adapter to the inbound loop. Outbound messages do not go through the bus:
//! controllers hand them straight to the [`Channel`](crate::channels::Channel)
//! so they can observe whether delivery succeeded.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────┐
//! │   Channel   │────>│  MessageBus │────>│ ConversationController│
//! │  (Telegram) │     │  (inbound)  │     │   (inbound loop)      │
//! └─────────────┘     └─────────────┘     └──────────────────────┘
//!        ^                                          │
//!        └──────────────── send() ──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use banterbot::bus::{MessageBus, InboundMessage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = MessageBus::new();
//!
//!     let msg = InboundMessage::group("-100123", "42", "Hello");
//!     bus.publish_inbound(msg).await.unwrap();
//!
//!     if let Some(received) = bus.consume_inbound().await {
//!         println!("Received: {:?}", received.text());
//!     }
//! }
//! ```

pub mod message;

pub use message::{InboundMessage, MentionSpan, MessageKind, OutboundMessage, Sender};

use crate::error::{BanterError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Default buffer size for the inbound queue
const DEFAULT_BUFFER_SIZE: usize = 100;

/// Inbound message queue between the transport and the inbound loop.
///
/// Backed by a bounded Tokio MPSC queue. The receiver sits behind an
/// `Arc<Mutex>` so clones of the bus can share it.
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Arc<Mutex<mpsc::Receiver<InboundMessage>>>,
}

impl MessageBus {
    /// Creates a new `MessageBus` with the default buffer size (100).
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a new `MessageBus` with a custom buffer size.
    ///
    /// # Example
    /// ```
    /// use banterbot::bus::MessageBus;
    ///
    /// let bus = MessageBus::with_buffer_size(500);
    /// ```
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size);

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
        }
    }

    /// Publishes an inbound message to the bus.
    ///
    /// Waits for buffer space when the queue is full.
    ///
    /// # Errors
    /// Returns `BanterError::BusClosed` if the receiver has been dropped.
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        self.inbound_tx
            .send(msg)
            .await
            .map_err(|_| BanterError::BusClosed)
    }

    /// Consumes the next inbound message from the bus.
    ///
    /// Returns `None` once every sender has been dropped and the queue is drained.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        self.inbound_rx.lock().await.recv().await
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MessageBus {
    /// Clones the bus, sharing the same underlying queue.
    fn clone(&self) -> Self {
        Self {
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: Arc::clone(&self.inbound_rx),
        }
    }
}
