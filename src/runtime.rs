//! Agent wiring and the inbound event loop.
//!
//! [`AgentContext`] holds every shared component explicitly; nothing lives in
//! a global. [`InboundLoop`] drains the message bus one message at a time
//! and hands each to the conversation controller.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{info, info_span, Instrument};

use crate::bus::MessageBus;
use crate::channels::{AgentIdentity, Channel};
use crate::config::Config;
use crate::content::ContentGenerator;
use crate::conversation::{ConversationController, ConversationSettings};
use crate::error::{BanterError, Result};
use crate::monitor::ActivityMonitor;
use crate::providers::LLMProvider;
use crate::schedule::ScheduleController;

/// Everything the agent needs at runtime, built once at startup.
pub struct AgentContext {
    pub bus: Arc<MessageBus>,
    pub channel: Arc<dyn Channel>,
    pub monitor: Arc<ActivityMonitor>,
    pub generator: Arc<ContentGenerator>,
    pub conversation: Arc<ConversationController>,
    pub schedule: Arc<ScheduleController>,
}

impl AgentContext {
    /// Wire the components together.
    ///
    /// `identity` must be the agent's own identity on `channel`; it is
    /// installed in the activity monitor before anything else sees it.
    pub fn new(
        config: &Config,
        identity: AgentIdentity,
        bus: Arc<MessageBus>,
        provider: Arc<dyn LLMProvider>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        let monitor = Arc::new(ActivityMonitor::new());
        monitor.set_agent_identity(&identity.id);

        let generator = Arc::new(ContentGenerator::new(
            provider,
            config.generation.clone(),
            config.persona.clone(),
        ));

        let conversation = Arc::new(ConversationController::new(
            ConversationSettings::from_config(config),
            identity,
            Arc::clone(&monitor),
            Arc::clone(&generator),
            Arc::clone(&channel),
        ));

        let schedule = Arc::new(ScheduleController::from_config(
            config,
            Arc::clone(&monitor),
            Arc::clone(&generator),
            Arc::clone(&channel),
        ));

        Self {
            bus,
            channel,
            monitor,
            generator,
            conversation,
            schedule,
        }
    }

    /// Inbound loop over this context's bus and controller.
    pub fn inbound_loop(&self) -> InboundLoop {
        InboundLoop::new(Arc::clone(&self.bus), Arc::clone(&self.conversation))
    }
}

/// Serial consumer of inbound messages.
pub struct InboundLoop {
    bus: Arc<MessageBus>,
    conversation: Arc<ConversationController>,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl InboundLoop {
    pub fn new(bus: Arc<MessageBus>, conversation: Arc<ConversationController>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            bus,
            conversation,
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Process messages until [`stop`](Self::stop) is called or the bus closes.
    ///
    /// A message being handled when the stop signal arrives is finished
    /// first; nothing further is taken from the bus afterwards. A panic while
    /// handling one message is logged and the loop carries on.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop is already running.
    pub async fn run(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BanterError::Config("Inbound loop already running".into()));
        }
        info!("Starting inbound loop");

        // Consume any stale stop signal from a previous run
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let _ = *shutdown_rx.borrow_and_update();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Received shutdown signal");
                        break;
                    }
                }
                msg = self.bus.consume_inbound() => {
                    let Some(msg) = msg else {
                        info!("Inbound channel closed");
                        break;
                    };

                    let span = info_span!(
                        "message",
                        chat_id = %msg.chat_id,
                        kind = ?msg.kind,
                        message_id = ?msg.message_id,
                    );
                    let handled = AssertUnwindSafe(self.conversation.handle(&msg, Instant::now()))
                        .catch_unwind()
                        .instrument(span)
                        .await;

                    match handled {
                        Ok(outcome) => {
                            crate::log_component!(
                                debug,
                                "conversation",
                                "message handled",
                                outcome = tracing::field::debug(&outcome)
                            );
                        }
                        Err(_) => {
                            crate::log_component!(
                                error,
                                "conversation",
                                "message handler panicked, message dropped",
                                chat_id = msg.chat_id.as_str()
                            );
                        }
                    }
                }
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Inbound loop stopped");
        Ok(())
    }

    /// Signal the loop to stop after the message in hand.
    pub fn stop(&self) {
        info!("Stopping inbound loop");
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
