//! Activity tracking for the monitored chat.
//!
//! The monitor keeps the time of the last qualifying message and a counter of
//! messages since the agent last joined the conversation. Both the inbound
//! loop and the schedule timer read it, so the state sits behind one mutex.
//! Every method takes `now` explicitly; callers pass `Instant::now()`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct ActivityState {
    last_message_at: Option<Instant>,
    message_counter: u32,
    agent_id: Option<String>,
}

/// Thread-safe activity state for one chat.
#[derive(Debug, Default)]
pub struct ActivityMonitor {
    state: Mutex<ActivityState>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ActivityState> {
        // Plain counters stay consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configure the agent's own id. Messages from this id are never counted.
    pub fn set_agent_identity(&self, agent_id: &str) {
        self.lock().agent_id = Some(agent_id.to_string());
    }

    /// Returns true if `sender_id` is the agent itself.
    pub fn is_agent(&self, sender_id: &str) -> bool {
        self.lock().agent_id.as_deref() == Some(sender_id)
    }

    /// Record a message from `sender_id` at `now`.
    ///
    /// Returns `false` (and changes nothing) when the sender is the agent.
    pub fn record_activity(&self, sender_id: &str, now: Instant) -> bool {
        let mut state = self.lock();
        if state.agent_id.as_deref() == Some(sender_id) {
            return false;
        }
        state.last_message_at = Some(now);
        state.message_counter = state.message_counter.saturating_add(1);
        true
    }

    /// True iff a message was recorded less than `timeout` before `now`.
    pub fn is_active(&self, now: Instant, timeout: Duration) -> bool {
        Self::active(&self.lock(), now, timeout)
    }

    fn active(state: &ActivityState, now: Instant, timeout: Duration) -> bool {
        match state.last_message_at {
            Some(last) => now.saturating_duration_since(last) < timeout,
            None => false,
        }
    }

    /// True iff the chat is active and the counter lies in `[min, max]`.
    ///
    /// Both checks run under one lock so a concurrent reset cannot slip in
    /// between them.
    pub fn should_respond(&self, now: Instant, timeout: Duration, min: u32, max: u32) -> bool {
        let state = self.lock();
        Self::active(&state, now, timeout)
            && (min..=max).contains(&state.message_counter)
    }

    /// Zero the counter. The last-activity timestamp is kept.
    pub fn reset_counter(&self) {
        self.lock().message_counter = 0;
    }

    /// Messages counted since the last reset.
    pub fn counter(&self) -> u32 {
        self.lock().message_counter
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.lock().last_message_at
    }
}
