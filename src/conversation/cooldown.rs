//! Per-user cooldown between mention replies.
//!
//! Entries are written only after a reply was actually delivered and are
//! never evicted; the table grows with the number of distinct users who
//! ever mentioned the agent during the process lifetime.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Last successful mention-reply instant per user.
#[derive(Debug, Clone)]
pub struct MentionCooldownTable {
    cooldown: Duration,
    last_reply: HashMap<String, Instant>,
}

impl MentionCooldownTable {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_reply: HashMap::new(),
        }
    }

    /// Time left before `user_id` may be answered again, if any.
    pub fn remaining(&self, user_id: &str, now: Instant) -> Option<Duration> {
        let last = self.last_reply.get(user_id)?;
        let elapsed = now.saturating_duration_since(*last);
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }

    /// Returns `true` if a reply to `user_id` at `now` must be suppressed.
    pub fn is_cooling_down(&self, user_id: &str, now: Instant) -> bool {
        self.remaining(user_id, now).is_some()
    }

    /// Record a delivered reply to `user_id`.
    pub fn mark_replied(&mut self, user_id: &str, now: Instant) {
        self.last_reply.insert(user_id.to_string(), now);
    }

    pub fn len(&self) -> usize {
        self.last_reply.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_reply.is_empty()
    }
}
