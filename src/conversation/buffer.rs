//! Bounded FIFO of recent message texts used as comment context.

use std::collections::VecDeque;

/// The last `capacity` message texts, oldest first.
#[derive(Debug, Clone)]
pub struct RecentMessageBuffer {
    capacity: usize,
    messages: VecDeque<String>,
}

impl RecentMessageBuffer {
    /// Create an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a text, evicting the oldest entry once full.
    pub fn push(&mut self, text: &str) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(text.to_string());
    }

    /// Newline-joined contents, newest last. `None` when empty.
    pub fn joined(&self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        Some(
            self.messages
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let mut buf = RecentMessageBuffer::new(3);
        for text in ["one", "two", "three", "four", "five"] {
            buf.push(text);
            assert!(buf.len() <= 3);
        }
        assert_eq!(buf.joined().as_deref(), Some("three\nfour\nfive"));
    }

    #[test]
    fn test_empty_buffer_has_no_context() {
        let buf = RecentMessageBuffer::new(3);
        assert!(buf.is_empty());
        assert!(buf.joined().is_none());
    }

    #[test]
    fn test_clear() {
        let mut buf = RecentMessageBuffer::new(2);
        buf.push("a");
        buf.push("b");
        buf.clear();
        assert!(buf.is_empty());
        buf.push("c");
        assert_eq!(buf.joined().as_deref(), Some("c"));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut buf = RecentMessageBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.joined().as_deref(), Some("b"));
    }
}
