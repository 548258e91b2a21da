//! Bounded FIFO of recent utterances.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// The last `capacity` raw utterances, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortTermBuffer {
    capacity: usize,
    messages: VecDeque<String>,
}

impl ShortTermBuffer {
    /// Create an empty buffer holding at most `capacity` utterances (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an utterance, dropping the oldest beyond capacity.
    pub fn push(&mut self, text: impl Into<String>) {
        self.messages.push_back(text.into());
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Utterances oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// Owned copy of the utterances, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.messages.iter().cloned().collect()
    }

    /// Utterances joined by newlines.
    #[must_use]
    pub fn context(&self) -> String {
        self.to_vec().join("\n")
    }

    /// Maximum number of utterances kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of utterances held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every utterance.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_beyond_capacity() {
        let mut buf = ShortTermBuffer::new(3);
        for i in 0..5 {
            buf.push(format!("m{i}"));
        }
        assert_eq!(buf.to_vec(), vec!["m2", "m3", "m4"]);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn context_joins_lines() {
        let mut buf = ShortTermBuffer::new(10);
        buf.push("Hello");
        buf.push("How are you?");
        assert_eq!(buf.context(), "Hello\nHow are you?");
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buf = ShortTermBuffer::new(0);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.to_vec(), vec!["b"]);
        buf.clear();
        assert!(buf.is_empty());
    }
}
