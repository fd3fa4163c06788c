//! Recently announced message window.

use std::collections::{HashSet, VecDeque};

/// Default number of messages remembered.
pub const DEFAULT_DEDUP_CAPACITY: usize = 50;

/// Bounded FIFO set of recently announced messages.
///
/// Only insertion order matters: checking a duplicate does not refresh
/// its position.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

impl DedupWindow {
    /// Create a window holding at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    /// Record `message` if it is new.
    ///
    /// Returns `true` the first time a message is seen and `false` for a
    /// duplicate still inside the window. Inserting into a full window evicts
    /// the oldest entry.
    pub fn remember(&mut self, message: &str) -> bool {
        if self.members.contains(message) {
            return false;
        }

        self.order.push_back(message.to_string());
        self.members.insert(message.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    /// Whether `message` is currently in the window.
    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.members.contains(message)
    }

    /// Number of messages currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no messages are remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Get the maximum number of remembered messages.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
