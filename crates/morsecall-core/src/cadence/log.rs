//! Bounded rolling activity log for display.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_CAPACITY: usize = 5;

/// Most-recent-first list of human-readable lines.
///
/// Display only; nothing in the engine reads it back to make decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    capacity: usize,
    entries: VecDeque<String>,
}

impl ActivityLog {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push_front(line.into());
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
