//! Bounded, newest-first event log.

use std::collections::VecDeque;

use crate::models::LiveEvent;

/// Default number of events kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// Events in arrival order reversed: index 0 is the newest.
///
/// No deduplication is done; a repeated upstream event appears twice.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LiveEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the head, dropping the oldest entries past capacity.
    pub fn push(&mut self, event: LiveEvent) {
        self.entries.push_front(event);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest event, if any.
    pub fn latest(&self) -> Option<&LiveEvent> {
        self.entries.front()
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LiveEvent> {
        self.entries.iter()
    }

    /// Copy out the log, newest first.
    pub fn to_vec(&self) -> Vec<LiveEvent> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
