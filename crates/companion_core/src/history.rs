//! Bounded per-user notification history.

use std::collections::VecDeque;

use crate::domain::NotificationEvent;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Most recent notifications for one user, oldest first. Appending beyond the
/// capacity evicts from the front.
#[derive(Debug, Clone)]
pub struct NotificationHistory {
    events: VecDeque<NotificationEvent>,
    capacity: usize,
}

impl NotificationHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: NotificationEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = NotificationEvent>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    /// The last `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<NotificationEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Empties the history and returns how many events were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.events.len();
        self.events.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for NotificationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
