//! Per-user context and notification tables.
//!
//! The outer map is only locked long enough to find or insert a user's slot.
//! All reads and writes of a user's snapshot and history go through that
//! user's own mutex, so updates for one user are serialized while different
//! users never wait on each other.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};

use crate::{domain::ContextSnapshot, history::NotificationHistory};

/// Everything the engine owns for one user.
#[derive(Debug)]
pub struct UserSlot {
    pub snapshot: Option<ContextSnapshot>,
    pub history: NotificationHistory,
    retired: bool,
}

impl UserSlot {
    fn new(history_limit: usize) -> Self {
        Self {
            snapshot: None,
            history: NotificationHistory::new(history_limit),
            retired: false,
        }
    }

    /// A retired slot was removed from the table while someone still held it.
    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

pub type SharedSlot = Arc<Mutex<UserSlot>>;

#[derive(Debug)]
pub struct ContextStore {
    slots: RwLock<HashMap<String, SharedSlot>>,
    history_limit: usize,
}

impl ContextStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            history_limit,
        }
    }

    /// Returns the user's slot, creating an empty one on first use.
    pub async fn slot(&self, user_id: &str) -> SharedSlot {
        if let Some(slot) = self.slots.read().await.get(user_id) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserSlot::new(self.history_limit))))
            .clone()
    }

    pub async fn existing(&self, user_id: &str) -> Option<SharedSlot> {
        self.slots.read().await.get(user_id).cloned()
    }

    /// Removes the user's slot and marks it retired. Takes the slot lock, so it
    /// waits for any in-flight update of that user to finish first.
    pub async fn remove(&self, user_id: &str) -> bool {
        let Some(slot) = self.existing(user_id).await else {
            return false;
        };
        let mut guard = slot.lock().await;
        guard.retired = true;
        guard.snapshot = None;
        guard.history.clear();
        self.slots.write().await.remove(user_id);
        true
    }

    pub async fn snapshot(&self, user_id: &str) -> Option<ContextSnapshot> {
        let slot = self.existing(user_id).await?;
        let guard = slot.lock().await;
        guard.snapshot.clone()
    }

    pub async fn user_count(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn total_notifications(&self) -> usize {
        let slots: Vec<SharedSlot> = self.slots.read().await.values().cloned().collect();
        let mut total = 0;
        for slot in slots {
            total += slot.lock().await.history.len();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slot_is_created_once_and_shared() {
        let store = ContextStore::new(10);
        let a = store.slot("u1").await;
        let b = store.slot("u1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.user_count().await, 1);
        assert!(store.existing("u2").await.is_none());
    }

    #[tokio::test]
    async fn remove_retires_outstanding_handles() {
        let store = ContextStore::new(10);
        let held = store.slot("u1").await;
        held.lock().await.snapshot = Some(ContextSnapshot::default().with_hour(9));

        assert!(store.remove("u1").await);
        assert!(!store.remove("u1").await);
        assert!(held.lock().await.is_retired());
        assert!(store.snapshot("u1").await.is_none());
    }
}
