//! services/api/src/adapters/memory.rs
//!
//! In-memory implementation of the `PreferenceStore` port. Profiles live for
//! the lifetime of the process.

use async_trait::async_trait;
use companion_core::{
    ports::{PortResult, PreferenceStore},
    PreferenceProfile,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryPreferenceStore {
    profiles: RwLock<HashMap<String, PreferenceProfile>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get(&self, user_id: &str) -> PortResult<Option<PreferenceProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn put(&self, profile: PreferenceProfile) -> PortResult<Option<PreferenceProfile>> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.insert(profile.user_id.clone(), profile))
    }

    async fn remove(&self, user_id: &str) -> PortResult<Option<PreferenceProfile>> {
        Ok(self.profiles.write().await.remove(user_id))
    }

    async fn count(&self) -> PortResult<usize> {
        Ok(self.profiles.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion_core::{ActivityType, MealSchedule};

    #[tokio::test]
    async fn put_replaces_and_returns_previous() {
        let store = InMemoryPreferenceStore::new();
        let first =
            PreferenceProfile::new("u1", ActivityType::Indoor, MealSchedule::default(), vec![])
                .unwrap();
        let mut second = first.clone();
        second.activity_type = ActivityType::Outdoor;

        assert!(store.put(first.clone()).await.unwrap().is_none());
        assert_eq!(store.put(second.clone()).await.unwrap(), Some(first));
        assert_eq!(store.get("u1").await.unwrap(), Some(second));
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.remove("u1").await.unwrap().is_some());
        assert!(store.get("u1").await.unwrap().is_none());
    }
}
