//! Profile persistence contract

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::types::UserProfile;

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save(&self, profile: UserProfile) -> Result<(), String>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, String>;

    /// Create the search index; repeated calls are no-ops
    async fn create_index(&self) -> Result<(), String>;

    /// Returns false when no profile has this id
    async fn increment_follow_count(&self, id: Uuid, inc: i64) -> Result<bool, String>;

    async fn increment_follower_count(&self, id: Uuid, inc: i64) -> Result<bool, String>;

    /// Returns false when no profile has this id
    async fn update_last_seen(&self, id: Uuid, at: i64) -> Result<bool, String>;
}

/// In-memory profile store
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<Uuid, UserProfile>,
    indexed: AtomicBool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn save(&self, profile: UserProfile) -> Result<(), String> {
        self.profiles.insert(profile.object_id, profile);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, String> {
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }

    async fn create_index(&self) -> Result<(), String> {
        self.indexed.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn increment_follow_count(&self, id: Uuid, inc: i64) -> Result<bool, String> {
        Ok(self
            .profiles
            .get_mut(&id)
            .map(|mut p| p.follow_count = p.follow_count.saturating_add(inc))
            .is_some())
    }

    async fn increment_follower_count(&self, id: Uuid, inc: i64) -> Result<bool, String> {
        Ok(self
            .profiles
            .get_mut(&id)
            .map(|mut p| p.follower_count = p.follower_count.saturating_add(inc))
            .is_some())
    }

    async fn update_last_seen(&self, id: Uuid, at: i64) -> Result<bool, String> {
        Ok(self.profiles.get_mut(&id).map(|mut p| p.last_seen = at).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_adjust_in_both_directions() {
        let store = MemoryProfileStore::new();
        let id = Uuid::new_v4();
        store
            .save(UserProfile {
                object_id: id,
                full_name: "Erin".into(),
                social_name: "erin".into(),
                email: "erin@example.com".into(),
                avatar: String::new(),
                banner: String::new(),
                tagline: String::new(),
                follow_count: 0,
                follower_count: 3,
                last_seen: 0,
                created_date: 0,
            })
            .await
            .unwrap();

        assert!(store.increment_follow_count(id, 1).await.unwrap());
        assert!(store.increment_follower_count(id, -1).await.unwrap());
        assert!(!store.increment_follow_count(Uuid::new_v4(), 1).await.unwrap());

        let profile = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!((profile.follow_count, profile.follower_count), (1, 2));

        assert!(store.update_last_seen(id, 1_700_000_000).await.unwrap());
        assert!(!store.update_last_seen(Uuid::new_v4(), 1).await.unwrap());
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().last_seen, 1_700_000_000);
    }
}
