//! Notification persistence contract

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::types::Notification;

/// Notification records owned by the notification service
#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a new record; an id already held by another owner is refused
    async fn save(&self, notification: Notification) -> Result<(), String>;

    /// Notifications received by `receiver`, newest first
    async fn find_by_receiver(
        &self,
        receiver: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Notification>, String>;

    /// Mark one notification seen; returns false when `receiver` has no such record
    async fn mark_seen(&self, id: Uuid, receiver: Uuid) -> Result<bool, String>;

    async fn mark_all_seen(&self, receiver: Uuid) -> Result<u64, String>;

    /// Delete one record created by `owner`; returns false when none matched
    async fn delete_by_owner(&self, owner: Uuid, id: Uuid) -> Result<bool, String>;

    async fn delete_all_by_owner(&self, owner: Uuid) -> Result<u64, String>;
}

/// In-memory notification store
#[derive(Default)]
pub struct MemoryNotificationStore {
    records: DashMap<Uuid, Notification>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn save(&self, notification: Notification) -> Result<(), String> {
        match self.records.entry(notification.object_id) {
            Entry::Occupied(mut existing) => {
                if existing.get().owner_user_id != notification.owner_user_id {
                    return Err(format!(
                        "notification {} belongs to another user",
                        notification.object_id
                    ));
                }
                existing.insert(notification);
            }
            Entry::Vacant(slot) => {
                slot.insert(notification);
            }
        }
        Ok(())
    }

    async fn find_by_receiver(
        &self,
        receiver: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Notification>, String> {
        let mut found: Vec<Notification> = self
            .records
            .iter()
            .filter(|entry| entry.notify_receiver_user_id == receiver)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_date.cmp(&a.created_date));

        // Pages start at 1; page 0 is treated as the first page
        let skip = page.saturating_sub(1).saturating_mul(limit) as usize;
        Ok(found.into_iter().skip(skip).take(limit as usize).collect())
    }

    async fn mark_seen(&self, id: Uuid, receiver: Uuid) -> Result<bool, String> {
        match self.records.get_mut(&id) {
            Some(mut entry) if entry.notify_receiver_user_id == receiver => {
                entry.is_seen = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_seen(&self, receiver: Uuid) -> Result<u64, String> {
        let mut count = 0;
        for mut entry in self.records.iter_mut() {
            if entry.notify_receiver_user_id == receiver && !entry.is_seen {
                entry.is_seen = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_by_owner(&self, owner: Uuid, id: Uuid) -> Result<bool, String> {
        Ok(self
            .records
            .remove_if(&id, |_, n| n.owner_user_id == owner)
            .is_some())
    }

    async fn delete_all_by_owner(&self, owner: Uuid) -> Result<u64, String> {
        let mut removed = 0;
        self.records.retain(|_, n| {
            let keep = n.owner_user_id != owner;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationKind;

    fn record(owner: Uuid, receiver: Uuid, created: i64) -> Notification {
        Notification {
            object_id: Uuid::new_v4(),
            owner_user_id: owner,
            owner_display_name: "A".into(),
            owner_avatar: String::new(),
            title: "A liked your post.".into(),
            description: String::new(),
            url: String::new(),
            notify_receiver_user_id: receiver,
            target_id: Uuid::new_v4(),
            is_seen: false,
            kind: NotificationKind::Like,
            email_notification: true,
            created_date: created,
        }
    }

    #[tokio::test]
    async fn test_find_by_receiver_is_paged_newest_first() {
        let store = MemoryNotificationStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        for created in 1..=5 {
            store.save(record(a, b, created)).await.unwrap();
        }
        store.save(record(b, a, 9)).await.unwrap();

        let first = store.find_by_receiver(b, 1, 2).await.unwrap();
        assert_eq!(
            first.iter().map(|n| n.created_date).collect::<Vec<_>>(),
            vec![5, 4]
        );
        let last = store.find_by_receiver(b, 3, 2).await.unwrap();
        assert_eq!(last.len(), 1);
    }

    #[tokio::test]
    async fn test_seen_only_by_receiver() {
        let store = MemoryNotificationStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let n = record(a, b, 1);
        let id = n.object_id;
        store.save(n).await.unwrap();

        assert!(!store.mark_seen(id, a).await.unwrap());
        assert!(store.mark_seen(id, b).await.unwrap());
        assert_eq!(store.mark_all_seen(b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let store = MemoryNotificationStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let n = record(a, b, 1);
        let id = n.object_id;
        store.save(n).await.unwrap();
        store.save(record(a, b, 2)).await.unwrap();

        assert!(!store.delete_by_owner(b, id).await.unwrap());
        assert!(store.delete_by_owner(a, id).await.unwrap());
        assert_eq!(store.delete_all_by_owner(a).await.unwrap(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_refuses_foreign_id() {
        let store = MemoryNotificationStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let original = record(a, b, 1);
        let id = original.object_id;
        store.save(original).await.unwrap();

        let mut forged = record(b, a, 2);
        forged.object_id = id;
        assert!(store.save(forged).await.is_err());

        assert_eq!(store.find_by_receiver(b, 1, 10).await.unwrap()[0].owner_user_id, a);
        assert!(store.delete_by_owner(a, id).await.unwrap());
    }
}
