//! Setting persistence contract

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::types::UserSetting;

#[async_trait::async_trait]
pub trait SettingStore: Send + Sync {
    /// Insert new rows; ids already held by another owner are refused
    async fn save_many(&self, settings: Vec<UserSetting>) -> Result<(), String>;

    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<UserSetting>, String>;

    async fn find_by_owners(
        &self,
        owners: &[Uuid],
        setting_type: &str,
    ) -> Result<Vec<UserSetting>, String>;

    /// Replace name/value of rows owned by `owner`; returns how many matched
    async fn update_by_owner(&self, owner: Uuid, settings: Vec<UserSetting>)
        -> Result<u64, String>;

    async fn delete_by_owner(&self, owner: Uuid) -> Result<u64, String>;
}

/// In-memory setting store
#[derive(Default)]
pub struct MemorySettingStore {
    rows: DashMap<Uuid, UserSetting>,
}

impl MemorySettingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SettingStore for MemorySettingStore {
    async fn save_many(&self, settings: Vec<UserSetting>) -> Result<(), String> {
        // Refuse the whole batch before writing any of it
        if let Some(taken) = settings.iter().find(|s| {
            self.rows
                .get(&s.object_id)
                .is_some_and(|r| r.owner_user_id != s.owner_user_id)
        }) {
            return Err(format!("setting {} belongs to another user", taken.object_id));
        }

        for setting in settings {
            match self.rows.entry(setting.object_id) {
                Entry::Occupied(existing)
                    if existing.get().owner_user_id != setting.owner_user_id =>
                {
                    return Err(format!("setting {} belongs to another user", setting.object_id));
                }
                Entry::Occupied(mut existing) => {
                    existing.insert(setting);
                }
                Entry::Vacant(slot) => {
                    slot.insert(setting);
                }
            }
        }
        Ok(())
    }

    async fn find_by_owner(&self, owner: Uuid) -> Result<Vec<UserSetting>, String> {
        let mut rows: Vec<UserSetting> = self
            .rows
            .iter()
            .filter(|r| r.owner_user_id == owner)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| (a.created_date, &a.name).cmp(&(b.created_date, &b.name)));
        Ok(rows)
    }

    async fn find_by_owners(
        &self,
        owners: &[Uuid],
        setting_type: &str,
    ) -> Result<Vec<UserSetting>, String> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.setting_type == setting_type && owners.contains(&r.owner_user_id))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn update_by_owner(
        &self,
        owner: Uuid,
        settings: Vec<UserSetting>,
    ) -> Result<u64, String> {
        let mut updated = 0;
        for setting in settings {
            if let Some(mut row) = self.rows.get_mut(&setting.object_id) {
                if row.owner_user_id == owner {
                    row.name = setting.name;
                    row.value = setting.value;
                    row.setting_type = setting.setting_type;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn delete_by_owner(&self, owner: Uuid) -> Result<u64, String> {
        let mut removed = 0;
        self.rows.retain(|_, r| {
            let keep = r.owner_user_id != owner;
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

    fn row(owner: Uuid, setting_type: &str, name: &str, value: &str) -> UserSetting {
        UserSetting {
            object_id: Uuid::new_v4(),
            owner_user_id: owner,
            name: name.into(),
            value: value.into(),
            setting_type: setting_type.into(),
            is_system: false,
            created_date: 0,
        }
    }

    #[tokio::test]
    async fn test_find_by_owners_filters_type() {
        let store = MemorySettingStore::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store
            .save_many(vec![
                row(a, "notification", "send_email_on_like", "true"),
                row(b, "notification", "send_email_on_follow", "false"),
                row(b, "setup", "status", "completed"),
                row(c, "notification", "send_email_on_like", "true"),
            ])
            .await
            .unwrap();

        let found = store.find_by_owners(&[a, b], "notification").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_update_ignores_foreign_rows() {
        let store = MemorySettingStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mine = row(a, "notification", "send_email_on_like", "true");
        let theirs = row(b, "notification", "send_email_on_like", "true");
        store.save_many(vec![mine.clone(), theirs.clone()]).await.unwrap();

        let mut change_mine = mine.clone();
        change_mine.value = "false".into();
        let mut change_theirs = theirs.clone();
        change_theirs.value = "false".into();

        let updated = store
            .update_by_owner(a, vec![change_mine, change_theirs])
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.find_by_owner(b).await.unwrap()[0].value, "true");
        assert_eq!(store.delete_by_owner(a).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_refuses_foreign_id() {
        let store = MemorySettingStore::new();
        let (victim, attacker) = (Uuid::new_v4(), Uuid::new_v4());
        let muted = row(victim, "notification", "send_email_on_like", "false");
        store.save_many(vec![muted.clone()]).await.unwrap();

        let mut moved = muted.clone();
        moved.owner_user_id = attacker;
        moved.value = "true".into();
        assert!(store.save_many(vec![moved]).await.is_err());

        let rows = store.find_by_owner(victim).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "false");
        assert!(store.find_by_owner(attacker).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_count_ignores_concurrent_inserts() {
        let store = std::sync::Arc::new(MemorySettingStore::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mine: Vec<UserSetting> = (0..50)
            .map(|i| row(a, "notification", &format!("n{}", i), "true"))
            .collect();
        store.save_many(mine).await.unwrap();

        let writer = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..500 {
                    let other = row(b, "notification", &format!("n{}", i), "true");
                    store.save_many(vec![other]).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut deleted = 0;
        for _ in 0..20 {
            deleted += store.delete_by_owner(a).await.unwrap();
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        assert_eq!(deleted, 50);
        assert_eq!(store.find_by_owner(b).await.unwrap().len(), 500);
    }
}
