//! Action room persistence contract

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::types::ActionRoom;

#[async_trait::async_trait]
pub trait ActionRoomStore: Send + Sync {
    /// Insert a new room; an id already held by another owner is refused
    async fn save(&self, room: ActionRoom) -> Result<(), String>;

    /// Replace keys and status of a room owned by `owner`; returns false when none matched
    async fn update_by_owner(&self, owner: Uuid, room: ActionRoom) -> Result<bool, String>;

    async fn delete_by_owner(&self, owner: Uuid, id: Uuid) -> Result<bool, String>;

    /// Store `access_key` on every room of `owner`, creating a room when there is none
    async fn set_access_key(&self, owner: Uuid, access_key: &str, now: i64) -> Result<(), String>;

    /// Access key of the owner's oldest room
    async fn access_key(&self, owner: Uuid) -> Result<Option<String>, String>;
}

/// In-memory action room store
#[derive(Default)]
pub struct MemoryActionRoomStore {
    rooms: DashMap<Uuid, ActionRoom>,
}

impl MemoryActionRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ActionRoomStore for MemoryActionRoomStore {
    async fn save(&self, room: ActionRoom) -> Result<(), String> {
        match self.rooms.entry(room.object_id) {
            Entry::Occupied(existing) if existing.get().owner_user_id != room.owner_user_id => {
                Err(format!("action room {} belongs to another user", room.object_id))
            }
            Entry::Occupied(mut existing) => {
                existing.insert(room);
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(room);
                Ok(())
            }
        }
    }

    async fn update_by_owner(&self, owner: Uuid, room: ActionRoom) -> Result<bool, String> {
        match self.rooms.get_mut(&room.object_id) {
            Some(mut stored) if stored.owner_user_id == owner => {
                stored.private_key = room.private_key;
                stored.access_key = room.access_key;
                stored.status = room.status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_owner(&self, owner: Uuid, id: Uuid) -> Result<bool, String> {
        Ok(self
            .rooms
            .remove_if(&id, |_, r| r.owner_user_id == owner)
            .is_some())
    }

    async fn set_access_key(&self, owner: Uuid, access_key: &str, now: i64) -> Result<(), String> {
        let mut updated = false;
        for mut room in self.rooms.iter_mut() {
            if room.owner_user_id == owner {
                room.access_key = access_key.to_string();
                updated = true;
            }
        }

        if !updated {
            let room = ActionRoom {
                object_id: Uuid::new_v4(),
                owner_user_id: owner,
                private_key: String::new(),
                access_key: access_key.to_string(),
                status: 0,
                created_date: now,
            };
            self.rooms.insert(room.object_id, room);
        }
        Ok(())
    }

    async fn access_key(&self, owner: Uuid) -> Result<Option<String>, String> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.owner_user_id == owner)
            .min_by_key(|r| r.created_date)
            .map(|r| r.access_key.clone()))
    }
}
