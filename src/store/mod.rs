//! Persistence collaborators
//!
//! Narrow "save / find / update / delete by owner" contracts. The in-memory
//! implementations back the binary and the tests; a database-backed store only
//! has to implement the traits.

pub mod action_room;
pub mod notification;
pub mod profile;
pub mod setting;

pub use action_room::{ActionRoomStore, MemoryActionRoomStore};
pub use notification::{MemoryNotificationStore, NotificationStore};
pub use profile::{MemoryProfileStore, ProfileStore};
pub use setting::{MemorySettingStore, SettingStore};
