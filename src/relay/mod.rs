//! Outbound calls to internal services
//!
//! - `RelayClient`: signed request/response calls (settings, index creation)
//! - `DispatchForwarder`: opaque room dispatch to the real-time backend
//! - `paths`: typed wrappers for the conventional internal paths

pub mod client;
pub mod dispatch;
pub mod paths;

pub use client::{is_relay_success, RelayClient, RelayRequest};
pub use dispatch::{DispatchForwarder, ORIGIN_HEADER};
pub use paths::{
    create_index, fetch_notification_settings, read_settings, write_settings, POSTS_INDEX_PATH,
    PROFILE_INDEX_PATH, SETTINGS_BY_IDS_PATH, SETTINGS_PATH,
};
