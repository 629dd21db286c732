//! Wire and storage models shared by routes, stores and the relay

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Settings bucket holding the email preferences
pub const NOTIFICATION_SETTING_TYPE: &str = "notification";

/// Settings bucket holding the admin setup state
pub const SETUP_SETTING_TYPE: &str = "setup";

/// Preference row written as a default when first seen on update
pub const SEND_EMAIL_APP_NEWS: &str = "send_email_app_news";

/// Kind of domain event behind a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
}

/// Stored notification record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub object_id: Uuid,
    /// The user whose action produced the notification
    pub owner_user_id: Uuid,
    pub owner_display_name: String,
    pub owner_avatar: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub notify_receiver_user_id: Uuid,
    pub target_id: Uuid,
    pub is_seen: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub email_notification: bool,
    pub created_date: i64,
}

/// Body of `POST /notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationModel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub notify_receiver_user_id: Uuid,
    /// Recipient email; required for an email to be sent
    #[serde(default)]
    pub notify_receiver_email: Option<String>,
    #[serde(default)]
    pub target_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Whether the recipient may get an email for this notification
    #[serde(default = "default_true")]
    pub email_notification: bool,
}

fn default_true() -> bool {
    true
}

/// One stored setting row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSetting {
    pub object_id: Uuid,
    pub owner_user_id: Uuid,
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub setting_type: String,
    pub is_system: bool,
    pub created_date: i64,
}

/// Name/value pair inside a setting group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingItem {
    /// Existing row id; absent for rows not yet stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<Uuid>,
    pub name: String,
    pub value: String,
}

/// Body of `POST /setting` and `PUT /setting`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingGroupModel {
    #[serde(rename = "type")]
    pub setting_type: String,
    pub list: Vec<SettingItem>,
}

/// Item of the grouped view returned by `GET /setting`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingGroupItem {
    pub object_id: Uuid,
    pub name: String,
    pub value: String,
    pub is_system: bool,
}

/// Settings grouped by type
pub type SettingGroups = HashMap<String, Vec<SettingGroupItem>>;

/// Body of `POST /setting/dto/ids`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSettingsModel {
    pub user_ids: Vec<Uuid>,
    #[serde(rename = "type")]
    pub setting_type: String,
}

/// Flat key of the settings map: `"{uid}:{type}:{name}"`
pub fn setting_path(user_id: Uuid, setting_type: &str, name: &str) -> String {
    format!("{}:{}:{}", user_id, setting_type, name)
}

/// Group stored rows by type
pub fn group_settings(settings: Vec<UserSetting>) -> SettingGroups {
    let mut groups = SettingGroups::new();
    for setting in settings {
        groups
            .entry(setting.setting_type)
            .or_default()
            .push(SettingGroupItem {
                object_id: setting.object_id,
                name: setting.name,
                value: setting.value,
                is_system: setting.is_system,
            });
    }
    groups
}

/// User profile record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub object_id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub social_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub follow_count: i64,
    #[serde(default)]
    pub follower_count: i64,
    /// Unix seconds of the last reported activity
    #[serde(default)]
    pub last_seen: i64,
    #[serde(default)]
    pub created_date: i64,
}

/// Body of `PUT /profile`; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateModel {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub social_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
}

impl ProfileUpdateModel {
    pub fn apply(self, profile: &mut UserProfile) {
        let fields = [
            (self.full_name, &mut profile.full_name),
            (self.social_name, &mut profile.social_name),
            (self.avatar, &mut profile.avatar),
            (self.banner, &mut profile.banner),
            (self.tagline, &mut profile.tagline),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Body of `PUT /profile/last-seen`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLastSeenModel {
    pub user_id: Uuid,
}

/// Real-time room a user's clients join to receive dispatched actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRoom {
    pub object_id: Uuid,
    pub owner_user_id: Uuid,
    pub private_key: String,
    pub access_key: String,
    pub status: i32,
    pub created_date: i64,
}

/// Body of `POST /actions/room`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionRoomModel {
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub status: i32,
}

/// Body of `PUT /actions/room`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRoomModel {
    pub object_id: Uuid,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub status: i32,
}

/// Body of `POST /actions/room/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionVerifyModel {
    pub access_key: String,
}
