//! Conventional internal paths consumed through the relay

use std::collections::HashMap;

use uuid::Uuid;

use crate::auth::AuthenticatedIdentity;
use crate::relay::{RelayClient, RelayRequest};
use crate::types::{
    GatehouseError, GetSettingsModel, SettingGroupModel, SettingGroups,
    NOTIFICATION_SETTING_TYPE,
};

pub const SETTINGS_PATH: &str = "/setting";
pub const SETTINGS_BY_IDS_PATH: &str = "/setting/dto/ids";
pub const POSTS_INDEX_PATH: &str = "/posts/index";
pub const PROFILE_INDEX_PATH: &str = "/profile/index";

/// Notification preferences of `user_ids`, keyed `"{uid}:notification:{name}"`
pub async fn fetch_notification_settings(
    relay: &RelayClient,
    user_ids: Vec<Uuid>,
    caller: &AuthenticatedIdentity,
) -> Result<HashMap<String, String>, GatehouseError> {
    let model = GetSettingsModel {
        user_ids,
        setting_type: NOTIFICATION_SETTING_TYPE.to_string(),
    };
    let request = RelayRequest::post(SETTINGS_BY_IDS_PATH)
        .json(&model)?
        .identity(caller);
    relay.call_json(request).await
}

/// The caller's settings grouped by type
pub async fn read_settings(
    relay: &RelayClient,
    caller: &AuthenticatedIdentity,
) -> Result<SettingGroups, GatehouseError> {
    relay
        .call_json(RelayRequest::get(SETTINGS_PATH).identity(caller))
        .await
}

/// Store a setting group for the caller
pub async fn write_settings(
    relay: &RelayClient,
    caller: &AuthenticatedIdentity,
    group: &SettingGroupModel,
) -> Result<(), GatehouseError> {
    let request = RelayRequest::post(SETTINGS_PATH).json(group)?.identity(caller);
    relay.call(request).await?;
    Ok(())
}

/// Ask a service to create its search index (empty signed body)
pub async fn create_index(relay: &RelayClient, path: &str) -> Result<(), GatehouseError> {
    relay.call(RelayRequest::post(path)).await?;
    Ok(())
}
