//! First-run setup driven by an admin session

use tracing::{info, warn};

use crate::auth::AuthenticatedIdentity;
use crate::relay::{
    create_index, read_settings, write_settings, RelayClient, POSTS_INDEX_PATH,
    PROFILE_INDEX_PATH,
};
use crate::types::{GatehouseError, SettingGroupModel, SettingItem, SETUP_SETTING_TYPE};

const STATUS_NAME: &str = "status";
const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    AlreadyCompleted,
    Completed,
}

/// Create search indexes once and record that setup finished
pub async fn run_setup(
    relay: &RelayClient,
    admin: &AuthenticatedIdentity,
) -> Result<SetupOutcome, GatehouseError> {
    let groups = read_settings(relay, admin).await?;
    let status = groups
        .get(SETUP_SETTING_TYPE)
        .and_then(|items| items.iter().find(|i| i.name == STATUS_NAME))
        .map(|i| i.value.as_str())
        .unwrap_or("none");

    if status == STATUS_COMPLETED {
        return Ok(SetupOutcome::AlreadyCompleted);
    }

    for path in [POSTS_INDEX_PATH, PROFILE_INDEX_PATH] {
        if let Err(e) = create_index(relay, path).await {
            warn!(path, code = e.code(), "Setup failed creating index");
            return Err(e);
        }
    }

    let group = SettingGroupModel {
        setting_type: SETUP_SETTING_TYPE.to_string(),
        list: vec![SettingItem {
            object_id: None,
            name: STATUS_NAME.to_string(),
            value: STATUS_COMPLETED.to_string(),
        }],
    };
    write_settings(relay, admin, &group).await?;

    info!(admin = %admin.user_id, "Setup completed");
    Ok(SetupOutcome::Completed)
}
