//! Setting routes

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::debug;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::server::AppState;
use crate::types::{
    group_settings, setting_path, GatehouseError, GetSettingsModel, Result, SettingGroupModel,
    UserSetting, SEND_EMAIL_APP_NEWS,
};

use super::{json_response, ok_response, parse_body};

fn require_type(group: &SettingGroupModel) -> Result<()> {
    if group.setting_type.trim().is_empty() {
        return Err(GatehouseError::bad_request(
            "settingTypeEmptyError",
            "Setting type can not be empty Error",
        ));
    }
    Ok(())
}

/// GET /setting
pub async fn get_all(state: &AppState, ctx: &RequestContext) -> Result<Response<Full<Bytes>>> {
    let owner = ctx.identity()?.user_id;
    let rows = state
        .settings
        .find_by_owner(owner)
        .await
        .map_err(GatehouseError::Store)?;
    Ok(json_response(StatusCode::OK, &group_settings(rows)))
}

/// POST /setting
pub async fn create(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let group: SettingGroupModel = parse_body(body)?;
    require_type(&group)?;
    if group.list.is_empty() {
        return Err(GatehouseError::bad_request(
            "noSettingForCreate",
            "Can not find setting for create!",
        ));
    }

    let owner = ctx.identity()?.user_id;
    let now = chrono::Utc::now().timestamp();
    // New rows always get fresh ids; `objectId` only addresses rows on update
    let rows: Vec<UserSetting> = group
        .list
        .into_iter()
        .map(|item| UserSetting {
            object_id: Uuid::new_v4(),
            owner_user_id: owner,
            name: item.name,
            value: item.value,
            setting_type: group.setting_type.clone(),
            is_system: false,
            created_date: now,
        })
        .collect();
    let ids: Vec<Uuid> = rows.iter().map(|r| r.object_id).collect();

    state
        .settings
        .save_many(rows)
        .await
        .map_err(GatehouseError::Store)?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "objectIds": ids }),
    ))
}

/// PUT /setting
///
/// Rows with an id are updated in place. A `send_email_app_news` row without
/// an id is new and gets saved by a supervised task.
pub async fn update(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let group: SettingGroupModel = parse_body(body)?;
    require_type(&group)?;
    if group.list.is_empty() {
        return Err(GatehouseError::bad_request(
            "noSettingForUpdate",
            "Can not find setting for update!",
        ));
    }

    let owner = ctx.identity()?.user_id;
    let now = chrono::Utc::now().timestamp();
    let mut updates = Vec::new();

    for item in group.list {
        let row = UserSetting {
            object_id: item.object_id.unwrap_or_else(Uuid::new_v4),
            owner_user_id: owner,
            name: item.name,
            value: item.value,
            setting_type: group.setting_type.clone(),
            is_system: false,
            created_date: now,
        };

        match item.object_id {
            Some(_) => updates.push(row),
            None if row.name == SEND_EMAIL_APP_NEWS => {
                let settings = Arc::clone(&state.settings);
                state
                    .tasks
                    .spawn(format!("default-setting:{}:{}", owner, row.name), async move {
                        settings.save_many(vec![row]).await
                    });
            }
            None => debug!(name = %row.name, "Ignoring setting without id"),
        }
    }

    if !updates.is_empty() {
        state
            .settings
            .update_by_owner(owner, updates)
            .await
            .map_err(GatehouseError::Store)?;
    }

    Ok(ok_response())
}

/// DELETE /setting
pub async fn delete_all(state: &AppState, ctx: &RequestContext) -> Result<Response<Full<Bytes>>> {
    let owner = ctx.identity()?.user_id;
    state
        .settings
        .delete_by_owner(owner)
        .await
        .map_err(GatehouseError::Store)?;
    Ok(ok_response())
}

/// POST /setting/dto/ids
///
/// Flat map keyed `"{uid}:{type}:{name}"`, consumed by notification gating.
pub async fn by_user_ids(state: &AppState, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let model: GetSettingsModel = parse_body(body)?;
    if model.setting_type.trim().is_empty() {
        return Err(GatehouseError::bad_request(
            "settingTypeEmptyError",
            "Setting type can not be empty Error",
        ));
    }

    let rows = state
        .settings
        .find_by_owners(&model.user_ids, &model.setting_type)
        .await
        .map_err(GatehouseError::Store)?;

    let map: HashMap<String, String> = rows
        .into_iter()
        .map(|r| (setting_path(r.owner_user_id, &r.setting_type, &r.name), r.value))
        .collect();

    Ok(json_response(StatusCode::OK, &map))
}
