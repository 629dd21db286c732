//! Action room routes
//!
//! Rooms are the real-time channels a user's clients join. Dispatch forwards
//! a signed payload to a room; the remaining routes manage the room itself
//! and the access key clients present when joining.

use bytes::Bytes;
use http_body_util::Full;
use hyper::http::request::Parts;
use hyper::{Response, StatusCode};
use tracing::info;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::server::AppState;
use crate::types::{
    ActionRoom, ActionRoomModel, ActionVerifyModel, CreateActionRoomModel, GatehouseError, Result,
};

use super::{json_response, ok_response, parse_body, parse_uuid};

/// POST /actions/dispatch/{roomId}
///
/// Forwards the raw body to the real-time backend with the caller's signature.
pub async fn dispatch(
    state: &AppState,
    parts: &Parts,
    room_id: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    state.dispatch.forward(room_id, body, &parts.headers).await?;
    Ok(ok_response())
}

/// POST /actions/room
pub async fn create_room(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let model: CreateActionRoomModel = parse_body(body)?;
    let owner = ctx.identity()?.user_id;

    let room = ActionRoom {
        object_id: Uuid::new_v4(),
        owner_user_id: owner,
        private_key: model.private_key,
        access_key: model.access_key,
        status: model.status,
        created_date: chrono::Utc::now().timestamp(),
    };
    let object_id = room.object_id;

    state.rooms.save(room).await.map_err(GatehouseError::Store)?;

    info!(room = %object_id, owner = %owner, "Action room created");
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "objectId": object_id }),
    ))
}

/// PUT /actions/room
pub async fn update_room(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let model: ActionRoomModel = parse_body(body)?;
    let owner = ctx.identity()?.user_id;

    let room = ActionRoom {
        object_id: model.object_id,
        owner_user_id: owner,
        private_key: model.private_key,
        access_key: model.access_key,
        status: model.status,
        created_date: 0,
    };
    let updated = state
        .rooms
        .update_by_owner(owner, room)
        .await
        .map_err(GatehouseError::Store)?;

    if !updated {
        return Err(GatehouseError::NotFound("Action room".into()));
    }
    Ok(ok_response())
}

/// DELETE /actions/room/{roomId}
pub async fn delete_room(
    state: &AppState,
    ctx: &RequestContext,
    room_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let id = parse_uuid(room_id, "actionRoomIdRequired")?;
    let owner = ctx.identity()?.user_id;

    let deleted = state
        .rooms
        .delete_by_owner(owner, id)
        .await
        .map_err(GatehouseError::Store)?;

    if !deleted {
        return Err(GatehouseError::NotFound("Action room".into()));
    }
    Ok(ok_response())
}

/// PUT /actions/room/access-key
///
/// Rotates the caller's access key and returns the new one.
pub async fn set_access_key(
    state: &AppState,
    ctx: &RequestContext,
) -> Result<Response<Full<Bytes>>> {
    let owner = ctx.identity()?.user_id;
    let access_key = Uuid::new_v4().simple().to_string();

    state
        .rooms
        .set_access_key(owner, &access_key, chrono::Utc::now().timestamp())
        .await
        .map_err(GatehouseError::Store)?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "accessKey": access_key }),
    ))
}

/// GET /actions/room/access-key
pub async fn get_access_key(
    state: &AppState,
    ctx: &RequestContext,
) -> Result<Response<Full<Bytes>>> {
    let owner = ctx.identity()?.user_id;
    let access_key = state
        .rooms
        .access_key(owner)
        .await
        .map_err(GatehouseError::Store)?
        .ok_or_else(|| GatehouseError::NotFound("Access key".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "accessKey": access_key }),
    ))
}

/// POST /actions/room/verify
pub async fn verify_access_key(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let model: ActionVerifyModel = parse_body(body)?;
    let owner = ctx.identity()?.user_id;

    let stored = state
        .rooms
        .access_key(owner)
        .await
        .map_err(GatehouseError::Store)?;
    let is_verified = matches!(
        stored,
        Some(key) if !key.is_empty() && key == model.access_key
    );

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "isVerified": is_verified }),
    ))
}
