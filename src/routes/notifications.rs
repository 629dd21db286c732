//! Notification routes
//!
//! Creating a notification stores it first. The email gate then runs as a
//! supervised task, so a settings or mail failure never fails the write.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::info;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::server::AppState;
use crate::services::NotificationEvent;
use crate::types::{CreateNotificationModel, GatehouseError, Notification, Result};

use super::{json_response, ok_response, parse_body, parse_uuid, query_param};

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

/// POST /notifications
pub async fn create(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let model: CreateNotificationModel = parse_body(body)?;
    let actor = ctx.identity()?.clone();

    let title = if model.title.trim().is_empty() {
        model.kind.title(&actor.display_name)
    } else {
        model.title.clone()
    };

    let notification = Notification {
        // Always minted server-side
        object_id: Uuid::new_v4(),
        owner_user_id: actor.user_id,
        owner_display_name: actor.display_name.clone(),
        owner_avatar: actor.avatar.clone(),
        title,
        description: model.description,
        url: model.url.clone(),
        notify_receiver_user_id: model.notify_receiver_user_id,
        target_id: model.target_id,
        is_seen: false,
        kind: model.kind,
        email_notification: model.email_notification,
        created_date: chrono::Utc::now().timestamp(),
    };
    let object_id = notification.object_id;

    state
        .notifications
        .save(notification)
        .await
        .map_err(GatehouseError::Store)?;

    if model.email_notification {
        let event = NotificationEvent {
            kind: model.kind,
            actor_display_name: actor.display_name.clone(),
            recipient_id: model.notify_receiver_user_id,
            recipient_email: model.notify_receiver_email,
            target_id: model.target_id,
            url: model.url,
        };
        let gate = Arc::clone(&state.gate);
        state.tasks.spawn(format!("notification-email:{}", object_id), async move {
            gate.process(&event, &actor)
                .await
                .map(|_| ())
                .map_err(|e| format!("{}: {}", e.code(), e))
        });
    }

    info!(notification = %object_id, "Notification created");
    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({ "objectId": object_id }),
    ))
}

/// GET /notifications?page=&limit=
pub async fn list(
    state: &AppState,
    ctx: &RequestContext,
    query: Option<&str>,
) -> Result<Response<Full<Bytes>>> {
    let page = match query_param(query, "page") {
        None | Some("") => 1,
        Some(v) => v
            .parse::<u64>()
            .map_err(|_| GatehouseError::bad_request("queryParser", "Error happened while parsing query!"))?,
    };
    let limit = match query_param(query, "limit") {
        None | Some("") => DEFAULT_PAGE_SIZE,
        Some(v) => v
            .parse::<u64>()
            .map_err(|_| GatehouseError::bad_request("queryParser", "Error happened while parsing query!"))?
            .clamp(1, MAX_PAGE_SIZE),
    };

    let receiver = ctx.identity()?.user_id;
    let found = state
        .notifications
        .find_by_receiver(receiver, page, limit)
        .await
        .map_err(GatehouseError::Store)?;

    Ok(json_response(StatusCode::OK, &found))
}

/// PUT /notifications/seen/{id}
pub async fn seen(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let id = parse_uuid(id, "notificationIdRequired")?;
    let receiver = ctx.identity()?.user_id;

    let updated = state
        .notifications
        .mark_seen(id, receiver)
        .await
        .map_err(GatehouseError::Store)?;
    if !updated {
        return Err(GatehouseError::NotFound("Notification".into()));
    }
    Ok(ok_response())
}

/// PUT /notifications/seen
pub async fn seen_all(state: &AppState, ctx: &RequestContext) -> Result<Response<Full<Bytes>>> {
    let receiver = ctx.identity()?.user_id;
    state
        .notifications
        .mark_all_seen(receiver)
        .await
        .map_err(GatehouseError::Store)?;
    Ok(ok_response())
}

/// DELETE /notifications/id/{id}
pub async fn delete(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
) -> Result<Response<Full<Bytes>>> {
    let id = parse_uuid(id, "notificationIdRequired")?;
    let owner = ctx.identity()?.user_id;

    let removed = state
        .notifications
        .delete_by_owner(owner, id)
        .await
        .map_err(GatehouseError::Store)?;
    if !removed {
        return Err(GatehouseError::NotFound("Notification".into()));
    }
    Ok(ok_response())
}

/// DELETE /notifications/my
pub async fn delete_mine(state: &AppState, ctx: &RequestContext) -> Result<Response<Full<Bytes>>> {
    let owner = ctx.identity()?.user_id;
    state
        .notifications
        .delete_all_by_owner(owner)
        .await
        .map_err(GatehouseError::Store)?;
    Ok(ok_response())
}
