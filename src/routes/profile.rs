//! Profile routes

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::server::AppState;
use crate::types::{GatehouseError, ProfileUpdateModel, Result, UpdateLastSeenModel, UserProfile};

use super::{json_response, ok_response, parse_body, parse_uuid};

async fn respond_with_profile(state: &AppState, id: Uuid) -> Result<Response<Full<Bytes>>> {
    let profile = state
        .profiles
        .find_by_id(id)
        .await
        .map_err(GatehouseError::Store)?
        .ok_or_else(|| GatehouseError::NotFound("Profile".into()))?;
    Ok(json_response(StatusCode::OK, &profile))
}

/// GET /profile/my
pub async fn my_profile(state: &AppState, ctx: &RequestContext) -> Result<Response<Full<Bytes>>> {
    respond_with_profile(state, ctx.identity()?.user_id).await
}

/// GET /profile/id/{userId}
pub async fn by_id(state: &AppState, user_id: &str) -> Result<Response<Full<Bytes>>> {
    respond_with_profile(state, parse_uuid(user_id, "userIdRequired")?).await
}

/// PUT /profile
///
/// Creates the caller's profile from their identity on first use, then
/// applies the fields present in the body.
pub async fn update(
    state: &AppState,
    ctx: &RequestContext,
    body: &[u8],
) -> Result<Response<Full<Bytes>>> {
    let model: ProfileUpdateModel = parse_body(body)?;
    let identity = ctx.identity()?;

    let mut profile = match state
        .profiles
        .find_by_id(identity.user_id)
        .await
        .map_err(GatehouseError::Store)?
    {
        Some(existing) => existing,
        None => UserProfile {
            object_id: identity.user_id,
            full_name: identity.display_name.clone(),
            social_name: String::new(),
            email: identity.username.clone(),
            avatar: identity.avatar.clone(),
            banner: String::new(),
            tagline: String::new(),
            follow_count: 0,
            follower_count: 0,
            last_seen: 0,
            created_date: chrono::Utc::now().timestamp(),
        },
    };
    model.apply(&mut profile);

    state
        .profiles
        .save(profile.clone())
        .await
        .map_err(GatehouseError::Store)?;
    Ok(json_response(StatusCode::OK, &profile))
}

/// PUT /profile/last-seen
pub async fn update_last_seen(state: &AppState, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let model: UpdateLastSeenModel = parse_body(body)?;

    let found = state
        .profiles
        .update_last_seen(model.user_id, chrono::Utc::now().timestamp())
        .await
        .map_err(GatehouseError::Store)?;

    if !found {
        return Err(GatehouseError::bad_request(
            "updateLastSeen",
            "Error happened while updating last seen",
        ));
    }
    Ok(ok_response())
}

/// POST /profile/index
pub async fn create_index(state: &AppState) -> Result<Response<Full<Bytes>>> {
    state
        .profiles
        .create_index()
        .await
        .map_err(GatehouseError::Store)?;
    Ok(ok_response())
}

#[derive(Debug, Clone, Copy)]
pub enum Counter {
    Follow,
    Follower,
}

/// PUT /profile/{follow|follower}/inc/{inc}/{userId}
pub async fn increment(
    state: &AppState,
    counter: Counter,
    inc: &str,
    user_id: &str,
) -> Result<Response<Full<Bytes>>> {
    let user_id = parse_uuid(user_id, "userIdRequired")?;
    let inc: i64 = inc
        .parse()
        .map_err(|_| GatehouseError::bad_request("invalidIncParam", "Wrong inc param!"))?;

    let found = match counter {
        Counter::Follow => state.profiles.increment_follow_count(user_id, inc).await,
        Counter::Follower => state.profiles.increment_follower_count(user_id, inc).await,
    }
    .map_err(GatehouseError::Store)?;

    if !found {
        return Err(GatehouseError::NotFound("Profile".into()));
    }
    Ok(ok_response())
}
