//! HTTP route handlers for Gatehouse
//!
//! `Route::resolve` maps a method and path to a route; every route but
//! `/health` declares the `AuthMode` its callers must satisfy.

pub mod actions;
pub mod admin;
pub mod health;
pub mod notifications;
pub mod profile;
pub mod setting;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthMode;
use crate::types::{GatehouseError, Result};

pub use health::{health_check, HealthResponse};

/// A resolved route with its path parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    Dispatch { room_id: String },
    CreateActionRoom,
    UpdateActionRoom,
    DeleteActionRoom { room_id: String },
    SetAccessKey,
    GetAccessKey,
    VerifyAccessKey,
    CreateNotification,
    ListNotifications,
    SeenNotification { id: String },
    SeenAllNotifications,
    DeleteNotification { id: String },
    DeleteMyNotifications,
    GetSettings,
    CreateSettings,
    UpdateSettings,
    DeleteSettings,
    SettingsByIds,
    MyProfile,
    UpdateProfile,
    UpdateLastSeen,
    ProfileById { user_id: String },
    ProfileIndex,
    FollowCount { inc: String, user_id: String },
    FollowerCount { inc: String, user_id: String },
    AdminSetup,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        let route = match (method, segments.as_slice()) {
            (&Method::GET, ["health"]) | (&Method::GET, ["healthz"]) => Self::Health,

            (&Method::POST, ["actions", "dispatch"]) => Self::Dispatch {
                room_id: String::new(),
            },
            (&Method::POST, ["actions", "dispatch", room]) => Self::Dispatch {
                room_id: decode_segment(room),
            },
            (&Method::POST, ["actions", "room"]) => Self::CreateActionRoom,
            (&Method::PUT, ["actions", "room"]) => Self::UpdateActionRoom,
            (&Method::PUT, ["actions", "room", "access-key"]) => Self::SetAccessKey,
            (&Method::GET, ["actions", "room", "access-key"]) => Self::GetAccessKey,
            (&Method::POST, ["actions", "room", "verify"]) => Self::VerifyAccessKey,
            (&Method::DELETE, ["actions", "room", room]) => Self::DeleteActionRoom {
                room_id: decode_segment(room),
            },

            (&Method::POST, ["notifications"]) => Self::CreateNotification,
            (&Method::GET, ["notifications"]) => Self::ListNotifications,
            (&Method::PUT, ["notifications", "seen"]) => Self::SeenAllNotifications,
            (&Method::PUT, ["notifications", "seen", id]) => Self::SeenNotification {
                id: decode_segment(id),
            },
            (&Method::DELETE, ["notifications", "id", id]) => Self::DeleteNotification {
                id: decode_segment(id),
            },
            (&Method::DELETE, ["notifications", "my"]) => Self::DeleteMyNotifications,

            (&Method::GET, ["setting"]) => Self::GetSettings,
            (&Method::POST, ["setting"]) => Self::CreateSettings,
            (&Method::PUT, ["setting"]) => Self::UpdateSettings,
            (&Method::DELETE, ["setting"]) => Self::DeleteSettings,
            (&Method::POST, ["setting", "dto", "ids"]) => Self::SettingsByIds,

            (&Method::GET, ["profile", "my"]) => Self::MyProfile,
            (&Method::PUT, ["profile"]) => Self::UpdateProfile,
            (&Method::PUT, ["profile", "last-seen"]) => Self::UpdateLastSeen,
            (&Method::GET, ["profile", "id", user_id]) => Self::ProfileById {
                user_id: decode_segment(user_id),
            },
            (&Method::POST, ["profile", "index"]) => Self::ProfileIndex,
            (&Method::PUT, ["profile", "follow", "inc", inc, user_id]) => Self::FollowCount {
                inc: decode_segment(inc),
                user_id: decode_segment(user_id),
            },
            (&Method::PUT, ["profile", "follower", "inc", inc, user_id]) => Self::FollowerCount {
                inc: decode_segment(inc),
                user_id: decode_segment(user_id),
            },

            (&Method::POST, ["admin", "setup"]) => Self::AdminSetup,

            _ => return None,
        };
        Some(route)
    }

    /// Service that owns the route; `None` is always mounted
    pub fn service(&self) -> Option<&'static str> {
        match self {
            Self::Health => None,
            Self::Dispatch { .. }
            | Self::CreateActionRoom
            | Self::UpdateActionRoom
            | Self::DeleteActionRoom { .. }
            | Self::SetAccessKey
            | Self::GetAccessKey
            | Self::VerifyAccessKey => Some("actions"),
            Self::CreateNotification
            | Self::ListNotifications
            | Self::SeenNotification { .. }
            | Self::SeenAllNotifications
            | Self::DeleteNotification { .. }
            | Self::DeleteMyNotifications => Some("notifications"),
            Self::GetSettings
            | Self::CreateSettings
            | Self::UpdateSettings
            | Self::DeleteSettings
            | Self::SettingsByIds => Some("setting"),
            Self::MyProfile
            | Self::UpdateProfile
            | Self::UpdateLastSeen
            | Self::ProfileById { .. }
            | Self::ProfileIndex
            | Self::FollowCount { .. }
            | Self::FollowerCount { .. } => Some("profile"),
            Self::AdminSetup => Some("admin"),
        }
    }

    /// Callers accepted by the route; `None` means unauthenticated
    pub fn auth_mode(&self) -> Option<AuthMode> {
        match self {
            Self::Health => None,

            Self::Dispatch { .. }
            | Self::CreateActionRoom
            | Self::DeleteActionRoom { .. }
            | Self::UpdateLastSeen
            | Self::SettingsByIds
            | Self::ProfileIndex
            | Self::FollowCount { .. }
            | Self::FollowerCount { .. } => Some(AuthMode::SignatureOnly),

            Self::ListNotifications
            | Self::UpdateSettings
            | Self::DeleteSettings
            | Self::MyProfile
            | Self::AdminSetup => Some(AuthMode::CookieOnly),

            Self::CreateNotification
            | Self::SeenNotification { .. }
            | Self::SeenAllNotifications
            | Self::DeleteNotification { .. }
            | Self::DeleteMyNotifications
            | Self::GetSettings
            | Self::CreateSettings
            | Self::UpdateActionRoom
            | Self::SetAccessKey
            | Self::GetAccessKey
            | Self::VerifyAccessKey
            | Self::UpdateProfile
            | Self::ProfileById { .. } => Some(AuthMode::Either),
        }
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// JSON response with CORS header
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Empty 200
pub fn ok_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Parse a JSON request body
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting unparsable body");
        GatehouseError::bad_request("parseModel", "Error happened while parsing model!")
    })
}

/// Parse a required UUID path parameter
pub fn parse_uuid(value: &str, required_code: &'static str) -> Result<Uuid> {
    if value.trim().is_empty() {
        return Err(GatehouseError::bad_request(required_code, "Id is required!"));
    }
    Uuid::parse_str(value.trim())
        .map_err(|_| GatehouseError::bad_request("parseUUID", "Can not parse UUID!"))
}

/// Look up a query string parameter
pub fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
