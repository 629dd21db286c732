//! Error types for Gatehouse
//!
//! Every failure that reaches a caller is rendered as `{code, message}` JSON.
//! The `code` is stable and machine readable; the `message` is written here and
//! never copied from a downstream service.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Main error type for Gatehouse operations
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    #[error("Bad request ({code}): {message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("No authenticated identity on request")]
    MissingIdentity,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    /// Shorthand for a 400 with a stable code
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. } => *code,
            Self::Unauthenticated(_) => "unauthenticated",
            Self::MissingIdentity => "invalidCurrentUser",
            Self::NotFound(_) => "notFound",
            Self::Relay(e) => e.code(),
            Self::Decode(_) => "decode",
            Self::Store(_) => "internal/store",
            Self::Config(_) => "internal/config",
            Self::Internal(_) => "internal",
        }
    }

    /// Message that is safe to show to the original caller
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } => message.clone(),
            Self::Unauthenticated(_) => "Request is not authenticated".to_string(),
            Self::MissingIdentity => "Can not get current user".to_string(),
            Self::NotFound(what) => format!("{} not found", what),
            Self::Relay(e) => e.public_message().to_string(),
            Self::Decode(_) => "Error happened while decoding a service response".to_string(),
            Self::Store(_) => "Error happened while accessing storage".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal error".to_string(),
        }
    }

    /// Render as a `{code, message}` JSON response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status_code();
        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };
        let json = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }
}

/// Error body returned to callers
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Failure of an outbound relay call, classified by the leg that failed
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The request could not be constructed (bad URL, bad header value)
    #[error("failed to build request: {0}")]
    Build(String),

    /// The peer did not answer within the deadline
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// DNS, connect or I/O failure before a status was received
    #[error("network failure: {0}")]
    Network(String),

    /// The peer answered with a status other than 200 or 202
    #[error("peer answered with status {0}")]
    PeerStatus(StatusCode),

    /// The status was fine but the body could not be read
    #[error("failed to read response body: {0}")]
    ReadBody(String),
}

impl RelayError {
    /// Machine-stable code naming the failed leg
    pub fn code(&self) -> &'static str {
        match self {
            Self::Build(_) => "relay/buildRequest",
            Self::Timeout(_) => "relay/timeout",
            Self::Network(_) => "relay/network",
            Self::PeerStatus(_) => "relay/peerStatus",
            Self::ReadBody(_) => "relay/readBody",
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Build(_) => "Error while creating internal request",
            Self::Timeout(_) => "Internal service did not respond in time",
            Self::Network(_) => "Error while sending internal request",
            Self::PeerStatus(_) => "Internal service rejected the request",
            Self::ReadBody(_) => "Error while reading internal response",
        }
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::Build(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatehouseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for GatehouseError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<hyper::Error> for GatehouseError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for Gatehouse operations
pub type Result<T> = std::result::Result<T, GatehouseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatehouseError::bad_request("parseUUID", "Can not parse UUID!").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GatehouseError::MissingIdentity.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GatehouseError::Relay(RelayError::PeerStatus(StatusCode::SERVICE_UNAVAILABLE))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_relay_codes_name_the_leg() {
        assert_eq!(RelayError::Build("x".into()).code(), "relay/buildRequest");
        assert_eq!(RelayError::Timeout(Duration::from_secs(1)).code(), "relay/timeout");
        assert_eq!(RelayError::Network("x".into()).code(), "relay/network");
        assert_eq!(
            RelayError::PeerStatus(StatusCode::BAD_GATEWAY).code(),
            "relay/peerStatus"
        );
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = GatehouseError::Store("connection reset by mongo-0.internal:27017".into());
        assert!(!err.public_message().contains("mongo-0"));

        let err = GatehouseError::Relay(RelayError::Network("dns error: setting.svc".into()));
        assert!(!err.public_message().contains("setting.svc"));
    }

    #[tokio::test]
    async fn test_into_response_body_shape() {
        let response = GatehouseError::bad_request("roomIdRequired", "Room id is required!")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "roomIdRequired");
        assert_eq!(json["message"], "Room id is required!");
    }
}
