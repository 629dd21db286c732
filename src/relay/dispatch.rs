//! Opaque forwarding of room dispatches to the real-time backend
//!
//! The payload is neither parsed nor re-signed. The caller's signature headers
//! travel unchanged and `ORIGIN` names the public gateway.

use std::time::{Duration, Instant};

use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::HeaderMap;
use tracing::{debug, warn};

use crate::auth::{SIGNATURE_HEADER, SIGNATURE_TIMESTAMP_HEADER};
use crate::relay::client::is_relay_success;
use crate::types::{GatehouseError, RelayError};

/// Header naming the public gateway on forwarded dispatches
pub const ORIGIN_HEADER: &str = "ORIGIN";

/// Forwards dispatch bodies to `{websocket}/api/dispatch/{roomId}`
#[derive(Clone)]
pub struct DispatchForwarder {
    http: reqwest::Client,
    websocket_url: String,
    gateway: String,
    timeout: Duration,
}

impl DispatchForwarder {
    pub fn new(
        http: reqwest::Client,
        websocket_url: impl Into<String>,
        gateway: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            websocket_url: websocket_url.into(),
            gateway: gateway.into(),
            timeout,
        }
    }

    pub fn dispatch_url(&self, room_id: &str) -> String {
        format!(
            "{}/api/dispatch/{}",
            self.websocket_url.trim_end_matches('/'),
            urlencoding::encode(room_id)
        )
    }

    /// Forward `body` to the room's dispatch endpoint
    pub async fn forward(
        &self,
        room_id: &str,
        body: Bytes,
        inbound: &HeaderMap,
    ) -> Result<(), GatehouseError> {
        if room_id.trim().is_empty() {
            return Err(GatehouseError::bad_request(
                "actionRoomIdRequired",
                "ActionRoom Id is required!",
            ));
        }

        let url = self.dispatch_url(room_id);
        let url = reqwest::Url::parse(&url)
            .map_err(|e| RelayError::Build(format!("invalid dispatch URL {}: {}", url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for name in [SIGNATURE_HEADER, SIGNATURE_TIMESTAMP_HEADER] {
            if let Some(value) = inbound.get(name) {
                headers.insert(name, value.clone());
            }
        }
        let origin = HeaderValue::from_str(&self.gateway)
            .map_err(|e| RelayError::Build(format!("gateway header: {}", e)))?;
        headers.insert(ORIGIN_HEADER, origin);

        let size = body.len();
        let started = Instant::now();
        let response = self
            .http
            .post(url.clone())
            .timeout(self.timeout)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let err = RelayError::from_reqwest(e, self.timeout);
                warn!(room_id = %room_id, url = %url, code = err.code(), "Dispatch failed");
                err
            })?;

        let status = response.status();
        // Drain before classifying
        let _ = response.bytes().await;

        if !is_relay_success(status) {
            warn!(room_id = %room_id, status = %status, "Dispatch rejected by backend");
            return Err(RelayError::PeerStatus(status).into());
        }

        debug!(
            room_id = %room_id,
            status = %status,
            size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dispatch forwarded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder() -> DispatchForwarder {
        DispatchForwarder::new(
            reqwest::Client::new(),
            "http://ws.internal:3001/",
            "https://social.example.com",
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_dispatch_url_encodes_room() {
        let f = forwarder();
        assert_eq!(f.dispatch_url("r1"), "http://ws.internal:3001/api/dispatch/r1");
        assert_eq!(
            f.dispatch_url("a/b c"),
            "http://ws.internal:3001/api/dispatch/a%2Fb%20c"
        );
    }

    #[tokio::test]
    async fn test_empty_room_rejected_before_sending() {
        let err = forwarder()
            .forward("  ", Bytes::from_static(b"{}"), &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "actionRoomIdRequired");
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
    }
}
