//! Signed calls to other internal services
//!
//! Every call is signed over the exact bytes that go on the wire, right
//! before sending. The response body is always read to the end, whatever the
//! status, so pooled connections are released cleanly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{AuthenticatedIdentity, PayloadSigner};
use crate::types::{GatehouseError, RelayError};

/// Characters of a signature that may appear in logs
const LOGGED_SIGNATURE_CHARS: usize = 12;

/// One outbound call
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    /// Relative path resolved against the internal gateway, or an absolute URL
    pub path: String,
    pub body: Bytes,
    pub headers: Vec<(String, String)>,
    /// Overrides the client's default deadline
    pub timeout: Option<Duration>,
}

impl RelayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Bytes::new(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` once; those bytes are what gets signed and sent
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, RelayError> {
        let bytes = serde_json::to_vec(value).map_err(|e| RelayError::Build(e.to_string()))?;
        Ok(self.body(bytes))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Propagate the caller's identity as plain headers
    pub fn identity(mut self, identity: &AuthenticatedIdentity) -> Self {
        for (name, value) in identity.header_pairs() {
            self.headers.push((name.to_string(), value));
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for signed inter-service calls
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    signer: Arc<PayloadSigner>,
    default_timeout: Duration,
}

impl RelayClient {
    pub fn new(
        base_url: impl Into<String>,
        signer: Arc<PayloadSigner>,
        default_timeout: Duration,
    ) -> Result<Self, GatehouseError> {
        let http = reqwest::Client::builder()
            .timeout(default_timeout)
            .build()
            .map_err(|e| GatehouseError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(http, base_url, signer, default_timeout))
    }

    /// Build on an existing pooled client
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        signer: Arc<PayloadSigner>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            signer,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Resolve a relative service path against the internal gateway
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a signed call and return the response body on 200 or 202
    pub async fn call(&self, request: RelayRequest) -> Result<Bytes, RelayError> {
        let RelayRequest {
            method,
            path,
            body,
            headers: extra,
            timeout,
        } = request;

        let url = self.resolve_url(&path);
        let url = reqwest::Url::parse(&url)
            .map_err(|e| RelayError::Build(format!("invalid URL {}: {}", url, e)))?;
        let timeout = timeout.unwrap_or(self.default_timeout);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RelayError::Build(format!("header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RelayError::Build(format!("header {} value: {}", name, e)))?;
            headers.insert(name, value);
        }

        // Signature last, over the bytes handed to the transport unchanged
        let signature_headers = self.signer.signature_headers(&body);
        let mut logged_signature = String::new();
        for (name, value) in signature_headers {
            if logged_signature.is_empty() {
                logged_signature = value.chars().take(LOGGED_SIGNATURE_CHARS).collect();
            }
            let value = HeaderValue::from_str(&value)
                .map_err(|e| RelayError::Build(format!("signature header: {}", e)))?;
            headers.insert(name, value);
        }

        let started = Instant::now();
        let result = self
            .http
            .request(method.clone(), url.clone())
            .timeout(timeout)
            .headers(headers)
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let err = RelayError::from_reqwest(err, timeout);
                warn!(
                    method = %method,
                    url = %url,
                    code = err.code(),
                    error = %err,
                    "Relay call failed before a response"
                );
                return Err(err);
            }
        };

        let status = response.status();
        let outcome = read_body(response, status, timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(bytes) => debug!(
                method = %method,
                url = %url,
                status = %status,
                elapsed_ms,
                size = bytes.len(),
                signature = %logged_signature,
                "Relay call succeeded"
            ),
            Err(err) => warn!(
                method = %method,
                url = %url,
                status = %status,
                elapsed_ms,
                code = err.code(),
                "Relay call failed"
            ),
        }

        outcome
    }

    /// Call and decode a JSON response
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        request: RelayRequest,
    ) -> Result<T, GatehouseError> {
        let bytes = self.call(request).await?;
        serde_json::from_slice(&bytes).map_err(|e| GatehouseError::Decode(e.to_string()))
    }
}

/// Whether a peer status counts as relay success
pub fn is_relay_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::ACCEPTED
}

// The body is drained on every status; a failed status wins over a failed read.
async fn read_body(
    response: reqwest::Response,
    status: StatusCode,
    timeout: Duration,
) -> Result<Bytes, RelayError> {
    let body = response.bytes().await;

    if !is_relay_success(status) {
        return Err(RelayError::PeerStatus(status));
    }

    body.map_err(|e| {
        if e.is_timeout() {
            RelayError::Timeout(timeout)
        } else {
            RelayError::ReadBody(e.to_string())
        }
    })
}
