//! Per-route authentication mode selection
//!
//! A request is verified by exactly one verifier. The choice is made once from
//! the route's `AuthMode` and the presence of the signature header, and is not
//! revisited while the request is handled.

use std::sync::Arc;

use hyper::HeaderMap;
use tracing::debug;

use crate::auth::{
    AuthenticatedIdentity, PayloadSigner, SessionVerifier, SIGNATURE_HEADER,
};
use crate::types::{GatehouseError, Result};

/// Which callers a route accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Trusted services only (signed payload)
    SignatureOnly,
    /// End users only (session cookie)
    CookieOnly,
    /// Either; a non-empty signature header takes precedence
    Either,
}

/// The verifier chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verifier {
    Signature,
    Cookie,
}

impl AuthMode {
    /// Pick the verifier for a request with these headers
    pub fn select(self, headers: &HeaderMap) -> Verifier {
        match self {
            Self::SignatureOnly => Verifier::Signature,
            Self::CookieOnly => Verifier::Cookie,
            Self::Either => {
                if has_signature(headers) {
                    Verifier::Signature
                } else {
                    Verifier::Cookie
                }
            }
        }
    }
}

fn has_signature(headers: &HeaderMap) -> bool {
    headers
        .get(SIGNATURE_HEADER)
        .map(|v| !v.as_bytes().is_empty())
        .unwrap_or(false)
}

/// Verified request context handed to route handlers
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub verified_by: Verifier,
    /// Identity from the session claims or from trusted identity headers
    pub identity: Option<AuthenticatedIdentity>,
}

impl RequestContext {
    /// The caller's identity, or `MissingIdentity` when the request carries none
    pub fn identity(&self) -> Result<&AuthenticatedIdentity> {
        self.identity.as_ref().ok_or(GatehouseError::MissingIdentity)
    }
}

/// Runs the verifier chosen by the route's mode
#[derive(Clone)]
pub struct Authenticator {
    signer: Arc<PayloadSigner>,
    sessions: SessionVerifier,
}

impl Authenticator {
    pub fn new(signer: Arc<PayloadSigner>, sessions: SessionVerifier) -> Self {
        Self { signer, sessions }
    }

    /// Verify a request before it reaches business logic.
    ///
    /// `body` must be the exact bytes received; the signature covers them.
    pub fn authenticate(
        &self,
        mode: AuthMode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<RequestContext> {
        let verifier = mode.select(headers);
        debug!(?mode, ?verifier, "Authenticating request");

        match verifier {
            Verifier::Signature => {
                self.signer
                    .verify_request(headers, body)
                    .map_err(|e| GatehouseError::Unauthenticated(e.to_string()))?;

                let identity = AuthenticatedIdentity::from_headers(headers)
                    .map_err(|e| GatehouseError::Unauthenticated(e.to_string()))?;

                Ok(RequestContext {
                    verified_by: verifier,
                    identity,
                })
            }
            Verifier::Cookie => {
                let identity = self
                    .sessions
                    .verify(headers)
                    .map_err(|e| GatehouseError::Unauthenticated(e.to_string()))?;

                Ok(RequestContext {
                    verified_by: verifier,
                    identity: Some(identity),
                })
            }
        }
    }
}
