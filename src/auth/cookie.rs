//! Session cookie verification for browser requests
//!
//! The session JWT is split across three cookies (header, payload, signature
//! segments) so no single cookie holds a usable token. A plain
//! `Authorization: Bearer <jwt>` header is accepted as well for non-browser
//! clients.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use hyper::header::{AUTHORIZATION, COOKIE};
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedIdentity;
use crate::types::GatehouseError;

/// Key material used to check session token signatures
#[derive(Debug, Clone)]
pub enum CookieKey {
    /// HS256 shared secret
    Hs256(String),
    /// ES256 public key in PEM form
    Es256Pem(String),
}

/// Names of the three cookies carrying the JWT segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub header: String,
    pub payload: String,
    pub signature: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            header: "he".to_string(),
            payload: "pa".to_string(),
            signature: "si".to_string(),
        }
    }
}

/// Claims stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub claim: UserClaim,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,
}

/// User fields inside the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaim {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub role: String,
}

impl From<UserClaim> for AuthenticatedIdentity {
    fn from(claim: UserClaim) -> Self {
        Self {
            user_id: claim.uid,
            username: claim.email,
            display_name: claim.display_name,
            avatar: claim.avatar,
            system_role: claim.role,
        }
    }
}

/// Why a session was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionRejection {
    #[error("no session token on request")]
    Missing,
    #[error("session token expired")]
    Expired,
    #[error("session token invalid")]
    Invalid,
}

/// Verifies session tokens from cookies or bearer header
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
    names: CookieNames,
}

impl SessionVerifier {
    pub fn new(key: CookieKey, names: CookieNames) -> Result<Self, GatehouseError> {
        let (key, algorithm) = match key {
            CookieKey::Hs256(secret) => {
                if secret.is_empty() {
                    return Err(GatehouseError::Config("cookie secret is empty".into()));
                }
                (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
            }
            CookieKey::Es256Pem(pem) => {
                let key = DecodingKey::from_ec_pem(pem.as_bytes()).map_err(|e| {
                    GatehouseError::Config(format!("invalid cookie public key: {}", e))
                })?;
                (key, Algorithm::ES256)
            }
        };

        Ok(Self {
            key,
            validation: Validation::new(algorithm),
            names,
        })
    }

    /// Reassemble the session token from cookies, falling back to a bearer header
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let header = cookie_value(headers, &self.names.header);
        let payload = cookie_value(headers, &self.names.payload);
        let signature = cookie_value(headers, &self.names.signature);

        if let (Some(h), Some(p), Some(s)) = (header, payload, signature) {
            return Some(format!("{}.{}.{}", h, p, s));
        }

        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// Verify the request's session and return the identity it carries
    pub fn verify(&self, headers: &HeaderMap) -> Result<AuthenticatedIdentity, SessionRejection> {
        let token = self
            .token_from_headers(headers)
            .ok_or(SessionRejection::Missing)?;
        self.verify_token(&token)
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedIdentity, SessionRejection> {
        match decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims.claim.into()),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                match err.kind() {
                    ErrorKind::ExpiredSignature => Err(SessionRejection::Expired),
                    _ => Err(SessionRejection::Invalid),
                }
            }
        }
    }
}

/// Split a token into the `Cookie` header value a browser would send
pub fn session_cookie_header(token: &str, names: &CookieNames) -> Option<String> {
    let mut parts = token.splitn(3, '.');
    let (h, p, s) = (parts.next()?, parts.next()?, parts.next()?);
    Some(format!(
        "{}={}; {}={}; {}={}",
        names.header, h, names.payload, p, names.signature, s
    ))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
