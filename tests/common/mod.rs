//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use clap::Parser;
use gatehouse::auth::{
    AuthenticatedIdentity, CookieNames, PayloadSecret, PayloadSigner, SessionClaims,
    SignatureScheme, UserClaim,
};
use gatehouse::config::Args;
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

pub const PAYLOAD_SECRET: &str = "integration-payload-secret";
pub const JWT_SECRET: &str = "integration-cookie-secret";

pub fn secret() -> PayloadSecret {
    PayloadSecret::new(PAYLOAD_SECRET)
}

pub fn signer() -> Arc<PayloadSigner> {
    Arc::new(PayloadSigner::new(secret(), SignatureScheme::BodyOnly))
}

pub fn alice() -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        user_id: Uuid::parse_str("0b0f4c4e-8f7e-4c52-9d4f-6a1c3e2d5b10").unwrap(),
        username: "alice@example.com".into(),
        display_name: "Alice".into(),
        avatar: "https://cdn.example.com/alice.png".into(),
        system_role: "admin".into(),
    }
}

pub fn bob() -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        user_id: Uuid::parse_str("7d2e91a3-5c44-4f0e-b1d8-2e6f9a0c3b47").unwrap(),
        username: "bob@example.com".into(),
        display_name: "Bob".into(),
        avatar: "https://cdn.example.com/bob.png".into(),
        system_role: "user".into(),
    }
}

/// Arguments pointing the relay and dispatch backends at test servers
pub fn args(internal_gateway: &str, websocket_server_url: &str, extra: &[&str]) -> Args {
    let mut argv = vec![
        "gatehouse",
        "--payload-secret",
        PAYLOAD_SECRET,
        "--jwt-secret",
        JWT_SECRET,
        "--internal-gateway",
        internal_gateway,
        "--websocket-server-url",
        websocket_server_url,
        "--gateway",
        "https://gateway.example.com",
        "--relay-timeout-ms",
        "2000",
    ];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

/// A browser session for `identity` as a `Cookie` header value
pub fn session_cookie(identity: &AuthenticatedIdentity) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        claim: UserClaim {
            uid: identity.user_id,
            email: identity.username.clone(),
            display_name: identity.display_name.clone(),
            avatar: identity.avatar.clone(),
            role: identity.system_role.clone(),
        },
        exp: (now + 3600) as u64,
        iat: now as u64,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    gatehouse::auth::session_cookie_header(&token, &CookieNames::default()).unwrap()
}
