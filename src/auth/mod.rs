//! Authentication for Gatehouse
//!
//! Provides:
//! - Payload signatures shared between internal services
//! - Split-cookie session verification for browsers
//! - Identity propagation headers
//! - Per-route mode selection between the two verifiers

pub mod cookie;
pub mod identity;
pub mod mode;
pub mod signature;

pub use self::cookie::{
    session_cookie_header, CookieKey, CookieNames, SessionClaims, SessionRejection,
    SessionVerifier, UserClaim,
};
pub use self::identity::{AuthenticatedIdentity, IdentityHeaderError};
pub use self::mode::{AuthMode, Authenticator, RequestContext, Verifier};
pub use self::signature::{
    sign, sign_timestamped, verify, verify_timestamped, PayloadSecret, PayloadSigner,
    SignatureRejection, SignatureScheme, SCHEME_PREFIX, SIGNATURE_HEADER,
    SIGNATURE_TIMESTAMP_HEADER,
};
