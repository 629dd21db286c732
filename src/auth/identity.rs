//! Authenticated identity and its propagation as plain headers
//!
//! Identity headers are advisory context. They are only trusted on a request
//! that itself passed signature or cookie verification; nothing here proves
//! who the user is.

use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UID_HEADER: &str = "uid";
pub const EMAIL_HEADER: &str = "email";
pub const AVATAR_HEADER: &str = "avatar";
pub const DISPLAY_NAME_HEADER: &str = "displayName";
pub const ROLE_HEADER: &str = "role";

/// User on whose behalf a request runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    pub user_id: Uuid,
    /// Login name, which is the user's email
    pub username: String,
    pub display_name: String,
    pub avatar: String,
    pub system_role: String,
}

/// Identity headers were present but unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identity header {header}")]
pub struct IdentityHeaderError {
    pub header: &'static str,
}

impl AuthenticatedIdentity {
    /// Header pairs carrying this identity to another service
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (UID_HEADER, self.user_id.to_string()),
            (EMAIL_HEADER, self.username.clone()),
            (AVATAR_HEADER, self.avatar.clone()),
            (DISPLAY_NAME_HEADER, self.display_name.clone()),
            (ROLE_HEADER, self.system_role.clone()),
        ]
    }

    /// Read identity headers supplied by a trusted caller.
    ///
    /// No `uid` header means the caller acts as a service, not for a user.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, IdentityHeaderError> {
        let Some(uid) = header_text(headers, UID_HEADER)? else {
            return Ok(None);
        };
        let user_id = Uuid::parse_str(uid.trim()).map_err(|_| IdentityHeaderError {
            header: UID_HEADER,
        })?;

        Ok(Some(Self {
            user_id,
            username: header_text(headers, EMAIL_HEADER)?.unwrap_or_default(),
            avatar: header_text(headers, AVATAR_HEADER)?.unwrap_or_default(),
            display_name: header_text(headers, DISPLAY_NAME_HEADER)?.unwrap_or_default(),
            system_role: header_text(headers, ROLE_HEADER)?.unwrap_or_default(),
        }))
    }
}

// Display names may carry UTF-8, which HeaderValue::to_str refuses.
fn header_text(
    headers: &HeaderMap,
    name: &'static str,
) -> Result<Option<String>, IdentityHeaderError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => std::str::from_utf8(value.as_bytes())
            .map(|s| Some(s.to_string()))
            .map_err(|_| IdentityHeaderError { header: name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderName, HeaderValue};

    fn alice() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            user_id: Uuid::new_v4(),
            username: "alice@example.com".into(),
            display_name: "Alice Ünal".into(),
            avatar: "https://cdn.example.com/a.png".into(),
            system_role: "user".into(),
        }
    }

    fn to_map(pairs: Vec<(&'static str, String)>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_headers_carry_identity_across() {
        let identity = alice();
        let headers = to_map(identity.header_pairs());
        assert_eq!(AuthenticatedIdentity::from_headers(&headers), Ok(Some(identity)));
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let headers = to_map(alice().header_pairs());
        assert!(headers.get("DisplayName").is_some());
        assert!(headers.get("UID").is_some());
    }

    #[test]
    fn test_no_uid_means_no_identity() {
        let mut headers = HeaderMap::new();
        headers.insert("email", HeaderValue::from_static("x@example.com"));
        assert_eq!(AuthenticatedIdentity::from_headers(&headers), Ok(None));
    }

    #[test]
    fn test_bad_uid_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("uid", HeaderValue::from_static("not-a-uuid"));
        assert_eq!(
            AuthenticatedIdentity::from_headers(&headers),
            Err(IdentityHeaderError { header: UID_HEADER })
        );
    }
}
