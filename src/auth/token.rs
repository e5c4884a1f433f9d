//! Credential pair and access-token claim decoding.
//!
//! The access credential is a signed JWT issued by the backend. The client
//! never verifies it and never uses its claims for authorization; the
//! payload is only decoded to show who is signed in.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// An access credential together with the refresh credential that renews it.
///
/// Both halves are always present: a refresh credential without an access
/// credential is not an authenticated pair and cannot be constructed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Short-lived bearer token attached to every authorized request.
    #[serde(rename = "access_token")]
    pub access: String,
    /// Longer-lived token exchanged for a new access token.
    #[serde(rename = "refresh_token")]
    pub refresh: String,
}

impl CredentialPair {
    /// Create a pair, rejecting empty halves.
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Result<Self> {
        let access = access.into();
        let refresh = refresh.into();
        if access.trim().is_empty() {
            return Err(Error::InvalidCredentials(
                "access credential is empty".to_string(),
            ));
        }
        if refresh.trim().is_empty() {
            return Err(Error::InvalidCredentials(
                "refresh credential is empty".to_string(),
            ));
        }
        Ok(Self { access, refresh })
    }

    /// Build a pair from possibly-missing halves, as read back from storage.
    ///
    /// Returns `None` unless both halves are present and non-empty.
    pub fn from_parts(access: Option<String>, refresh: Option<String>) -> Option<Self> {
        match (access, refresh) {
            (Some(access), Some(refresh)) => Self::new(access, refresh).ok(),
            _ => None,
        }
    }

    /// Copy of this pair with a new access credential.
    ///
    /// A rotated refresh credential replaces the old one; otherwise the
    /// refresh half is kept as is.
    #[must_use]
    pub fn with_access(&self, access: impl Into<String>, rotated_refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh: rotated_refresh.unwrap_or_else(|| self.refresh.clone()),
        }
    }

    /// Subject decoded from the access credential, for display only.
    pub fn subject(&self) -> Option<String> {
        decode_subject(&self.access)
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &mask_token(&self.access))
            .field("refresh", &mask_token(&self.refresh))
            .finish()
    }
}

/// Claims we care about in the access token payload.
///
/// The backend issues `user_id`; `sub` is accepted for other issuers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub sub: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    /// Decode the payload segment of a JWT without verifying it.
    pub fn decode(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Display name of the token subject.
    pub fn subject(&self) -> Option<String> {
        self.sub
            .as_ref()
            .and_then(claim_to_string)
            .or_else(|| self.user_id.as_ref().and_then(claim_to_string))
    }
}

fn claim_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode the subject of an access credential. Failure is not an error.
pub fn decode_subject(access: &str) -> Option<String> {
    AccessClaims::decode(access).and_then(|claims| claims.subject())
}

/// Masks a token for safe logging, keeping a short prefix.
#[must_use]
pub fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}...({} chars)", token.len())
}

#[cfg(test)]
pub(crate) fn fake_jwt(payload: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}
