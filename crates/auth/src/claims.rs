//! Identity-token claims as issued by the identity provider.
//!
//! Claims are read-only input. Two shapes are accepted: the typed
//! [`IdentityClaims`] (serde, for tokens decoded straight into a struct) and a
//! raw [`ClaimMap`] as produced by a verifier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw claim-name → value mapping of a decoded token payload.
pub type ClaimMap = serde_json::Map<String, Value>;

/// Claim names used by the Cognito user pool.
pub mod names {
    pub const SUBJECT: &str = "sub";
    pub const EMAIL: &str = "email";
    pub const USERNAME: &str = "cognito:username";
    pub const GIVEN_NAME: &str = "given_name";
    pub const FAMILY_NAME: &str = "family_name";
    pub const EMAIL_VERIFIED: &str = "email_verified";
    pub const GROUPS: &str = "cognito:groups";
    pub const BETRIEB_ID: &str = "custom:betrieb_id";
    pub const BETRIEB_NAME: &str = "custom:betrieb_name";
}

/// The subset of token claims the platform derives an identity from.
///
/// Every field is optional at this layer; which ones are mandatory is decided
/// by [`crate::extract`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "cognito:username", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(rename = "cognito:groups", default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,

    #[serde(rename = "custom:betrieb_id", default, skip_serializing_if = "Option::is_none")]
    pub betrieb_id: Option<String>,

    #[serde(rename = "custom:betrieb_name", default, skip_serializing_if = "Option::is_none")]
    pub betrieb_name: Option<String>,
}

impl IdentityClaims {
    /// Read the identity claims out of a raw claim map.
    ///
    /// Lenient per claim: a value of an unexpected shape is treated as absent
    /// instead of failing the whole read.
    pub fn from_claim_map(map: &ClaimMap) -> Self {
        Self {
            sub: string_claim(map, names::SUBJECT),
            email: string_claim(map, names::EMAIL),
            username: string_claim(map, names::USERNAME),
            given_name: string_claim(map, names::GIVEN_NAME),
            family_name: string_claim(map, names::FAMILY_NAME),
            email_verified: bool_claim(map, names::EMAIL_VERIFIED),
            groups: list_claim(map, names::GROUPS),
            betrieb_id: string_claim(map, names::BETRIEB_ID),
            betrieb_name: string_claim(map, names::BETRIEB_NAME),
        }
    }
}

fn string_claim(map: &ClaimMap, name: &str) -> Option<String> {
    match map.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Cognito emits `email_verified` as a JSON bool for native users and as the
// string "true"/"false" for federated ones.
fn bool_claim(map: &ClaimMap, name: &str) -> Option<bool> {
    match map.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn list_claim(map: &ClaimMap, name: &str) -> Option<Vec<String>> {
    match map.get(name)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        ),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}
