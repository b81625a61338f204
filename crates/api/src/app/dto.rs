use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bau_auth::{Identity, UserRole};
use bau_core::{BetriebId, DomainError, DomainResult, UserId};

use crate::idp::{AttributeUpdate, AuthenticationResult};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username is required"));
        }
        if self.password.is_empty() {
            return Err(DomainError::validation("password is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.current_password.is_empty() {
            return Err(DomainError::validation("current_password is required"));
        }
        if self.new_password.is_empty() {
            return Err(DomainError::validation("new_password is required"));
        }
        if self.new_password == self.current_password {
            return Err(DomainError::validation("new_password must differ from current_password"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    /// Trimmed attribute update; blank values count as absent.
    pub fn into_update(self) -> DomainResult<AttributeUpdate> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let update = AttributeUpdate {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            email: clean(self.email),
        };

        if update.is_empty() {
            return Err(DomainError::validation("at least one attribute is required"));
        }
        if update.email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(DomainError::validation("email is not valid"));
        }
        Ok(update)
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Profile projection of an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub betrieb_id: Option<BetriebId>,
    pub betrieb_name: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            betrieb_id: identity.betrieb_id,
            betrieb_name: identity.betrieb_name.clone(),
            role: identity.role,
            email_verified: identity.email_verified,
            created_at: identity.created_at,
            last_login_at: identity.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
    pub user: UserProfile,
}

impl LoginResponse {
    pub fn new(tokens: AuthenticationResult, identity: &Identity) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            expires_in: tokens.expires_in,
            token_type: "Bearer",
            user: UserProfile::from(identity),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub betrieb_id: BetriebId,
    pub betrieb_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bau_auth::{extract, IdentityClaims};

    #[test]
    fn profile_json_shape() {
        let claims = IdentityClaims {
            sub: Some("5f0c4a8e-3b1d-4c2e-9a7f-1b2c3d4e5f60".to_string()),
            email: Some("polier@bau.ch".to_string()),
            groups: Some(vec!["Administrators".to_string()]),
            ..Default::default()
        };
        let now = DateTime::parse_from_rfc3339("2025-03-01T07:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let identity = extract(&claims, now).unwrap();

        let json = serde_json::to_value(UserProfile::from(&identity)).unwrap();

        assert_eq!(json["id"], "5f0c4a8e-3b1d-4c2e-9a7f-1b2c3d4e5f60");
        assert_eq!(json["username"], "polier@bau.ch");
        assert_eq!(json["role"], "ADMIN");
        assert_eq!(json["betrieb_id"], serde_json::Value::Null);
        assert_eq!(json["email_verified"], false);
        assert_eq!(json["created_at"], "2025-03-01T07:30:00Z");
        assert_eq!(json["last_login_at"], "2025-03-01T07:30:00Z");
    }

    #[test]
    fn login_request_requires_credentials() {
        let blank = LoginRequest {
            username: "  ".to_string(),
            password: "pw".to_string(),
        };
        assert!(matches!(blank.validate(), Err(DomainError::Validation(_))));

        let ok = LoginRequest {
            username: "polier".to_string(),
            password: "pw".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn change_password_requires_a_different_password() {
        let same = ChangePasswordRequest {
            current_password: "alt".to_string(),
            new_password: "alt".to_string(),
        };
        assert!(matches!(same.validate(), Err(DomainError::Validation(_))));

        let ok = ChangePasswordRequest {
            current_password: "alt".to_string(),
            new_password: "neu".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn profile_update_drops_blank_fields() {
        let update = UpdateProfileRequest {
            first_name: Some(" Hans ".to_string()),
            last_name: Some("  ".to_string()),
            email: None,
        }
        .into_update()
        .unwrap();

        assert_eq!(update.first_name.as_deref(), Some("Hans"));
        assert_eq!(update.last_name, None);

        assert!(UpdateProfileRequest::default().into_update().is_err());
        assert!(
            UpdateProfileRequest {
                email: Some("no-at-sign".to_string()),
                ..Default::default()
            }
            .into_update()
            .is_err()
        );
    }
}
