//! The domain identity derived from an identity token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bau_core::{BetriebId, UserId};

use crate::UserRole;

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Aktiv,
    Inaktiv,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Aktiv => write!(f, "AKTIV"),
            UserStatus::Inaktiv => write!(f, "INAKTIV"),
        }
    }
}

/// An authenticated user as seen by authorization checks.
///
/// Built fresh on every extraction and never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Tenant association; absent for admins and for malformed tenant claims.
    pub betrieb_id: Option<BetriebId>,
    pub betrieb_name: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `true` iff an identity is present and its role equals `role`.
pub fn has_role(identity: Option<&Identity>, role: UserRole) -> bool {
    identity.is_some_and(|i| i.role == role)
}

pub fn is_active(identity: &Identity) -> bool {
    identity.status == UserStatus::Aktiv
}

/// Human-readable name: "first last", either part alone, else the email
/// (or username when there is no email either).
pub fn full_name(identity: &Identity) -> Option<String> {
    match (identity.first_name.as_deref(), identity.last_name.as_deref()) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
        (None, None) => identity.email.clone().or_else(|| identity.username.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: UserRole) -> Identity {
        let now = Utc::now();
        Identity {
            id: UserId::new(),
            username: Some("polier".to_string()),
            email: Some("polier@bau.ch".to_string()),
            first_name: None,
            last_name: None,
            betrieb_id: None,
            betrieb_name: None,
            role,
            status: UserStatus::Aktiv,
            email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn has_role_is_equality() {
        let admin = identity(UserRole::Admin);
        assert!(has_role(Some(&admin), UserRole::Admin));
        assert!(!has_role(Some(&admin), UserRole::Betrieb));
    }

    #[test]
    fn has_role_false_without_identity() {
        assert!(!has_role(None, UserRole::Admin));
        assert!(!has_role(None, UserRole::Betrieb));
    }

    #[test]
    fn full_name_fallbacks() {
        let mut id = identity(UserRole::Betrieb);
        assert_eq!(full_name(&id).as_deref(), Some("polier@bau.ch"));

        id.last_name = Some("Meier".to_string());
        assert_eq!(full_name(&id).as_deref(), Some("Meier"));

        id.first_name = Some("Reto".to_string());
        assert_eq!(full_name(&id).as_deref(), Some("Reto Meier"));
    }

    #[test]
    fn inactive_status_is_not_active() {
        let mut id = identity(UserRole::Betrieb);
        assert!(is_active(&id));
        id.status = UserStatus::Inaktiv;
        assert!(!is_active(&id));
    }
}
