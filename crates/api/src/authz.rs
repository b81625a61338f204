//! Role gates for handlers.
//!
//! Checks run against the request's [`AuthContext`]; there is no ambient
//! security state.

use thiserror::Error;

use bau_auth::{is_active, AuthContext, AuthError, Identity, UserRole};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("account is not active")]
    Inactive,

    #[error("forbidden: requires role {0}")]
    MissingRole(UserRole),
}

impl From<AuthError> for AuthzError {
    fn from(_: AuthError) -> Self {
        AuthzError::Unauthenticated
    }
}

/// The authenticated identity if it is active and holds exactly `role`.
pub fn require_role(ctx: &AuthContext, role: UserRole) -> Result<&Identity, AuthzError> {
    let identity = ctx.require_identity()?;

    if !is_active(identity) {
        return Err(AuthzError::Inactive);
    }
    if !ctx.has_role(role) {
        return Err(AuthzError::MissingRole(role));
    }

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bau_auth::{extract, IdentityClaims, UserStatus};
    use bau_core::UserId;

    fn ctx(groups: &[&str]) -> AuthContext {
        let claims = IdentityClaims {
            sub: Some(UserId::new().to_string()),
            groups: Some(groups.iter().map(|g| g.to_string()).collect()),
            ..Default::default()
        };
        AuthContext::authenticated(extract(&claims, chrono::Utc::now()).unwrap(), "token")
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        let anon = AuthContext::anonymous();
        assert_eq!(require_role(&anon, UserRole::Admin).unwrap_err(), AuthzError::Unauthenticated);
    }

    #[test]
    fn role_must_match_exactly() {
        assert!(require_role(&ctx(&["admin"]), UserRole::Admin).is_ok());
        assert_eq!(
            require_role(&ctx(&["admin"]), UserRole::Betrieb).unwrap_err(),
            AuthzError::MissingRole(UserRole::Betrieb)
        );
        assert!(require_role(&ctx(&["worker"]), UserRole::Betrieb).is_ok());
    }

    #[test]
    fn inactive_identity_is_rejected() {
        let mut identity = ctx(&["admin"]).current_identity().cloned().unwrap();
        identity.status = UserStatus::Inaktiv;
        let ctx = AuthContext::authenticated(identity, "token");

        assert_eq!(require_role(&ctx, UserRole::Admin).unwrap_err(), AuthzError::Inactive);
    }
}
