use bau_core::{BetriebId, UserId};

use crate::error::{AuthError, AuthResult};
use crate::identity::{self, Identity};
use crate::UserRole;

/// Authentication state of one in-flight request.
///
/// Built once by the transport layer and handed to handlers explicitly; it
/// is never shared between requests and never changes after construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    identity: Option<Identity>,
    access_token: Option<String>,
}

impl AuthContext {
    /// No authentication established.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An identity together with the bearer token it was derived from.
    pub fn authenticated(identity: Identity, access_token: impl Into<String>) -> Self {
        Self {
            identity: Some(identity),
            access_token: Some(access_token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn current_identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn require_identity(&self) -> AuthResult<&Identity> {
        self.identity.as_ref().ok_or(AuthError::NotAuthenticated)
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.identity.as_ref().map(|i| i.id)
    }

    pub fn current_betrieb_id(&self) -> Option<BetriebId> {
        self.identity.as_ref().and_then(|i| i.betrieb_id)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        identity::has_role(self.current_identity(), role)
    }

    /// The raw bearer token, needed for provider calls such as global sign-out.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl core::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthContext")
            .field("identity", &self.identity)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
