//! Identity-provider seam.
//!
//! Password checks, token issuance, revocation and attribute changes belong
//! to the external provider (a Cognito user pool in production). The API only
//! talks to it through [`IdentityProvider`].

use std::sync::Arc;

use thiserror::Error;

use crate::config::CognitoConfig;

pub mod cognito;

pub use cognito::CognitoIdentityProvider;

/// Tokens returned by a successful provider login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Profile attributes to change; `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl AttributeUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdpError {
    /// The provider could not be reached or is not configured.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered and refused the request.
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check credentials. `Ok(None)` means the provider rejected them.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticationResult>, IdpError>;

    /// Revoke every token issued for the owner of `access_token`.
    async fn global_sign_out(&self, access_token: &str) -> Result<(), IdpError>;

    async fn change_password(
        &self,
        access_token: &str,
        previous_password: &str,
        proposed_password: &str,
    ) -> Result<(), IdpError>;

    async fn update_user_attributes(
        &self,
        access_token: &str,
        update: &AttributeUpdate,
    ) -> Result<(), IdpError>;
}

/// Provider for the local profile: every call fails as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIdentityProvider;

impl DisabledIdentityProvider {
    fn unavailable() -> IdpError {
        IdpError::Unavailable("no identity provider configured".to_string())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn authenticate(
        &self,
        username: &str,
        _password: &str,
    ) -> Result<Option<AuthenticationResult>, IdpError> {
        tracing::warn!(username, "login attempted but no identity provider is configured");
        Err(Self::unavailable())
    }

    async fn global_sign_out(&self, _access_token: &str) -> Result<(), IdpError> {
        Err(Self::unavailable())
    }

    async fn change_password(&self, _: &str, _: &str, _: &str) -> Result<(), IdpError> {
        Err(Self::unavailable())
    }

    async fn update_user_attributes(&self, _: &str, _: &AttributeUpdate) -> Result<(), IdpError> {
        Err(Self::unavailable())
    }
}

/// Cognito when an app client is configured, otherwise the disabled provider.
pub async fn from_config(cognito: Option<&CognitoConfig>) -> Arc<dyn IdentityProvider> {
    match cognito {
        Some(config) => match config.client_id.as_deref() {
            Some(client_id) => {
                tracing::info!(region = %config.region, client_id, "using Cognito identity provider");
                Arc::new(CognitoIdentityProvider::connect(config, client_id).await)
            }
            None => {
                tracing::warn!("BAU_COGNITO_CLIENT_ID not set; login is unavailable");
                Arc::new(DisabledIdentityProvider)
            }
        },
        None => Arc::new(DisabledIdentityProvider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_is_unavailable() {
        let idp = DisabledIdentityProvider;

        assert!(matches!(idp.authenticate("polier", "pw").await, Err(IdpError::Unavailable(_))));
        assert!(matches!(idp.global_sign_out("t").await, Err(IdpError::Unavailable(_))));
        assert!(matches!(idp.change_password("t", "a", "b").await, Err(IdpError::Unavailable(_))));
        assert!(matches!(
            idp.update_user_attributes("t", &AttributeUpdate::default()).await,
            Err(IdpError::Unavailable(_))
        ));
    }

    #[test]
    fn attribute_update_emptiness() {
        assert!(AttributeUpdate::default().is_empty());
        assert!(!AttributeUpdate {
            email: Some("neu@bau.ch".to_string()),
            ..Default::default()
        }
        .is_empty());
    }
}
