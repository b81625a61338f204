//! AWS Cognito user pool as [`IdentityProvider`].

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cognitoidentityprovider::config::Credentials;
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{AttributeUpdate, AuthenticationResult, IdentityProvider, IdpError};
use crate::config::CognitoConfig;

type HmacSha256 = Hmac<Sha256>;

pub struct CognitoIdentityProvider {
    client: Client,
    client_id: String,
    client_secret: Option<String>,
}

impl CognitoIdentityProvider {
    /// Build the SDK client for the configured region. Static credentials are
    /// used when configured, the default AWS credential chain otherwise.
    pub async fn connect(config: &CognitoConfig, client_id: &str) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "bau-config",
            ));
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), client_id, config.client_secret.clone())
    }

    pub fn new(client: Client, client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret,
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticationResult>, IdpError> {
        let mut request = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password);

        if let Some(client_secret) = &self.client_secret {
            request = request.auth_parameters(
                "SECRET_HASH",
                secret_hash(client_secret, &self.client_id, username)?,
            );
        }

        let output = match request.send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(err))
                if err.err().is_not_authorized_exception() || err.err().is_user_not_found_exception() =>
            {
                tracing::warn!(username, reason = ?err.err().message(), "cognito rejected credentials");
                return Ok(None);
            }
            Err(err) => return Err(provider_error("InitiateAuth", err)),
        };

        let Some(result) = output.authentication_result() else {
            tracing::warn!(
                username,
                challenge = ?output.challenge_name(),
                "cognito answered with a challenge; only direct password login is supported"
            );
            return Ok(None);
        };

        let (Some(access_token), Some(id_token)) = (result.access_token(), result.id_token()) else {
            return Err(IdpError::Rejected(
                "authentication result without access or ID token".to_string(),
            ));
        };

        tracing::info!(username, "cognito authentication succeeded");

        Ok(Some(AuthenticationResult {
            access_token: access_token.to_string(),
            id_token: id_token.to_string(),
            refresh_token: result.refresh_token().map(str::to_owned),
            expires_in: i64::from(result.expires_in()),
        }))
    }

    async fn global_sign_out(&self, access_token: &str) -> Result<(), IdpError> {
        self.client
            .global_sign_out()
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| provider_error("GlobalSignOut", e))?;
        Ok(())
    }

    async fn change_password(
        &self,
        access_token: &str,
        previous_password: &str,
        proposed_password: &str,
    ) -> Result<(), IdpError> {
        self.client
            .change_password()
            .access_token(access_token)
            .previous_password(previous_password)
            .proposed_password(proposed_password)
            .send()
            .await
            .map_err(|e| provider_error("ChangePassword", e))?;
        Ok(())
    }

    async fn update_user_attributes(
        &self,
        access_token: &str,
        update: &AttributeUpdate,
    ) -> Result<(), IdpError> {
        self.client
            .update_user_attributes()
            .access_token(access_token)
            .set_user_attributes(Some(user_attributes(update)?))
            .send()
            .await
            .map_err(|e| provider_error("UpdateUserAttributes", e))?;
        Ok(())
    }
}

/// `SECRET_HASH` for app clients with a secret:
/// base64(HMAC-SHA256(client_secret, username + client_id)).
pub(crate) fn secret_hash(client_secret: &str, client_id: &str, username: &str) -> Result<String, IdpError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| IdpError::Unavailable(format!("secret hash: {e}")))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Standard Cognito attribute names for the fields that are set.
fn user_attributes(update: &AttributeUpdate) -> Result<Vec<AttributeType>, IdpError> {
    [
        ("given_name", &update.first_name),
        ("family_name", &update.last_name),
        ("email", &update.email),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .as_ref()
            .map(|value| AttributeType::builder().name(name).value(value).build())
    })
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| IdpError::Rejected(e.to_string()))
}

/// Service errors are the provider's answer; anything else (dispatch,
/// timeout, credentials) means it was not reached.
fn provider_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> IdpError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let error = match err {
        SdkError::ServiceError(service) => {
            let e = service.err();
            IdpError::Rejected(format!(
                "{operation}: {}",
                e.message().or(e.code()).unwrap_or("request refused")
            ))
        }
        other => IdpError::Unavailable(format!("{operation}: {}", DisplayErrorContext(&other))),
    };

    tracing::warn!(operation, error = %error, "cognito call failed");
    error
}
