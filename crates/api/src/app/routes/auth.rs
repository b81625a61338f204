//! Authentication endpoints: login, profile, password, logout, tenant lookup.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use bau_auth::{extract_from_token, full_name, AuthContext, AuthError, Identity, UserRole};

use crate::app::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, TenantResponse, UpdateProfileRequest,
    UserProfile,
};
use crate::app::errors;
use crate::authz;
use crate::idp::IdentityProvider;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/profile", get(profile).patch(update_profile))
        .route("/password", post(change_password))
        .route("/logout", post(logout))
        .route("/tenant", get(tenant))
}

/// POST /api/v1/auth/login
///
/// Authenticates against the identity provider, then derives the user from
/// the returned ID token. The token comes straight from the provider, so it
/// is decoded without re-verifying its signature.
pub async fn login(
    Extension(idp): Extension<Arc<dyn IdentityProvider>>,
    Json(req): Json<LoginRequest>,
) -> axum::response::Response {
    if let Err(e) = req.validate() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string());
    }

    tracing::info!(username = %req.username, "login attempt");

    let tokens = match idp.authenticate(&req.username, &req.password).await {
        Ok(Some(tokens)) => tokens,
        Ok(None) => {
            tracing::warn!(username = %req.username, "login rejected by identity provider");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "invalid credentials");
        }
        Err(e) => {
            tracing::error!(username = %req.username, error = %e, "login failed");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "login failed");
        }
    };

    let identity = match extract_from_token(&tokens.id_token, Utc::now()) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(username = %req.username, error = %e, "identity token from provider is unusable");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "login failed");
        }
    };

    tracing::info!(
        user_id = %identity.id,
        name = full_name(&identity).as_deref().unwrap_or("-"),
        role = %identity.role,
        "user logged in"
    );

    (StatusCode::OK, Json(LoginResponse::new(tokens, &identity))).into_response()
}

/// GET /api/v1/auth/profile
pub async fn profile(Extension(ctx): Extension<AuthContext>) -> axum::response::Response {
    match ctx.require_identity() {
        Ok(identity) => (StatusCode::OK, Json(UserProfile::from(identity))).into_response(),
        Err(e) => {
            tracing::debug!("profile requested without authentication");
            errors::auth_error_to_response(e)
        }
    }
}

/// PATCH /api/v1/auth/profile
///
/// Changes name or email at the provider. The caller's current token keeps
/// the old claims until it is refreshed.
pub async fn update_profile(
    Extension(idp): Extension<Arc<dyn IdentityProvider>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> axum::response::Response {
    let (identity, access_token) = match caller(&ctx) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let update = match req.into_update() {
        Ok(update) => update,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match idp.update_user_attributes(access_token, &update).await {
        Ok(()) => {
            tracing::info!(user_id = %identity.id, "user attributes updated");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::idp_error_to_response(e),
    }
}

/// POST /api/v1/auth/password
pub async fn change_password(
    Extension(idp): Extension<Arc<dyn IdentityProvider>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    let (identity, access_token) = match caller(&ctx) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if let Err(e) = req.validate() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string());
    }

    match idp
        .change_password(access_token, &req.current_password, &req.new_password)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = %identity.id, "password changed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::idp_error_to_response(e),
    }
}

/// POST /api/v1/auth/logout
///
/// Revokes the caller's tokens at the provider when a token is present.
/// Provider failures are logged only; the client is logged out regardless.
pub async fn logout(
    Extension(idp): Extension<Arc<dyn IdentityProvider>>,
    Extension(ctx): Extension<AuthContext>,
) -> StatusCode {
    if let Some(access_token) = ctx.access_token() {
        match idp.global_sign_out(access_token).await {
            Ok(()) => tracing::info!(user_id = ?ctx.current_user_id(), "signed out globally"),
            Err(e) => tracing::warn!(user_id = ?ctx.current_user_id(), error = %e, "global sign-out failed"),
        }
    }

    StatusCode::OK
}

/// GET /api/v1/auth/tenant - the caller's Betrieb (BETRIEB role only)
pub async fn tenant(Extension(ctx): Extension<AuthContext>) -> axum::response::Response {
    let identity = match authz::require_role(&ctx, UserRole::Betrieb) {
        Ok(identity) => identity,
        Err(e) => return errors::authz_error_to_response(e),
    };

    let Some(betrieb_id) = ctx.current_betrieb_id() else {
        tracing::warn!(user_id = %identity.id, "user has no betrieb id");
        return errors::json_error(StatusCode::FORBIDDEN, "no_betrieb", "user is not assigned to a betrieb");
    };

    (
        StatusCode::OK,
        Json(TenantResponse {
            betrieb_id,
            betrieb_name: identity.betrieb_name.clone(),
        }),
    )
        .into_response()
}

/// Identity and bearer token of the caller, for provider calls on their behalf.
fn caller(ctx: &AuthContext) -> Result<(&Identity, &str), axum::response::Response> {
    let identity = ctx.require_identity().map_err(errors::auth_error_to_response)?;
    let token = ctx
        .access_token()
        .ok_or_else(|| errors::auth_error_to_response(AuthError::NotAuthenticated))?;
    Ok((identity, token))
}
