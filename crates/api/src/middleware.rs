use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use bau_auth::{extract_from_claim_map, AuthContext, AuthError, AuthResult, TokenVerifier};

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    /// `None` disables authentication (local profile).
    pub verifier: Option<Arc<dyn TokenVerifier>>,
}

/// Establish the [`AuthContext`] for every request.
///
/// Requests without an `Authorization` header continue anonymously; handlers
/// decide whether that is acceptable. A header that is present but does not
/// yield an identity is rejected with a JSON 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ctx = match establish(&state, req.headers()) {
        Ok(ctx) => ctx,
        Err(e) => return errors::auth_error_to_response(e),
    };

    req.extensions_mut().insert(ctx);

    next.run(req).await
}

fn establish(state: &AuthState, headers: &HeaderMap) -> AuthResult<AuthContext> {
    let Some(verifier) = state.verifier.as_deref() else {
        return Ok(AuthContext::anonymous());
    };

    match extract_bearer(headers)? {
        None => Ok(AuthContext::anonymous()),
        Some(token) => authenticate(verifier, token),
    }
}

fn authenticate(verifier: &dyn TokenVerifier, token: &str) -> AuthResult<AuthContext> {
    let claims = verifier.verify(token).inspect_err(|e| {
        tracing::debug!(error = %e, algorithm = verifier.algorithm(), "bearer token rejected");
    })?;

    let identity = extract_from_claim_map(&claims, Utc::now()).inspect_err(|e| {
        tracing::warn!(error = %e, "verified token does not carry a usable identity");
    })?;

    Ok(AuthContext::authenticated(identity, token))
}

fn extract_bearer(headers: &HeaderMap) -> AuthResult<Option<&str>> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("authorization header is not valid text".to_string()))?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidToken("authorization scheme must be Bearer".to_string()))?;

    let token = header.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken("empty bearer token".to_string()));
    }

    Ok(Some(token))
}
