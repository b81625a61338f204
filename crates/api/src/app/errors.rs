use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bau_auth::AuthError;

use crate::authz::AuthzError;
use crate::idp::IdpError;

/// Every failure to establish an identity is a 401; the code tells the
/// client whether refreshing the token can help.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let code = match err {
        AuthError::NotAuthenticated => "unauthenticated",
        AuthError::TokenExpired => "token_expired",
        _ => "invalid_token",
    };
    json_error(StatusCode::UNAUTHORIZED, code, err.to_string())
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", err.to_string())
        }
        AuthzError::Inactive => json_error(StatusCode::FORBIDDEN, "inactive", err.to_string()),
        AuthzError::MissingRole(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
    }
}

pub fn idp_error_to_response(err: IdpError) -> axum::response::Response {
    match err {
        IdpError::Rejected(_) => json_error(StatusCode::BAD_REQUEST, "rejected", err.to_string()),
        IdpError::Unavailable(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "idp_unavailable", err.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
