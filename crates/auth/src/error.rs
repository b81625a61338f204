use thiserror::Error;

/// Authentication failure at the identity boundary.
///
/// Every variant means "no identity could be established"; callers map them
/// to an unauthenticated response. Soft claim problems (a malformed tenant id)
/// never surface here, they are logged and the field is left empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid claim '{claim}': {reason}")]
    ClaimDecoding { claim: &'static str, reason: String },

    #[error("token could not be decoded: {0}")]
    TokenDecode(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid verification key: {0}")]
    InvalidKey(String),
}

impl AuthError {
    pub(crate) fn claim(claim: &'static str, reason: impl Into<String>) -> Self {
        Self::ClaimDecoding {
            claim,
            reason: reason.into(),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
