//! Token decoding: signature-verified for interactive requests, unverified
//! for tokens whose provenance is already trusted.

use std::collections::HashMap;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::claims::ClaimMap;
use crate::error::{AuthError, AuthResult};

/// Clock skew tolerance for `exp`/`nbf`, in seconds.
pub const LEEWAY_SECS: u64 = 30;

/// Verifies a bearer token and hands back its claims.
///
/// The HTTP layer holds one of these behind an `Arc`; implementations must
/// be immutable after construction.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> AuthResult<ClaimMap>;

    /// Algorithm name, for logging.
    fn algorithm(&self) -> &'static str;
}

enum VerificationKeys {
    Single(DecodingKey),
    /// Keys of a JWKS document, selected by the token header's `kid`.
    ByKid(HashMap<String, DecodingKey>),
}

/// `jsonwebtoken`-backed verifier: HS256 shared secret, a single RS256
/// public key, or an RS256 key set.
pub struct JwtTokenVerifier {
    keys: VerificationKeys,
    validation: Validation,
    algorithm: Algorithm,
}

impl JwtTokenVerifier {
    /// HS256 with a shared secret (local development and tests).
    pub fn hs256(secret: &[u8]) -> Self {
        Self::new(VerificationKeys::Single(DecodingKey::from_secret(secret)), Algorithm::HS256)
    }

    /// RS256 with a single PEM-encoded public key.
    pub fn rs256_pem(public_key_pem: &[u8]) -> AuthResult<Self> {
        let key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self::new(VerificationKeys::Single(key), Algorithm::RS256))
    }

    /// RS256 against a key set, as published by a Cognito user pool at
    /// `/.well-known/jwks.json`. The pool signs ID and access tokens with
    /// different keys, so every RSA key carrying a `kid` is kept.
    pub fn rs256_jwks(jwks: &JwkSet) -> AuthResult<Self> {
        let mut keys = HashMap::new();

        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                tracing::debug!("skipping JWK without kid");
                continue;
            };
            if !matches!(jwk.algorithm, AlgorithmParameters::RSA(_)) {
                tracing::debug!(kid, "skipping non-RSA JWK");
                continue;
            }

            let key = DecodingKey::from_jwk(jwk)
                .map_err(|e| AuthError::InvalidKey(format!("JWK '{kid}': {e}")))?;
            if keys.insert(kid.to_string(), key).is_some() {
                tracing::warn!(kid, "duplicate kid in key set, using the last one");
            }
        }

        if keys.is_empty() {
            return Err(AuthError::InvalidKey("key set holds no RSA key with a kid".to_string()));
        }

        tracing::debug!(keys = keys.len(), "loaded RS256 key set");
        Ok(Self::new(VerificationKeys::ByKid(keys), Algorithm::RS256))
    }

    /// [`JwtTokenVerifier::rs256_jwks`] over a raw JWKS JSON document.
    pub fn rs256_jwks_json(document: &[u8]) -> AuthResult<Self> {
        let jwks: JwkSet = serde_json::from_slice(document)
            .map_err(|e| AuthError::InvalidKey(format!("malformed key set: {e}")))?;
        Self::rs256_jwks(&jwks)
    }

    fn new(keys: VerificationKeys, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECS;
        // Access tokens carry `client_id` instead of `aud`.
        validation.validate_aud = false;

        Self {
            keys,
            validation,
            algorithm,
        }
    }

    /// Require the `iss` claim to equal `issuer`.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Require the `aud` claim to contain `audience`.
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    fn key_for(&self, token: &str) -> AuthResult<&DecodingKey> {
        let keys = match &self.keys {
            VerificationKeys::Single(key) => return Ok(key),
            VerificationKeys::ByKid(keys) => keys,
        };

        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".to_string()))?;

        keys.get(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key '{kid}'")))
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> AuthResult<ClaimMap> {
        let key = self.key_for(token)?;

        decode::<ClaimMap>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    fn algorithm(&self) -> &'static str {
        match self.algorithm {
            Algorithm::HS256 => "HS256",
            Algorithm::RS256 => "RS256",
            _ => "unknown",
        }
    }
}

/// Decode a token's payload without checking its signature or lifetime.
///
/// The header must still name a known algorithm and the payload must be a
/// JSON object.
pub fn decode_unverified(token: &str) -> AuthResult<ClaimMap> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<ClaimMap>(token.trim(), &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenDecode(e.to_string()))
}
