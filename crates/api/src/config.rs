//! Process configuration, read from environment variables.
//!
//! | variable | meaning |
//! |---|---|
//! | `BAU_BIND_ADDR` | listen address, default `0.0.0.0:8080` |
//! | `BAU_LOG_FORMAT` | `json` (default) or `pretty` |
//! | `BAU_AUTH_DISABLED` | `true` for the local profile: no token is inspected, no provider is used |
//! | `BAU_JWT_JWKS` | RS256 key set, a file path or an `http(s)` URL |
//! | `BAU_JWT_PUBLIC_KEY_PEM` | path to a single RS256 public key |
//! | `BAU_JWT_SECRET` | HS256 shared secret |
//! | `BAU_JWT_ISSUER` | required `iss`; defaults to the user pool issuer when a pool is configured |
//! | `BAU_JWT_AUDIENCE` | required `aud`, optional |
//! | `BAU_COGNITO_REGION` | user pool region, default `eu-central-1` |
//! | `BAU_COGNITO_USER_POOL_ID` | user pool id; its JWKS is used when no key material is given |
//! | `BAU_COGNITO_CLIENT_ID` | app client id; enables login through Cognito |
//! | `BAU_COGNITO_CLIENT_SECRET` | app client secret, sent as `SECRET_HASH` |
//! | `BAU_COGNITO_ACCESS_KEY_ID` | static AWS credentials, optional (default chain otherwise) |
//! | `BAU_COGNITO_SECRET_ACCESS_KEY` | see above |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;

use bau_auth::{JwtTokenVerifier, TokenVerifier};
use bau_observability::LogFormat;

/// Secret used when nothing else is configured. Never use outside development.
pub const DEV_SECRET: &str = "dev-secret";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_COGNITO_REGION: &str = "eu-central-1";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid configuration value for {key}: {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
    /// `None` in the local profile or when no user pool is configured.
    pub cognito: Option<CognitoConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Local profile: every request is anonymous.
    Disabled,
    Hs256 { secret: String },
    Rs256 { public_key_pem: PathBuf },
    Jwks { source: JwksSource },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwksSource {
    File(PathBuf),
    Url(String),
}

impl core::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuthMode::Disabled => f.write_str("Disabled"),
            AuthMode::Hs256 { .. } => f.write_str("Hs256 { secret: <redacted> }"),
            AuthMode::Rs256 { public_key_pem } => f
                .debug_struct("Rs256")
                .field("public_key_pem", public_key_pem)
                .finish(),
            AuthMode::Jwks { source } => f.debug_struct("Jwks").field("source", source).finish(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CognitoConfig {
    pub region: String,
    pub user_pool_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials: Option<StaticCredentials>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl core::fmt::Debug for CognitoConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CognitoConfig")
            .field("region", &self.region)
            .field("user_pool_id", &self.user_pool_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field(
                "credentials",
                &self.credentials.as_ref().map(|c| c.access_key_id.as_str()),
            )
            .finish()
    }
}

impl CognitoConfig {
    /// `https://cognito-idp.<region>.amazonaws.com/<pool>`, the `iss` of pool tokens.
    pub fn issuer(&self) -> Option<String> {
        self.user_pool_id
            .as_ref()
            .map(|pool| format!("https://cognito-idp.{}.amazonaws.com/{}", self.region, pool))
    }

    pub fn jwks_url(&self) -> Option<String> {
        self.issuer().map(|iss| format!("{iss}/.well-known/jwks.json"))
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BAU_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError {
                key: "BAU_BIND_ADDR",
                message: e.to_string(),
            })?;

        let log_format = match get("BAU_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|message| ConfigError {
                key: "BAU_LOG_FORMAT",
                message,
            })?,
            None => LogFormat::default(),
        };

        let disabled = match get("BAU_AUTH_DISABLED").as_deref() {
            None => false,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(other) => {
                return Err(ConfigError {
                    key: "BAU_AUTH_DISABLED",
                    message: format!("expected true/false, got '{other}'"),
                });
            }
        };

        if disabled {
            return Ok(Self {
                bind_addr,
                log_format,
                auth: AuthConfig {
                    mode: AuthMode::Disabled,
                    issuer: None,
                    audience: None,
                },
                cognito: None,
            });
        }

        let cognito = cognito_from(&get)?;
        let pool_jwks = cognito.as_ref().and_then(CognitoConfig::jwks_url);

        let mode = if let Some(raw) = get("BAU_JWT_JWKS") {
            AuthMode::Jwks {
                source: jwks_source(raw),
            }
        } else if let Some(path) = get("BAU_JWT_PUBLIC_KEY_PEM") {
            AuthMode::Rs256 {
                public_key_pem: PathBuf::from(path),
            }
        } else if let Some(secret) = get("BAU_JWT_SECRET") {
            AuthMode::Hs256 { secret }
        } else if let Some(url) = pool_jwks {
            AuthMode::Jwks {
                source: JwksSource::Url(url),
            }
        } else {
            AuthMode::Hs256 {
                secret: DEV_SECRET.to_string(),
            }
        };

        let issuer = get("BAU_JWT_ISSUER").or_else(|| cognito.as_ref().and_then(CognitoConfig::issuer));

        Ok(Self {
            bind_addr,
            log_format,
            auth: AuthConfig {
                mode,
                issuer,
                audience: get("BAU_JWT_AUDIENCE"),
            },
            cognito,
        })
    }
}

fn jwks_source(raw: String) -> JwksSource {
    if raw.starts_with("https://") || raw.starts_with("http://") {
        JwksSource::Url(raw)
    } else {
        JwksSource::File(PathBuf::from(raw))
    }
}

fn cognito_from(get: &impl Fn(&str) -> Option<String>) -> Result<Option<CognitoConfig>, ConfigError> {
    let user_pool_id = get("BAU_COGNITO_USER_POOL_ID");
    let client_id = get("BAU_COGNITO_CLIENT_ID");
    if user_pool_id.is_none() && client_id.is_none() {
        return Ok(None);
    }

    let credentials = match (
        get("BAU_COGNITO_ACCESS_KEY_ID"),
        get("BAU_COGNITO_SECRET_ACCESS_KEY"),
    ) {
        (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
            access_key_id,
            secret_access_key,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(ConfigError {
                key: "BAU_COGNITO_SECRET_ACCESS_KEY",
                message: "required when BAU_COGNITO_ACCESS_KEY_ID is set".to_string(),
            });
        }
        (None, Some(_)) => {
            return Err(ConfigError {
                key: "BAU_COGNITO_ACCESS_KEY_ID",
                message: "required when BAU_COGNITO_SECRET_ACCESS_KEY is set".to_string(),
            });
        }
    };

    Ok(Some(CognitoConfig {
        region: get("BAU_COGNITO_REGION").unwrap_or_else(|| DEFAULT_COGNITO_REGION.to_string()),
        user_pool_id,
        client_id,
        client_secret: get("BAU_COGNITO_CLIENT_SECRET"),
        credentials,
    }))
}

impl AuthConfig {
    pub fn uses_dev_secret(&self) -> bool {
        matches!(&self.mode, AuthMode::Hs256 { secret } if secret == DEV_SECRET)
    }

    /// Build the token verifier; `None` when authentication is disabled.
    ///
    /// A key set given as URL is fetched once, here.
    pub async fn build_verifier(&self) -> anyhow::Result<Option<Arc<dyn TokenVerifier>>> {
        let verifier = match &self.mode {
            AuthMode::Disabled => return Ok(None),
            AuthMode::Hs256 { secret } => JwtTokenVerifier::hs256(secret.as_bytes()),
            AuthMode::Rs256 { public_key_pem } => {
                let pem = std::fs::read(public_key_pem).with_context(|| {
                    format!("failed to read public key {}", public_key_pem.display())
                })?;
                JwtTokenVerifier::rs256_pem(&pem)?
            }
            AuthMode::Jwks { source } => {
                let document = load_jwks(source).await?;
                JwtTokenVerifier::rs256_jwks_json(&document)?
            }
        };

        let verifier = match &self.issuer {
            Some(iss) => verifier.with_issuer(iss),
            None => verifier,
        };
        let verifier = match &self.audience {
            Some(aud) => verifier.with_audience(aud),
            None => verifier,
        };

        Ok(Some(Arc::new(verifier)))
    }
}

async fn load_jwks(source: &JwksSource) -> anyhow::Result<Vec<u8>> {
    match source {
        JwksSource::File(path) => std::fs::read(path)
            .with_context(|| format!("failed to read key set {}", path.display())),
        JwksSource::Url(url) => {
            tracing::info!(%url, "fetching signing key set");
            let body = reqwest::get(url)
                .await
                .and_then(reqwest::Response::error_for_status)
                .with_context(|| format!("failed to fetch key set from {url}"))?
                .bytes()
                .await
                .with_context(|| format!("failed to read key set from {url}"))?;
            Ok(body.to_vec())
        }
    }
}
