//! `bau-auth`: identity extraction and request authentication context.
//!
//! Turns the claims of an identity-provider token into a domain [`Identity`]
//! (id, tenant association, exactly one [`UserRole`]). Decoupled from HTTP
//! and storage; the API crate threads an [`AuthContext`] through requests.

pub mod claims;
pub mod context;
pub mod error;
pub mod extract;
pub mod identity;
pub mod roles;
pub mod token;

pub use claims::{ClaimMap, IdentityClaims};
pub use context::AuthContext;
pub use error::{AuthError, AuthResult};
pub use extract::{extract, extract_from_claim_map, extract_from_token};
pub use identity::{full_name, has_role, is_active, Identity, UserStatus};
pub use roles::{resolve_role, UserRole};
pub use token::{decode_unverified, JwtTokenVerifier, TokenVerifier};
