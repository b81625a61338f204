//! Claims → [`Identity`] mapping.
//!
//! Pure functions: no IO, no shared state. The current time is passed in so
//! the result is deterministic for a given input.

use core::str::FromStr;

use chrono::{DateTime, Utc};

use bau_core::{BetriebId, UserId};

use crate::claims::{names, ClaimMap, IdentityClaims};
use crate::error::{AuthError, AuthResult};
use crate::identity::{Identity, UserStatus};
use crate::roles::resolve_role;
use crate::token::decode_unverified;

/// Derive a domain identity from identity-token claims.
///
/// - `sub` is mandatory and must be a UUID, otherwise
///   [`AuthError::ClaimDecoding`].
/// - A malformed `custom:betrieb_id` is dropped with a warning.
/// - Unknown groups never fail; see [`resolve_role`].
pub fn extract(claims: &IdentityClaims, now: DateTime<Utc>) -> AuthResult<Identity> {
    let sub = claims
        .sub
        .as_deref()
        .ok_or_else(|| AuthError::claim(names::SUBJECT, "missing"))?;
    let id = UserId::from_str(sub).map_err(|e| AuthError::claim(names::SUBJECT, e.to_string()))?;

    let betrieb_id = claims
        .betrieb_id
        .as_deref()
        .and_then(|raw| match BetriebId::from_str(raw) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(user_id = %id, betrieb_id = raw, error = %e, "ignoring malformed betrieb id claim");
                None
            }
        });

    let identity = Identity {
        id,
        username: claims.username.clone().or_else(|| claims.email.clone()),
        email: claims.email.clone(),
        first_name: claims.given_name.clone(),
        last_name: claims.family_name.clone(),
        betrieb_id,
        betrieb_name: claims.betrieb_name.clone(),
        role: resolve_role(claims.groups.as_deref()),
        // Tokens are only issued to enabled accounts.
        status: UserStatus::Aktiv,
        email_verified: claims.email_verified.unwrap_or(false),
        // The token carries no account creation time.
        created_at: now,
        updated_at: now,
    };

    tracing::debug!(user_id = %identity.id, role = %identity.role, "extracted identity from claims");
    Ok(identity)
}

/// [`extract`] over a raw claim map (e.g. the output of a
/// [`crate::TokenVerifier`]).
pub fn extract_from_claim_map(claims: &ClaimMap, now: DateTime<Utc>) -> AuthResult<Identity> {
    extract(&IdentityClaims::from_claim_map(claims), now)
}

/// Decode a raw token **without verifying its signature** and extract the
/// identity.
///
/// Only for tokens whose provenance is already trusted, such as the ID token
/// returned directly by the identity provider's login call.
pub fn extract_from_token(token: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
    let claims = decode_unverified(token)?;
    extract_from_claim_map(&claims, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRole;

    const SUB: &str = "5f0c4a8e-3b1d-4c2e-9a7f-1b2c3d4e5f60";
    const BETRIEB: &str = "0b7e7f4e-6f43-4a0a-8d55-3f1f0d6a9e21";

    fn claims() -> IdentityClaims {
        IdentityClaims {
            sub: Some(SUB.to_string()),
            email: Some("a@b.ch".to_string()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T07:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn maps_all_claims() {
        let input = IdentityClaims {
            sub: Some(SUB.to_string()),
            email: Some("polier@bau.ch".to_string()),
            username: Some("polier".to_string()),
            given_name: Some("Reto".to_string()),
            family_name: Some("Meier".to_string()),
            email_verified: Some(true),
            groups: Some(vec!["betrieb".to_string()]),
            betrieb_id: Some(BETRIEB.to_string()),
            betrieb_name: Some("Meier Bau AG".to_string()),
        };

        let identity = extract(&input, now()).unwrap();

        assert_eq!(identity.id.to_string(), SUB);
        assert_eq!(identity.username.as_deref(), Some("polier"));
        assert_eq!(identity.email.as_deref(), Some("polier@bau.ch"));
        assert_eq!(identity.first_name.as_deref(), Some("Reto"));
        assert_eq!(identity.last_name.as_deref(), Some("Meier"));
        assert_eq!(identity.betrieb_id.map(|b| b.to_string()).as_deref(), Some(BETRIEB));
        assert_eq!(identity.betrieb_name.as_deref(), Some("Meier Bau AG"));
        assert_eq!(identity.role, UserRole::Betrieb);
        assert_eq!(identity.status, UserStatus::Aktiv);
        assert!(identity.email_verified);
        assert_eq!(identity.created_at, now());
        assert_eq!(identity.updated_at, now());
    }

    #[test]
    fn username_falls_back_to_email() {
        let identity = extract(&claims(), now()).unwrap();
        assert_eq!(identity.username.as_deref(), Some("a@b.ch"));
    }

    #[test]
    fn missing_subject_is_hard_failure() {
        let input = IdentityClaims {
            sub: None,
            ..claims()
        };

        let err = extract(&input, now()).unwrap_err();
        assert!(matches!(err, AuthError::ClaimDecoding { claim: "sub", .. }));
    }

    #[test]
    fn malformed_subject_is_hard_failure() {
        let input = IdentityClaims {
            sub: Some("user-123".to_string()),
            ..claims()
        };

        let err = extract(&input, now()).unwrap_err();
        assert!(matches!(err, AuthError::ClaimDecoding { claim: "sub", .. }));
    }

    #[test]
    fn malformed_betrieb_id_is_dropped() {
        let input = IdentityClaims {
            betrieb_id: Some("not-a-uuid".to_string()),
            betrieb_name: Some("Meier Bau AG".to_string()),
            ..claims()
        };

        let identity = extract(&input, now()).unwrap();
        assert_eq!(identity.betrieb_id, None);
        assert_eq!(identity.betrieb_name.as_deref(), Some("Meier Bau AG"));
    }

    #[test]
    fn email_verified_defaults_to_false() {
        let identity = extract(&claims(), now()).unwrap();
        assert!(!identity.email_verified);
    }

    #[test]
    fn admin_groups_resolve_to_admin() {
        for group in ["admin", "ADMIN", "Administrators"] {
            let input = IdentityClaims {
                groups: Some(vec![group.to_string()]),
                ..claims()
            };
            assert_eq!(extract(&input, now()).unwrap().role, UserRole::Admin, "group {group}");
        }
    }

    #[test]
    fn empty_missing_or_unknown_groups_resolve_to_betrieb() {
        for groups in [Some(vec![]), None, Some(vec!["unknown-group".to_string()])] {
            let input = IdentityClaims {
                groups: groups.clone(),
                ..claims()
            };
            assert_eq!(extract(&input, now()).unwrap().role, UserRole::Betrieb, "groups {groups:?}");
        }
    }

    #[test]
    fn claim_map_path_matches_typed_path() {
        let mut map = ClaimMap::new();
        map.insert("sub".into(), SUB.into());
        map.insert("email".into(), "a@b.ch".into());
        map.insert("cognito:groups".into(), serde_json::json!(["Admin"]));

        let identity = extract_from_claim_map(&map, now()).unwrap();
        assert_eq!(identity.role, UserRole::Admin);
        assert_eq!(identity.username.as_deref(), Some("a@b.ch"));
    }

    #[test]
    fn garbage_token_is_decode_failure() {
        let err = extract_from_token("definitely.not.a-jwt", now()).unwrap_err();
        assert!(matches!(err, AuthError::TokenDecode(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn case_variants(word: &'static str) -> impl Strategy<Value = String> {
            proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
                word.chars()
                    .zip(upper)
                    .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                    .collect()
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: any well-formed subject extracts, whatever the groups say.
            #[test]
            fn valid_subject_always_extracts(
                raw in any::<u128>(),
                groups in proptest::option::of(proptest::collection::vec(".{0,16}", 0..6)),
                betrieb in proptest::option::of(".{0,40}"),
            ) {
                let input = IdentityClaims {
                    sub: Some(uuid::Uuid::from_u128(raw).to_string()),
                    groups,
                    betrieb_id: betrieb,
                    ..Default::default()
                };

                let identity = extract(&input, now()).unwrap();
                prop_assert!(matches!(identity.role, UserRole::Admin | UserRole::Betrieb));
            }

            /// Property: an admin marker anywhere in the list yields ADMIN.
            #[test]
            fn admin_marker_position_is_irrelevant(
                others in proptest::collection::vec("[a-z]{1,12}", 0..6),
                marker in prop_oneof![
                    case_variants("admin"),
                    case_variants("administrator"),
                    case_variants("administrators"),
                ],
                position in any::<proptest::sample::Index>(),
            ) {
                let mut groups = others;
                let at = position.index(groups.len() + 1);
                groups.insert(at, marker);

                let input = IdentityClaims {
                    groups: Some(groups),
                    ..claims()
                };

                prop_assert_eq!(extract(&input, now()).unwrap().role, UserRole::Admin);
            }

            /// Property: without a subject, extraction always fails.
            #[test]
            fn missing_subject_always_fails(
                email in proptest::option::of("[a-z]{1,8}@[a-z]{1,8}\\.ch"),
                groups in proptest::option::of(proptest::collection::vec("[a-z]{1,12}", 0..4)),
            ) {
                let input = IdentityClaims { sub: None, email, groups, ..Default::default() };
                let is_claim_error = matches!(extract(&input, now()), Err(AuthError::ClaimDecoding { .. }));
                prop_assert!(is_claim_error);
            }
        }
    }
}
