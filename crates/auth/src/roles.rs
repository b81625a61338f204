use serde::{Deserialize, Serialize};

/// Platform role. Closed set: every identity resolves to exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Platform administrator.
    Admin,
    /// Member of a Betrieb (tenant).
    Betrieb,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Betrieb => "BETRIEB",
        }
    }
}

impl core::fmt::Display for UserRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group names (compared case-insensitively) that grant [`UserRole::Admin`].
pub const ADMIN_GROUPS: &[&str] = &["admin", "administrator", "administrators"];

/// Group names (compared case-insensitively) that map to [`UserRole::Betrieb`].
pub const BETRIEB_GROUPS: &[&str] = &["betrieb", "company", "arbeiter", "worker"];

/// Derive the role from the token's group memberships.
///
/// Order-independent: any admin group wins over member groups. Missing,
/// empty or unrecognized groups fall back to [`UserRole::Betrieb`]; this never
/// fails.
pub fn resolve_role(groups: Option<&[String]>) -> UserRole {
    let Some(groups) = groups.filter(|g| !g.is_empty()) else {
        tracing::debug!("no groups in token, defaulting to BETRIEB");
        return UserRole::Betrieb;
    };

    if contains_marker(groups, ADMIN_GROUPS) {
        return UserRole::Admin;
    }
    if contains_marker(groups, BETRIEB_GROUPS) {
        return UserRole::Betrieb;
    }

    tracing::debug!(?groups, "no recognized role in groups, defaulting to BETRIEB");
    UserRole::Betrieb
}

fn contains_marker(groups: &[String], markers: &[&str]) -> bool {
    groups
        .iter()
        .any(|group| markers.iter().any(|m| group.eq_ignore_ascii_case(m)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn admin_synonyms_any_case() {
        for g in ["admin", "ADMIN", "Administrators", "administrator"] {
            assert_eq!(resolve_role(Some(groups(&[g]).as_slice())), UserRole::Admin, "group {g}");
        }
    }

    #[test]
    fn member_synonyms() {
        for g in ["betrieb", "Company", "ARBEITER", "worker"] {
            assert_eq!(resolve_role(Some(groups(&[g]).as_slice())), UserRole::Betrieb, "group {g}");
        }
    }

    #[test]
    fn admin_wins_regardless_of_position() {
        assert_eq!(
            resolve_role(Some(groups(&["worker", "unknown", "Admin"]).as_slice())),
            UserRole::Admin
        );
        assert_eq!(
            resolve_role(Some(groups(&["Admin", "worker"]).as_slice())),
            UserRole::Admin
        );
    }

    #[test]
    fn missing_empty_or_unknown_defaults_to_betrieb() {
        assert_eq!(resolve_role(None), UserRole::Betrieb);
        assert_eq!(resolve_role(Some(&[][..])), UserRole::Betrieb);
        assert_eq!(resolve_role(Some(groups(&["unknown-group"]).as_slice())), UserRole::Betrieb);
    }

    #[test]
    fn serializes_as_screaming_name() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(UserRole::Betrieb.to_string(), "BETRIEB");
    }
}
