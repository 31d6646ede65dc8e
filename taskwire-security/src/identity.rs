//! `AuthenticatedUser`: the identity a decoded JWT's claims resolve to,
//! grounded in `r2e-security/src/identity.rs` (`AuthenticatedUser`,
//! `build_authenticated_user`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard JWT claims this crate understands, plus whatever else the
/// issuer put in the token (spec SPEC_FULL §4 security addendum).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The identity attached to a session once its bearer token has been
/// verified (spec SPEC_FULL §4 "per-session identity").
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub sub: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub claims: HashMap<String, serde_json::Value>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: Claims) -> Self {
        Self { sub: claims.sub, email: claims.email, roles: claims.roles, claims: claims.extra }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims {
            sub: "user-1".into(),
            email: Some("user@example.com".into()),
            roles: vec!["admin".into(), "editor".into()],
            exp: 9_999_999_999,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn has_role_checks_membership() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert!(user.has_role("admin"));
        assert!(!user.has_role("owner"));
    }

    #[test]
    fn has_any_role_matches_first_hit() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert!(user.has_any_role(&["owner", "editor"]));
        assert!(!user.has_any_role(&["owner", "billing"]));
    }
}
