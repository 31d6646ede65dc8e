//! Decode a bearer token into [`Claims`], grounded in
//! `r2e-security/src/identity.rs`'s `ClaimsIdentity`/
//! `impl_claims_identity_extractor!` flow but without the extractor
//! macro (spec §9: table-driven over code generation).

use crate::identity::Claims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("missing or malformed bearer token")]
    Malformed,
    #[error("token verification failed: {0}")]
    Invalid(String),
}

/// Verifies and decodes bearer tokens with a single fixed key and
/// algorithm (spec SPEC_FULL §4: one verification key per deployment;
/// multi-issuer/JWKS rotation is out of scope).
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self { key: DecodingKey::from_secret(secret), validation: Validation::new(algorithm) }
    }

    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::Invalid(e.to_string()))
    }

    /// Decode an `Authorization` header's credential part, requiring a
    /// `Bearer` scheme (spec §6 "Authorization header").
    pub fn decode_authorization(&self, auth: &taskwire_core::task::Authorization) -> Result<Claims, JwtError> {
        if !auth.scheme.eq_ignore_ascii_case("bearer") {
            return Err(JwtError::Malformed);
        }
        self.decode(&auth.credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::collections::HashMap;
    use taskwire_core::task::Authorization;

    fn make_token(secret: &[u8]) -> String {
        let claims = Claims {
            sub: "user-1".into(),
            email: None,
            roles: vec!["admin".into()],
            exp: 9_999_999_999,
            extra: HashMap::new(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn valid_token_decodes_to_claims() {
        let secret = b"test-secret";
        let validator = JwtValidator::new(secret, Algorithm::HS256);
        let token = make_token(secret);
        let claims = validator.decode(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.roles, vec!["admin".to_string()]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let validator = JwtValidator::new(b"test-secret", Algorithm::HS256);
        let token = make_token(b"other-secret");
        assert!(validator.decode(&token).is_err());
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let validator = JwtValidator::new(b"test-secret", Algorithm::HS256);
        let auth = Authorization { scheme: "Basic".into(), credentials: "abc".into() };
        assert!(matches!(validator.decode_authorization(&auth), Err(JwtError::Malformed)));
    }
}
