//! HS256 session tokens.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("malformed or tampered token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError>;
}

/// Signs claims into a bearer token.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> Result<String, JwtError>;
}

/// Shared-secret HS256 signer/verifier.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl TokenIssuer for Hs256Jwt {
    fn issue(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError> {
        // Time checks run against the caller's clock in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| JwtError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_core::IdentityId;
    use chrono::Duration;

    #[test]
    fn issued_token_validates() {
        let jwt = Hs256Jwt::new("test-secret");
        let now = Utc::now();
        let claims = SessionClaims::new(IdentityId::new(), "owner@shop.example", now, Duration::minutes(10));

        let token = jwt.issue(&claims).unwrap();
        assert_eq!(jwt.validate(&token, now).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let claims = SessionClaims::new(IdentityId::new(), "owner@shop.example", now, Duration::minutes(10));
        let token = Hs256Jwt::new("secret-a").issue(&claims).unwrap();

        let err = Hs256Jwt::new("secret-b").validate(&token, now).unwrap_err();
        assert!(matches!(err, JwtError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = Hs256Jwt::new("test-secret");
        let now = Utc::now();
        let claims = SessionClaims::new(IdentityId::new(), "owner@shop.example", now, Duration::minutes(1));
        let token = jwt.issue(&claims).unwrap();

        let err = jwt.validate(&token, now + Duration::minutes(2)).unwrap_err();
        assert_eq!(err, JwtError::Claims(TokenValidationError::Expired));
    }
}
