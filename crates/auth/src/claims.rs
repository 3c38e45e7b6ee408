use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use bizdesk_core::IdentityId;

/// Session token claims (transport-agnostic).
///
/// Timestamps are unix seconds so the token stays interoperable with stock
/// JWT tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated identity.
    pub sub: IdentityId,
    pub email: String,
    /// Session id; sign-out revokes it.
    pub sid: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(sub: IdentityId, email: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            email: email.into(),
            sid: Uuid::now_v7(),
            iat: issued_at.timestamp(),
            exp: issued_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate session claims against `now`.
///
/// Signature checks happen in [`crate::jwt`]; this only looks at the time window.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(now: DateTime<Utc>) -> SessionClaims {
        SessionClaims::new(IdentityId::new(), "owner@shop.example", now, Duration::minutes(30))
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims_at(now), now), Ok(()));
    }

    #[test]
    fn expired_claims_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now);
        assert_eq!(
            validate_claims(&claims, now + Duration::minutes(31)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_claims_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(5));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_overflowing() {
        let now = Utc::now();
        let claims = SessionClaims::new(IdentityId::new(), "owner@shop.example", now, Duration::MAX);
        assert_eq!(claims.exp, DateTime::<Utc>::MAX_UTC.timestamp());
        assert_eq!(validate_claims(&claims, now), Ok(()));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let mut claims = claims_at(now);
        claims.exp = claims.iat;
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
