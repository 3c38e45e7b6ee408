//! Identity provider boundary: sign-up, sign-in, sign-out and session lookup.
//!
//! Sessions are HS256 bearer tokens. Sign-out revokes the token's session id;
//! a revoked or expired token no longer resolves to a session. Revocations are
//! kept only until the token would have expired anyway.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use bizdesk_auth::{Hs256Jwt, Identity, JwtError, JwtValidator, PasswordError, SessionClaims, TokenIssuer};
use bizdesk_core::IdentityId;

pub use in_memory::InMemoryIdentityProvider;
pub use postgres::PostgresIdentityProvider;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid email address")]
    InvalidEmail,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error("identity backend error: {0}")]
    Backend(String),
}

/// An issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Broadcast whenever a session starts or ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn { identity: Identity, session_id: Uuid },
    SignedOut { identity_id: IdentityId, session_id: Uuid },
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    /// Revoke the session behind `token`. Signing out twice is a no-op.
    async fn sign_out(&self, token: &str) -> Result<(), IdentityError>;

    /// The live session for `token`; `None` if it is invalid, expired or revoked.
    async fn current_session(&self, token: &str) -> Option<Session>;

    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;
}

/// Token minting, validation and change notification shared by providers.
/// Account storage and revocation bookkeeping stay with each provider.
pub(crate) struct SessionTokens {
    jwt: Arc<Hs256Jwt>,
    ttl: Duration,
    changes: broadcast::Sender<SessionChange>,
}

impl SessionTokens {
    pub(crate) fn new(jwt: Arc<Hs256Jwt>, ttl: Duration) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { jwt, ttl, changes }
    }

    /// Mint a session for `identity` and announce it.
    pub(crate) fn issue(&self, identity: Identity) -> Result<Session, IdentityError> {
        let claims = SessionClaims::new(identity.id, &identity.email, Utc::now(), self.ttl);
        let access_token = self.jwt.issue(&claims)?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| IdentityError::Backend("session expiry out of range".to_string()))?;
        let session = Session {
            identity,
            access_token,
            session_id: claims.sid,
            expires_at,
        };

        // No receivers is fine.
        let _ = self.changes.send(SessionChange::SignedIn {
            identity: session.identity.clone(),
            session_id: session.session_id,
        });
        info!(identity_id = %session.identity.id, "signed in");
        Ok(session)
    }

    /// Signature and time window only; revocation is checked by the caller.
    pub(crate) fn validate(&self, token: &str) -> Result<SessionClaims, IdentityError> {
        Ok(self.jwt.validate(token, Utc::now())?)
    }

    pub(crate) fn signed_out(&self, claims: &SessionClaims) {
        let _ = self.changes.send(SessionChange::SignedOut {
            identity_id: claims.sub,
            session_id: claims.sid,
        });
        info!(identity_id = %claims.sub, "signed out");
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}

/// Rebuild the session a still-valid token stands for.
pub(crate) fn session_from_claims(claims: SessionClaims, token: &str) -> Option<Session> {
    let expires_at = claims.expires_at()?;
    Some(Session {
        identity: Identity {
            id: claims.sub,
            email: claims.email,
        },
        access_token: token.to_string(),
        session_id: claims.sid,
        expires_at,
    })
}

pub(crate) fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(IdentityError::InvalidEmail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email(" Owner@Shop.Example ").unwrap(), "owner@shop.example");
        assert_eq!(normalize_email("no-at-sign"), Err(IdentityError::InvalidEmail));
        assert_eq!(normalize_email("@shop.example"), Err(IdentityError::InvalidEmail));
    }

    #[tokio::test]
    async fn issued_session_round_trips_through_validation() {
        let tokens = SessionTokens::new(Arc::new(Hs256Jwt::new("test-secret")), Duration::minutes(5));
        let mut changes = tokens.subscribe();
        let identity = Identity {
            id: IdentityId::new(),
            email: "owner@shop.example".to_string(),
        };

        let session = tokens.issue(identity.clone()).unwrap();
        let claims = tokens.validate(&session.access_token).unwrap();
        assert_eq!(claims.sid, session.session_id);
        assert_eq!(session_from_claims(claims, &session.access_token), Some(session.clone()));
        assert_eq!(
            changes.recv().await.unwrap(),
            SessionChange::SignedIn {
                identity,
                session_id: session.session_id,
            }
        );
    }
}
