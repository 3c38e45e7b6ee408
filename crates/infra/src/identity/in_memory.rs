//! Process-local identity provider.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bizdesk_auth::{Hs256Jwt, Identity, SessionClaims, hash_password, verify_password};
use bizdesk_core::IdentityId;

use super::{
    IdentityError, IdentityProvider, Session, SessionChange, SessionTokens, normalize_email, session_from_claims,
};

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password_hash: String,
}

/// Process-local identity provider for dev/tests. Accounts are lost on restart.
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    /// Revoked session id -> token expiry (unix seconds).
    revoked: RwLock<HashMap<Uuid, i64>>,
    tokens: SessionTokens,
}

impl InMemoryIdentityProvider {
    pub fn new(jwt: Arc<Hs256Jwt>, ttl: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashMap::new()),
            tokens: SessionTokens::new(jwt, ttl),
        }
    }

    fn lock_error() -> IdentityError {
        IdentityError::Backend("identity store lock poisoned".to_string())
    }

    fn claims_for(&self, token: &str) -> Result<SessionClaims, IdentityError> {
        let claims = self.tokens.validate(token)?;
        let revoked = self.revoked.read().map_err(|_| Self::lock_error())?;
        if revoked.contains_key(&claims.sid) {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(claims)
    }

    /// Record a revocation, dropping entries whose tokens have expired.
    fn revoke(&self, claims: &SessionClaims) -> Result<bool, IdentityError> {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().map_err(|_| Self::lock_error())?;
        revoked.retain(|_, exp| *exp > now);
        Ok(revoked.insert(claims.sid, claims.exp).is_none())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email)?;
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts.write().map_err(|_| Self::lock_error())?;
        if accounts.contains_key(&email) {
            return Err(IdentityError::EmailTaken);
        }
        let identity = Identity {
            id: IdentityId::new(),
            email: email.clone(),
        };
        accounts.insert(
            email,
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        info!(identity_id = %identity.id, "identity registered");
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let account = {
            let accounts = self.accounts.read().map_err(|_| Self::lock_error())?;
            accounts.get(&email).cloned()
        };
        let Some(account) = account.filter(|a| verify_password(password, &a.password_hash)) else {
            warn!("sign-in rejected");
            return Err(IdentityError::InvalidCredentials);
        };
        self.tokens.issue(account.identity)
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let claims = self.tokens.validate(token)?;
        if self.revoke(&claims)? {
            self.tokens.signed_out(&claims);
        }
        Ok(())
    }

    async fn current_session(&self, token: &str) -> Option<Session> {
        match self.claims_for(token) {
            Ok(claims) => session_from_claims(claims, token),
            Err(err) => {
                debug!(error = %err, "session lookup failed");
                None
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.tokens.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_auth::PasswordError;

    fn provider() -> InMemoryIdentityProvider {
        InMemoryIdentityProvider::new(Arc::new(Hs256Jwt::new("test-secret")), Duration::minutes(30))
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let idp = provider();
        let identity = idp.sign_up("Owner@Shop.Example", "hunter22").await.unwrap();
        assert_eq!(identity.email, "owner@shop.example");

        let session = idp.sign_in("owner@shop.example", "hunter22").await.unwrap();
        assert_eq!(session.identity, identity);

        let current = idp.current_session(&session.access_token).await.unwrap();
        assert_eq!(current.identity.id, identity.id);
        assert_eq!(current.session_id, session.session_id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let idp = provider();
        idp.sign_up("a@shop.example", "hunter22").await.unwrap();
        assert_eq!(
            idp.sign_up("A@shop.example", "other-pass").await.unwrap_err(),
            IdentityError::EmailTaken
        );
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let idp = provider();
        idp.sign_up("a@shop.example", "hunter22").await.unwrap();
        assert_eq!(
            idp.sign_in("a@shop.example", "nope-nope").await.unwrap_err(),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            idp.sign_in("ghost@shop.example", "hunter22").await.unwrap_err(),
            IdentityError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let idp = provider();
        assert!(matches!(
            idp.sign_up("a@shop.example", "abc").await,
            Err(IdentityError::Password(PasswordError::TooShort(_)))
        ));
    }

    #[tokio::test]
    async fn sign_out_revokes_session_and_notifies() {
        let idp = provider();
        let mut changes = idp.subscribe();
        idp.sign_up("a@shop.example", "hunter22").await.unwrap();
        let session = idp.sign_in("a@shop.example", "hunter22").await.unwrap();

        idp.sign_out(&session.access_token).await.unwrap();
        idp.sign_out(&session.access_token).await.unwrap();
        assert!(idp.current_session(&session.access_token).await.is_none());

        assert!(matches!(changes.recv().await.unwrap(), SessionChange::SignedIn { .. }));
        assert_eq!(
            changes.recv().await.unwrap(),
            SessionChange::SignedOut {
                identity_id: session.identity.id,
                session_id: session.session_id,
            }
        );
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn expired_revocations_are_pruned() {
        let idp = provider();
        let stale = Uuid::now_v7();
        idp.revoked
            .write()
            .unwrap()
            .insert(stale, Utc::now().timestamp() - 60);

        idp.sign_up("a@shop.example", "hunter22").await.unwrap();
        let session = idp.sign_in("a@shop.example", "hunter22").await.unwrap();
        idp.sign_out(&session.access_token).await.unwrap();

        let revoked = idp.revoked.read().unwrap();
        assert!(!revoked.contains_key(&stale));
        assert!(revoked.contains_key(&session.session_id));
        assert_eq!(revoked.len(), 1);
    }

    #[tokio::test]
    async fn garbage_token_has_no_session() {
        let idp = provider();
        assert!(idp.current_session("not-a-token").await.is_none());
    }
}
