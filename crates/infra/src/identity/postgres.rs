//! Postgres-backed identity provider.
//!
//! Accounts (email + argon2 hash) live in `identities`; sign-outs are kept in
//! `revoked_sessions` until the revoked token would have expired. Both tables
//! sit next to the record store's, so owner and employee identity ids stay
//! valid across restarts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use bizdesk_auth::{Hs256Jwt, Identity, SessionClaims, hash_password, verify_password};
use bizdesk_core::IdentityId;

use super::{
    IdentityError, IdentityProvider, Session, SessionChange, SessionTokens, normalize_email, session_from_claims,
};

/// Schema statements applied by [`PostgresIdentityProvider::migrate`]. Idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS identities (
        id            UUID PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS revoked_sessions (
        session_id  UUID PRIMARY KEY,
        identity_id UUID NOT NULL,
        expires_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS revoked_sessions_expiry_idx ON revoked_sessions (expires_at)",
];

pub struct PostgresIdentityProvider {
    pool: PgPool,
    tokens: SessionTokens,
}

impl PostgresIdentityProvider {
    /// `pool` is usually the record store's, from [`crate::PostgresRecordStore::pool`].
    pub fn new(pool: PgPool, jwt: Arc<Hs256Jwt>, ttl: Duration) -> Self {
        Self {
            pool,
            tokens: SessionTokens::new(jwt, ttl),
        }
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), IdentityError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn is_revoked(&self, session_id: Uuid) -> Result<bool, IdentityError> {
        let row = sqlx::query("SELECT 1 FROM revoked_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_revoked", e))?;
        Ok(row.is_some())
    }

    /// Record a revocation, dropping rows whose tokens have expired.
    async fn revoke(&self, claims: &SessionClaims) -> Result<bool, IdentityError> {
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| IdentityError::Backend("session expiry out of range".to_string()))?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("prune_revoked", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO revoked_sessions (session_id, identity_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(claims.sid)
        .bind(claims.sub.as_uuid())
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("revoke", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(inserted.rows_affected() == 1)
    }
}

#[async_trait]
impl IdentityProvider for PostgresIdentityProvider {
    #[instrument(skip(self, email, password), err)]
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email)?;
        let password_hash = hash_password(password)?;
        let identity = Identity {
            id: IdentityId::new(),
            email,
        };

        sqlx::query("INSERT INTO identities (id, email, password_hash, created_at) VALUES ($1, $2, $3, $4)")
            .bind(identity.id.as_uuid())
            .bind(&identity.email)
            .bind(&password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("sign_up", e))?;

        info!(identity_id = %identity.id, "identity registered");
        Ok(identity)
    }

    #[instrument(skip(self, email, password), err)]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = normalize_email(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let row = sqlx::query("SELECT id, email, password_hash FROM identities WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("sign_in", e))?;

        let account = match row {
            Some(row) => {
                let id: Uuid = row.try_get("id").map_err(|e| map_sqlx_error("sign_in", e))?;
                let email: String = row.try_get("email").map_err(|e| map_sqlx_error("sign_in", e))?;
                let hash: String = row
                    .try_get("password_hash")
                    .map_err(|e| map_sqlx_error("sign_in", e))?;
                Some((Identity { id: IdentityId::from(id), email }, hash))
            }
            None => None,
        };
        let Some((identity, _)) = account.filter(|(_, hash)| verify_password(password, hash)) else {
            warn!("sign-in rejected");
            return Err(IdentityError::InvalidCredentials);
        };
        self.tokens.issue(identity)
    }

    async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        let claims = self.tokens.validate(token)?;
        if self.revoke(&claims).await? {
            self.tokens.signed_out(&claims);
        }
        Ok(())
    }

    async fn current_session(&self, token: &str) -> Option<Session> {
        let claims = match self.tokens.validate(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "session lookup failed");
                return None;
            }
        };
        match self.is_revoked(claims.sid).await {
            Ok(false) => session_from_claims(claims, token),
            Ok(true) => None,
            Err(err) => {
                warn!(error = %err, "revocation lookup failed");
                None
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.tokens.subscribe()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> IdentityError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => IdentityError::EmailTaken,
        sqlx::Error::Database(db_err) => {
            IdentityError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        _ => IdentityError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_unique_at_the_table_level() {
        assert!(SCHEMA
            .iter()
            .any(|s| s.contains("identities") && s.contains("email         TEXT NOT NULL UNIQUE")));
    }

    #[test]
    fn revocations_carry_their_expiry() {
        assert!(SCHEMA
            .iter()
            .any(|s| s.contains("revoked_sessions") && s.contains("expires_at  TIMESTAMPTZ NOT NULL")));
    }

    #[test]
    fn closed_pool_is_a_backend_error() {
        assert!(matches!(
            map_sqlx_error("sign_in", sqlx::Error::PoolClosed),
            IdentityError::Backend(_)
        ));
    }
}
