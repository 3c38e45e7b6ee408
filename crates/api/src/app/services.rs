//! Service wiring: record store, identity provider and the services on top.

use std::sync::Arc;

use bizdesk_auth::Hs256Jwt;
use bizdesk_infra::{
    BusinessScope, EmployeeService, IdentityError, IdentityProvider, InMemoryIdentityProvider, InMemoryRecordStore,
    PermissionService, PostgresIdentityProvider, PostgresRecordStore, RecordStore, RoleService, StoreError,
};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("record store: {0}")]
    Store(#[from] StoreError),

    #[error("identity provider: {0}")]
    Identity(#[from] IdentityError),
}

#[derive(Clone)]
pub struct AppServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub scope: BusinessScope,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub employees: EmployeeService,
}

impl AppServices {
    pub fn new(store: Arc<dyn RecordStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            scope: BusinessScope::new(store.clone()),
            roles: RoleService::new(store.clone()),
            permissions: PermissionService::new(store.clone()),
            employees: EmployeeService::new(store),
        }
    }

    /// In-memory store and identity provider (dev/test).
    pub fn in_memory(jwt_secret: &str, session_ttl: chrono::Duration) -> Self {
        let jwt = Arc::new(Hs256Jwt::new(jwt_secret));
        Self::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryIdentityProvider::new(jwt, session_ttl)),
        )
    }

    /// Postgres store and identity provider when `DATABASE_URL` is configured,
    /// in-memory otherwise. Both share one pool so accounts outlive restarts
    /// together with the businesses they own.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let Some(database_url) = config.database_url.as_deref() else {
            tracing::info!("DATABASE_URL not set; using in-memory record store and identity provider");
            return Ok(Self::in_memory(&config.jwt_secret, config.session_ttl));
        };

        let store = PostgresRecordStore::connect(database_url).await?;
        store.migrate().await?;

        let jwt = Arc::new(Hs256Jwt::new(&config.jwt_secret));
        let identity = PostgresIdentityProvider::new(store.pool(), jwt, config.session_ttl);
        identity.migrate().await?;
        tracing::info!("using postgres record store and identity provider");

        Ok(Self::new(Arc::new(store), Arc::new(identity)))
    }
}
