//! Business-scope resolution: which business an identity acts in.
//!
//! Read-only apart from first-run [`BusinessScope::setup`] and settings edits.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use bizdesk_auth::{AppSession, Identity, Principal, Standing};
use bizdesk_business::{Business, BusinessPatch, NewBusiness};
use bizdesk_core::{BusinessId, DomainError, IdentityId};

use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// No business for this identity yet; the caller should go through setup.
    #[error("no business is set up for this account")]
    NotInitialized,

    #[error("account owns {0} businesses; cannot pick one")]
    Ambiguous(usize),

    #[error("account already owns a business")]
    AlreadySetUp,

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct BusinessScope {
    store: Arc<dyn RecordStore>,
}

impl BusinessScope {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The single business owned by `owner_id`.
    pub async fn resolve(&self, owner_id: IdentityId) -> Result<BusinessId, ScopeError> {
        Ok(self.resolve_business(owner_id).await?.id)
    }

    pub async fn resolve_business(&self, owner_id: IdentityId) -> Result<Business, ScopeError> {
        let mut owned = self.store.business_by_owner(owner_id).await?;
        match owned.len() {
            0 => Err(ScopeError::NotInitialized),
            1 => Ok(owned.remove(0)),
            n => {
                warn!(owner_id = %owner_id, businesses = n, "ambiguous business scope");
                Err(ScopeError::Ambiguous(n))
            }
        }
    }

    /// Resolve the caller as owner first, then as a linked employee.
    pub async fn principal(&self, identity_id: IdentityId) -> Result<Principal, ScopeError> {
        match self.resolve(identity_id).await {
            Ok(business_id) => return Ok(Principal::owner(identity_id, business_id)),
            Err(ScopeError::NotInitialized) => {}
            Err(other) => return Err(other),
        }

        let Some(employee) = self.store.employee_by_identity(identity_id).await? else {
            return Err(ScopeError::NotInitialized);
        };
        let role_ids = self.store.roles_for_employee(employee.id).await?;
        Ok(Principal {
            identity_id,
            business_id: employee.business_id,
            standing: Standing::Employee {
                employee_id: employee.id,
                role_ids,
                active: employee.is_active(),
            },
        })
    }

    /// First-run setup: create the business owned by `owner_id`.
    pub async fn setup(&self, owner_id: IdentityId, input: NewBusiness) -> Result<Business, ScopeError> {
        if !self.store.business_by_owner(owner_id).await?.is_empty() {
            return Err(ScopeError::AlreadySetUp);
        }
        let business = input.into_business(owner_id, Utc::now())?;
        let business = self.store.insert_business(business).await?;
        info!(business_id = %business.id, owner_id = %owner_id, "business set up");
        Ok(business)
    }

    /// Whether any business exists at all.
    pub async fn is_initialized(&self) -> Result<bool, StoreError> {
        Ok(self.store.count_businesses().await? > 0)
    }

    pub async fn business(&self, business_id: BusinessId) -> Result<Business, ScopeError> {
        self.store
            .business(business_id)
            .await?
            .ok_or(ScopeError::Store(StoreError::NotFound("business")))
    }

    /// Settings edit on the owner's business.
    pub async fn update_settings(&self, owner_id: IdentityId, patch: BusinessPatch) -> Result<Business, ScopeError> {
        let mut business = self.resolve_business(owner_id).await?;
        business.apply_patch(patch, Utc::now())?;
        Ok(self.store.update_business(business).await?)
    }

    /// Drive an [`AppSession`] through its load for `identity`.
    pub async fn load_session(&self, identity: Identity) -> AppSession {
        let mut session = AppSession::new();
        let identity_id = identity.id;
        if let Err(err) = session.begin(identity) {
            session.fail(err.to_string());
            return session;
        }

        let outcome = match self.resolve(identity_id).await {
            Ok(business_id) => session.resolve_owner(business_id),
            Err(ScopeError::NotInitialized) => match self.store.employee_by_identity(identity_id).await {
                Ok(Some(profile)) => session.resolve_employee(profile),
                Ok(None) => session.resolve_needs_setup(),
                Err(err) => {
                    session.fail(err.to_string());
                    Ok(())
                }
            },
            Err(err) => {
                session.fail(err.to_string());
                Ok(())
            }
        };
        if let Err(err) = outcome {
            session.fail(err.to_string());
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_auth::SessionPhase;
    use bizdesk_business::{ContactInfo, EmployeeStatus, NewEmployee};

    use crate::store::InMemoryRecordStore;

    fn scope() -> (BusinessScope, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        (BusinessScope::new(store.clone()), store)
    }

    fn new_business(name: &str) -> NewBusiness {
        NewBusiness {
            name: name.to_string(),
            contact: ContactInfo::default(),
        }
    }

    #[tokio::test]
    async fn unknown_owner_is_not_initialized() {
        let (scope, _) = scope();
        assert_eq!(scope.resolve(IdentityId::new()).await, Err(ScopeError::NotInitialized));
        assert!(!scope.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn resolve_is_stable_across_calls() {
        let (scope, _) = scope();
        let owner = IdentityId::new();
        let business = scope.setup(owner, new_business("Corner Shop")).await.unwrap();

        let first = scope.resolve(owner).await.unwrap();
        let second = scope.resolve(owner).await.unwrap();
        assert_eq!(first, business.id);
        assert_eq!(first, second);
        assert!(scope.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn second_setup_is_rejected() {
        let (scope, _) = scope();
        let owner = IdentityId::new();
        scope.setup(owner, new_business("Corner Shop")).await.unwrap();
        assert_eq!(
            scope.setup(owner, new_business("Second Shop")).await.unwrap_err(),
            ScopeError::AlreadySetUp
        );
    }

    #[tokio::test]
    async fn multiple_businesses_are_ambiguous() {
        let (scope, store) = scope();
        let owner = IdentityId::new();
        for name in ["One", "Two"] {
            let business = new_business(name).into_business(owner, Utc::now()).unwrap();
            store.insert_business(business).await.unwrap();
        }
        assert_eq!(scope.resolve(owner).await, Err(ScopeError::Ambiguous(2)));
    }

    #[tokio::test]
    async fn linked_employee_resolves_to_employee_principal() {
        let (scope, store) = scope();
        let owner = IdentityId::new();
        let business = scope.setup(owner, new_business("Corner Shop")).await.unwrap();

        let identity_id = IdentityId::new();
        let profile = NewEmployee {
            name: "Sam Teller".to_string(),
            email: "sam@shop.example".to_string(),
            branch_id: None,
            identity_id: Some(identity_id),
            phone: None,
            address: None,
            hire_date: None,
            status: EmployeeStatus::Active,
        }
        .into_profile(business.id, Utc::now())
        .unwrap();
        store.insert_employee(profile.clone()).await.unwrap();

        let principal = scope.principal(identity_id).await.unwrap();
        assert_eq!(principal.business_id, business.id);
        assert!(!principal.is_owner());

        let session = scope
            .load_session(Identity {
                id: identity_id,
                email: "sam@shop.example".to_string(),
            })
            .await;
        assert_eq!(session.phase(), &SessionPhase::Ready);
        assert_eq!(session.employee(), Some(&profile));
    }

    #[tokio::test]
    async fn fresh_identity_session_needs_setup() {
        let (scope, _) = scope();
        let session = scope
            .load_session(Identity {
                id: IdentityId::new(),
                email: "new@shop.example".to_string(),
            })
            .await;
        assert_eq!(session.phase(), &SessionPhase::NeedsSetup);
    }

    #[tokio::test]
    async fn settings_patch_updates_owned_business() {
        let (scope, _) = scope();
        let owner = IdentityId::new();
        scope.setup(owner, new_business("Corner Shop")).await.unwrap();

        let updated = scope
            .update_settings(
                owner,
                BusinessPatch {
                    name: Some("Corner Shop Ltd".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Corner Shop Ltd");
        assert_eq!(scope.business(updated.id).await.unwrap().name, "Corner Shop Ltd");
    }
}
