use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use bizdesk_auth::{
    AuthorizationExplanation, Capability, Module, Permission, PermissionMatrix, Principal, authorize,
    explain_authorization,
};
use bizdesk_core::{BusinessId, IdentityId, RoleId};

use super::{ServiceError, role_in_business};
use crate::scope::BusinessScope;
use crate::store::{Page, RecordStore};

/// Permission matrix edits and capability checks.
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn RecordStore>,
    scope: BusinessScope,
}

impl PermissionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let scope = BusinessScope::new(store.clone());
        Self { store, scope }
    }

    /// Set one capability of a (role, module) pair.
    ///
    /// Patches only that field when the row exists; otherwise creates the
    /// row with that field set and the rest false.
    pub async fn set_permission(
        &self,
        business_id: BusinessId,
        role_id: RoleId,
        module: Module,
        capability: Capability,
        value: bool,
    ) -> Result<Permission, ServiceError> {
        role_in_business(self.store.as_ref(), business_id, role_id).await?;
        let row = self
            .store
            .upsert_capability(role_id, module, capability, value, Utc::now())
            .await
            .inspect_err(|err| warn!(role_id = %role_id, module = %module, error = %err, "permission toggle rejected"))?;
        debug!(
            role_id = %role_id,
            module = %module,
            capability = %capability,
            value,
            "permission toggled"
        );
        Ok(row)
    }

    /// Whether the role holds `capability` on `module`. No row means no.
    pub async fn check(
        &self,
        business_id: BusinessId,
        role_id: RoleId,
        module: Module,
        capability: Capability,
    ) -> Result<bool, ServiceError> {
        role_in_business(self.store.as_ref(), business_id, role_id).await?;
        Ok(self
            .store
            .permission(role_id, module)
            .await?
            .is_some_and(|row| row.allows(capability)))
    }

    /// Resolve the caller and the permission matrix of their business.
    pub async fn capabilities_for_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<(Principal, PermissionMatrix), ServiceError> {
        let principal = self.scope.principal(identity_id).await?;
        let roles = self
            .store
            .roles_for_business(principal.business_id, Page::ALL)
            .await?;
        let role_ids: Vec<RoleId> = roles.iter().map(|r| r.id).collect();
        let rows = self.store.permissions_for_roles(&role_ids).await?;
        Ok((principal, PermissionMatrix::new(roles, rows)))
    }

    /// Resolve the caller and require `capability` on `module` in their business.
    pub async fn authorize_identity(
        &self,
        identity_id: IdentityId,
        module: Module,
        capability: Capability,
    ) -> Result<Principal, ServiceError> {
        let (principal, matrix) = self.capabilities_for_identity(identity_id).await?;
        authorize(&principal, principal.business_id, &matrix, module, capability)?;
        Ok(principal)
    }

    pub async fn explain(
        &self,
        identity_id: IdentityId,
        module: Module,
        capability: Capability,
    ) -> Result<AuthorizationExplanation, ServiceError> {
        let (principal, matrix) = self.capabilities_for_identity(identity_id).await?;
        Ok(explain_authorization(
            &principal,
            principal.business_id,
            &matrix,
            module,
            capability,
        ))
    }
}
