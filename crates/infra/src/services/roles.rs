use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use bizdesk_auth::{NewRole, Permission, PermissionMatrix, Role, RolePatch};
use bizdesk_core::{BusinessId, RoleId};

use super::{ServiceError, role_in_business};
use crate::store::{DeletedRole, Page, RecordStore, StoreError};

/// Role lifecycle within one business.
#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn RecordStore>,
}

impl RoleService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Create a role with one read-only permission row per module.
    ///
    /// The role and its rows are written together; on failure neither exists.
    pub async fn create_role(
        &self,
        business_id: BusinessId,
        input: NewRole,
    ) -> Result<(Role, Vec<Permission>), ServiceError> {
        let now = Utc::now();
        let role = input.into_role(business_id, now)?;
        let rows = Permission::default_batch(role.id, now);

        let (role, rows) = self
            .store
            .insert_role_with_permissions(role, rows)
            .await
            .inspect_err(|err| warn!(business_id = %business_id, error = %err, "role create rejected"))?;

        info!(business_id = %business_id, role_id = %role.id, name = %role.name, "role created");
        Ok((role, rows))
    }

    pub async fn update_role(
        &self,
        business_id: BusinessId,
        role_id: RoleId,
        patch: RolePatch,
    ) -> Result<Role, ServiceError> {
        let mut role = role_in_business(self.store.as_ref(), business_id, role_id).await?;
        role.apply_patch(patch, Utc::now())?;
        let role = self
            .store
            .update_role(role)
            .await
            .inspect_err(|err| warn!(role_id = %role_id, error = %err, "role update rejected"))?;
        Ok(role)
    }

    /// Delete a role and every permission row and employee link referencing it.
    pub async fn delete_role(&self, business_id: BusinessId, role_id: RoleId) -> Result<DeletedRole, ServiceError> {
        role_in_business(self.store.as_ref(), business_id, role_id).await?;
        let deleted = match self.store.delete_role_cascade(role_id).await {
            Ok(deleted) => deleted,
            Err(StoreError::NotFound(what)) => return Err(ServiceError::NotFound(what)),
            Err(err) => {
                warn!(role_id = %role_id, error = %err, "role delete rejected");
                return Err(err.into());
            }
        };
        info!(
            business_id = %business_id,
            role_id = %role_id,
            permissions_removed = deleted.permissions_removed,
            "role deleted"
        );
        Ok(deleted)
    }

    /// One page of the business's roles (ordered by name, case-insensitively)
    /// with their permission rows.
    pub async fn list(&self, business_id: BusinessId, page: Page) -> Result<PermissionMatrix, ServiceError> {
        let roles = self.store.roles_for_business(business_id, page).await?;
        let role_ids: Vec<RoleId> = roles.iter().map(|r| r.id).collect();
        let permissions = self.store.permissions_for_roles(&role_ids).await?;
        Ok(PermissionMatrix::new(roles, permissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_auth::{CapabilitySet, Module};
    use bizdesk_business::{ContactInfo, NewBusiness};
    use bizdesk_core::{DomainError, IdentityId};

    use crate::store::InMemoryRecordStore;

    async fn setup() -> (RoleService, BusinessId) {
        let store = Arc::new(InMemoryRecordStore::new());
        let business = NewBusiness {
            name: "Corner Shop".to_string(),
            contact: ContactInfo::default(),
        }
        .into_business(IdentityId::new(), Utc::now())
        .unwrap();
        let business = store.insert_business(business).await.unwrap();
        (RoleService::new(store), business.id)
    }

    fn new_role(name: &str) -> NewRole {
        NewRole {
            name: name.to_string(),
            description: Some("Front counter".to_string()),
        }
    }

    #[tokio::test]
    async fn new_role_has_ten_read_only_rows() {
        let (service, business_id) = setup().await;
        let (role, rows) = service.create_role(business_id, new_role("Cashier")).await.unwrap();

        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|p| p.role_id == role.id));
        assert!(rows.iter().all(|p| p.capabilities == CapabilitySet::read_only()));

        let matrix = service.list(business_id, Page::ALL).await.unwrap();
        assert_eq!(matrix.rows_for(role.id).count(), 10);
        for module in Module::ALL {
            assert_eq!(matrix.capabilities(role.id, module), CapabilitySet::read_only());
        }
    }

    #[tokio::test]
    async fn list_pages_roles_in_case_insensitive_name_order() {
        let (service, business_id) = setup().await;
        for name in ["manager", "Cashier", "auditor"] {
            service.create_role(business_id, new_role(name)).await.unwrap();
        }

        let names = |matrix: PermissionMatrix| -> Vec<String> {
            matrix.grid().into_iter().map(|g| g.role.name).collect()
        };
        let all = service.list(business_id, Page::ALL).await.unwrap();
        assert_eq!(names(all), vec!["auditor", "Cashier", "manager"]);

        let second = service.list(business_id, Page::new(Some(1), Some(1))).await.unwrap();
        let grid = second.grid();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].role.name, "Cashier");
        assert_eq!(second.rows_for(grid[0].role.id).count(), 10);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_any_write() {
        let (service, business_id) = setup().await;
        let err = service.create_role(business_id, new_role("  ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(DomainError::Validation(_))));
        assert!(service.list(business_id, Page::ALL).await.unwrap().roles().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let (service, business_id) = setup().await;
        service.create_role(business_id, new_role("Cashier")).await.unwrap();
        let err = service.create_role(business_id, new_role("CASHIER")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_renames_and_clears_description() {
        let (service, business_id) = setup().await;
        let (role, _) = service.create_role(business_id, new_role("Cashier")).await.unwrap();

        let updated = service
            .update_role(
                business_id,
                role.id,
                RolePatch {
                    name: Some("Senior Cashier".to_string()),
                    description: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Senior Cashier");
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn role_of_other_business_is_not_found() {
        let (service, business_id) = setup().await;
        let (role, _) = service.create_role(business_id, new_role("Cashier")).await.unwrap();

        let err = service.delete_role(BusinessId::new(), role.id).await.unwrap_err();
        assert_eq!(err, ServiceError::NotFound("role"));
        assert!(service.list(business_id, Page::ALL).await.unwrap().role(role.id).is_some());
    }

    #[tokio::test]
    async fn delete_leaves_no_rows_behind() {
        let (service, business_id) = setup().await;
        let (role, _) = service.create_role(business_id, new_role("Cashier")).await.unwrap();
        let (kept, _) = service.create_role(business_id, new_role("Manager")).await.unwrap();

        let deleted = service.delete_role(business_id, role.id).await.unwrap();
        assert_eq!(deleted.permissions_removed, 10);

        let matrix = service.list(business_id, Page::ALL).await.unwrap();
        assert!(matrix.role(role.id).is_none());
        assert_eq!(matrix.rows_for(role.id).count(), 0);
        assert_eq!(matrix.rows_for(kept.id).count(), 10);
    }
}
