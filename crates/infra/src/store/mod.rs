//! Record store boundary.
//!
//! Every persistent read and write of businesses, roles, permission rows and
//! employee profiles goes through [`RecordStore`]. Compound writes (a role with
//! its default rows, a role delete with its rows) are atomic in every
//! implementation, and `(role_id, module)` is unique at the store level.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use bizdesk_auth::{Capability, Module, Permission, Role};
use bizdesk_business::{Business, EmployeeProfile};
use bizdesk_core::{BusinessId, EmployeeId, IdentityId, RoleId};

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Record store failures.
///
/// `Rejected` and `Conflict` carry the store's own message so callers can
/// surface it verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("rejected by store: {0}")]
    Rejected(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Range pagination for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Page {
    /// Everything, for callers that materialize a whole business view.
    pub const ALL: Page = Page {
        offset: 0,
        limit: u32::MAX,
    };

    pub fn new(offset: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(50).min(500),
        }
    }

    pub(crate) fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Result of a cascading role delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedRole {
    pub role: Role,
    pub permissions_removed: usize,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    // -- businesses --

    async fn insert_business(&self, business: Business) -> Result<Business, StoreError>;

    /// Every business owned by `owner_id`, oldest first.
    async fn business_by_owner(&self, owner_id: IdentityId) -> Result<Vec<Business>, StoreError>;

    async fn business(&self, business_id: BusinessId) -> Result<Option<Business>, StoreError>;

    async fn update_business(&self, business: Business) -> Result<Business, StoreError>;

    /// Exact number of businesses in the store.
    async fn count_businesses(&self) -> Result<u64, StoreError>;

    // -- roles --

    /// Insert a role together with its permission rows, all or nothing.
    /// A role name already used in the business (case-insensitive) is a `Conflict`.
    async fn insert_role_with_permissions(
        &self,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Result<(Role, Vec<Permission>), StoreError>;

    /// Roles of a business ordered by name.
    async fn roles_for_business(&self, business_id: BusinessId, page: Page) -> Result<Vec<Role>, StoreError>;

    async fn role(&self, role_id: RoleId) -> Result<Option<Role>, StoreError>;

    async fn update_role(&self, role: Role) -> Result<Role, StoreError>;

    /// Delete every permission row of the role, its employee links, then the
    /// role itself, atomically.
    async fn delete_role_cascade(&self, role_id: RoleId) -> Result<DeletedRole, StoreError>;

    // -- permissions --

    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError>;

    async fn permission(&self, role_id: RoleId, module: Module) -> Result<Option<Permission>, StoreError>;

    /// Set one capability on the (role, module) row.
    ///
    /// An existing row has only that field patched. A missing row is inserted
    /// with that field set to `value` and the other three false. Two racing
    /// first toggles on different fields end up in one row carrying both.
    async fn upsert_capability(
        &self,
        role_id: RoleId,
        module: Module,
        capability: Capability,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<Permission, StoreError>;

    // -- employees --

    async fn insert_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError>;

    /// Replace an existing profile. Identity links are not changed.
    async fn update_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError>;

    /// Employees of a business ordered by name.
    async fn employees_for_business(
        &self,
        business_id: BusinessId,
        page: Page,
    ) -> Result<Vec<EmployeeProfile>, StoreError>;

    async fn employee(&self, employee_id: EmployeeId) -> Result<Option<EmployeeProfile>, StoreError>;

    async fn employee_by_identity(&self, identity_id: IdentityId) -> Result<Option<EmployeeProfile>, StoreError>;

    /// Link a role to an employee. Linking twice is a no-op.
    async fn assign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<(), StoreError>;

    /// Returns whether a link was removed.
    async fn unassign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<bool, StoreError>;

    async fn roles_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<RoleId>, StoreError>;
}

#[async_trait]
impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn insert_business(&self, business: Business) -> Result<Business, StoreError> {
        (**self).insert_business(business).await
    }

    async fn business_by_owner(&self, owner_id: IdentityId) -> Result<Vec<Business>, StoreError> {
        (**self).business_by_owner(owner_id).await
    }

    async fn business(&self, business_id: BusinessId) -> Result<Option<Business>, StoreError> {
        (**self).business(business_id).await
    }

    async fn update_business(&self, business: Business) -> Result<Business, StoreError> {
        (**self).update_business(business).await
    }

    async fn count_businesses(&self) -> Result<u64, StoreError> {
        (**self).count_businesses().await
    }

    async fn insert_role_with_permissions(
        &self,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Result<(Role, Vec<Permission>), StoreError> {
        (**self).insert_role_with_permissions(role, permissions).await
    }

    async fn roles_for_business(&self, business_id: BusinessId, page: Page) -> Result<Vec<Role>, StoreError> {
        (**self).roles_for_business(business_id, page).await
    }

    async fn role(&self, role_id: RoleId) -> Result<Option<Role>, StoreError> {
        (**self).role(role_id).await
    }

    async fn update_role(&self, role: Role) -> Result<Role, StoreError> {
        (**self).update_role(role).await
    }

    async fn delete_role_cascade(&self, role_id: RoleId) -> Result<DeletedRole, StoreError> {
        (**self).delete_role_cascade(role_id).await
    }

    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError> {
        (**self).permissions_for_roles(role_ids).await
    }

    async fn permission(&self, role_id: RoleId, module: Module) -> Result<Option<Permission>, StoreError> {
        (**self).permission(role_id, module).await
    }

    async fn upsert_capability(
        &self,
        role_id: RoleId,
        module: Module,
        capability: Capability,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<Permission, StoreError> {
        (**self).upsert_capability(role_id, module, capability, value, now).await
    }

    async fn insert_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError> {
        (**self).insert_employee(employee).await
    }

    async fn update_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError> {
        (**self).update_employee(employee).await
    }

    async fn employees_for_business(
        &self,
        business_id: BusinessId,
        page: Page,
    ) -> Result<Vec<EmployeeProfile>, StoreError> {
        (**self).employees_for_business(business_id, page).await
    }

    async fn employee(&self, employee_id: EmployeeId) -> Result<Option<EmployeeProfile>, StoreError> {
        (**self).employee(employee_id).await
    }

    async fn employee_by_identity(&self, identity_id: IdentityId) -> Result<Option<EmployeeProfile>, StoreError> {
        (**self).employee_by_identity(identity_id).await
    }

    async fn assign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<(), StoreError> {
        (**self).assign_role(employee_id, role_id).await
    }

    async fn unassign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<bool, StoreError> {
        (**self).unassign_role(employee_id, role_id).await
    }

    async fn roles_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<RoleId>, StoreError> {
        (**self).roles_for_employee(employee_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_caps_limit() {
        let page = Page::new(Some(10), Some(10_000));
        assert_eq!(page.offset, 10);
        assert_eq!(page.limit, 500);
    }

    #[test]
    fn page_apply_slices() {
        let page = Page { offset: 2, limit: 3 };
        assert_eq!(page.apply(0..10), vec![2, 3, 4]);
        assert_eq!(Page::ALL.apply(0..4).len(), 4);
    }
}
