use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bizdesk_auth::{Capability, Module, Permission, Role};
use bizdesk_business::{Business, EmployeeProfile};
use bizdesk_core::{BusinessId, EmployeeId, IdentityId, RoleId};

use super::{DeletedRole, Page, RecordStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    businesses: HashMap<BusinessId, Business>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<(RoleId, Module), Permission>,
    employees: HashMap<EmployeeId, EmployeeProfile>,
    employee_roles: BTreeSet<(EmployeeId, RoleId)>,
}

impl Tables {
    fn name_taken(&self, role: &Role) -> bool {
        self.roles
            .values()
            .any(|r| r.business_id == role.business_id && r.id != role.id && r.same_name(&role.name))
    }
}

/// In-memory record store for tests/dev.
///
/// All tables sit behind one lock, so every compound write happens under a
/// single write guard and is never observed half-done.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("record store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("record store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_business(&self, business: Business) -> Result<Business, StoreError> {
        let mut tables = self.write()?;
        if tables.businesses.contains_key(&business.id) {
            return Err(StoreError::Conflict(format!("business {} already exists", business.id)));
        }
        tables.businesses.insert(business.id, business.clone());
        Ok(business)
    }

    async fn business_by_owner(&self, owner_id: IdentityId) -> Result<Vec<Business>, StoreError> {
        let tables = self.read()?;
        let mut owned: Vec<Business> = tables
            .businesses
            .values()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn business(&self, business_id: BusinessId) -> Result<Option<Business>, StoreError> {
        Ok(self.read()?.businesses.get(&business_id).cloned())
    }

    async fn update_business(&self, business: Business) -> Result<Business, StoreError> {
        let mut tables = self.write()?;
        let slot = tables
            .businesses
            .get_mut(&business.id)
            .ok_or(StoreError::NotFound("business"))?;
        *slot = business.clone();
        Ok(business)
    }

    async fn count_businesses(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.businesses.len() as u64)
    }

    async fn insert_role_with_permissions(
        &self,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Result<(Role, Vec<Permission>), StoreError> {
        let mut tables = self.write()?;

        if !tables.businesses.contains_key(&role.business_id) {
            return Err(StoreError::NotFound("business"));
        }
        if tables.roles.contains_key(&role.id) {
            return Err(StoreError::Conflict(format!("role {} already exists", role.id)));
        }
        if tables.name_taken(&role) {
            return Err(StoreError::Conflict(format!("role name '{}' is already in use", role.name)));
        }
        let mut seen = BTreeSet::new();
        for permission in &permissions {
            if permission.role_id != role.id {
                return Err(StoreError::Rejected("permission row references another role".to_string()));
            }
            if !seen.insert(permission.module) {
                return Err(StoreError::Conflict(format!(
                    "duplicate permission row for module '{}'",
                    permission.module
                )));
            }
        }

        tables.roles.insert(role.id, role.clone());
        for permission in &permissions {
            tables
                .permissions
                .insert((permission.role_id, permission.module), permission.clone());
        }
        Ok((role, permissions))
    }

    async fn roles_for_business(&self, business_id: BusinessId, page: Page) -> Result<Vec<Role>, StoreError> {
        let tables = self.read()?;
        let mut roles: Vec<&Role> = tables
            .roles
            .values()
            .filter(|r| r.business_id == business_id)
            .collect();
        roles.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(page.apply(roles.into_iter().cloned()))
    }

    async fn role(&self, role_id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.read()?.roles.get(&role_id).cloned())
    }

    async fn update_role(&self, role: Role) -> Result<Role, StoreError> {
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&role.id) {
            return Err(StoreError::NotFound("role"));
        }
        if tables.name_taken(&role) {
            return Err(StoreError::Conflict(format!("role name '{}' is already in use", role.name)));
        }
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete_role_cascade(&self, role_id: RoleId) -> Result<DeletedRole, StoreError> {
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound("role"));
        }

        let before = tables.permissions.len();
        tables.permissions.retain(|(r, _), _| *r != role_id);
        let permissions_removed = before - tables.permissions.len();
        tables.employee_roles.retain(|(_, r)| *r != role_id);

        let role = tables
            .roles
            .remove(&role_id)
            .ok_or(StoreError::NotFound("role"))?;
        Ok(DeletedRole {
            role,
            permissions_removed,
        })
    }

    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> Result<Vec<Permission>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<Permission> = tables
            .permissions
            .values()
            .filter(|p| role_ids.contains(&p.role_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.role_id.cmp(&b.role_id).then(a.module.cmp(&b.module)));
        Ok(rows)
    }

    async fn permission(&self, role_id: RoleId, module: Module) -> Result<Option<Permission>, StoreError> {
        Ok(self.read()?.permissions.get(&(role_id, module)).cloned())
    }

    async fn upsert_capability(
        &self,
        role_id: RoleId,
        module: Module,
        capability: Capability,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<Permission, StoreError> {
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound("role"));
        }

        let row = tables
            .permissions
            .entry((role_id, module))
            .and_modify(|p| p.toggle(capability, value, now))
            .or_insert_with(|| Permission::first_toggle(role_id, module, capability, value, now));
        Ok(row.clone())
    }

    async fn insert_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError> {
        let mut tables = self.write()?;
        if !tables.businesses.contains_key(&employee.business_id) {
            return Err(StoreError::NotFound("business"));
        }
        if tables.employees.contains_key(&employee.id) {
            return Err(StoreError::Conflict(format!("employee {} already exists", employee.id)));
        }
        if let Some(identity_id) = employee.identity_id {
            if tables
                .employees
                .values()
                .any(|e| e.identity_id == Some(identity_id))
            {
                return Err(StoreError::Conflict(
                    "identity is already linked to an employee".to_string(),
                ));
            }
        }
        tables.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(&self, employee: EmployeeProfile) -> Result<EmployeeProfile, StoreError> {
        let mut tables = self.write()?;
        let Some(stored) = tables.employees.get_mut(&employee.id) else {
            return Err(StoreError::NotFound("employee"));
        };
        let employee = EmployeeProfile {
            identity_id: stored.identity_id,
            business_id: stored.business_id,
            created_at: stored.created_at,
            ..employee
        };
        *stored = employee.clone();
        Ok(employee)
    }

    async fn employees_for_business(
        &self,
        business_id: BusinessId,
        page: Page,
    ) -> Result<Vec<EmployeeProfile>, StoreError> {
        let tables = self.read()?;
        let mut employees: Vec<&EmployeeProfile> = tables
            .employees
            .values()
            .filter(|e| e.business_id == business_id)
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.apply(employees.into_iter().cloned()))
    }

    async fn employee(&self, employee_id: EmployeeId) -> Result<Option<EmployeeProfile>, StoreError> {
        Ok(self.read()?.employees.get(&employee_id).cloned())
    }

    async fn employee_by_identity(&self, identity_id: IdentityId) -> Result<Option<EmployeeProfile>, StoreError> {
        Ok(self
            .read()?
            .employees
            .values()
            .find(|e| e.identity_id == Some(identity_id))
            .cloned())
    }

    async fn assign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.employees.contains_key(&employee_id) {
            return Err(StoreError::NotFound("employee"));
        }
        if !tables.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound("role"));
        }
        tables.employee_roles.insert((employee_id, role_id));
        Ok(())
    }

    async fn unassign_role(&self, employee_id: EmployeeId, role_id: RoleId) -> Result<bool, StoreError> {
        Ok(self.write()?.employee_roles.remove(&(employee_id, role_id)))
    }

    async fn roles_for_employee(&self, employee_id: EmployeeId) -> Result<Vec<RoleId>, StoreError> {
        Ok(self
            .read()?
            .employee_roles
            .iter()
            .filter(|(e, _)| *e == employee_id)
            .map(|(_, r)| *r)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_auth::{CapabilitySet, NewRole};
    use bizdesk_business::{ContactInfo, NewBusiness};

    fn business() -> Business {
        NewBusiness {
            name: "Corner Shop".to_string(),
            contact: ContactInfo::default(),
        }
        .into_business(IdentityId::new(), Utc::now())
        .unwrap()
    }

    fn role(business_id: BusinessId, name: &str) -> Role {
        NewRole {
            name: name.to_string(),
            description: None,
        }
        .into_role(business_id, Utc::now())
        .unwrap()
    }

    async fn seeded() -> (InMemoryRecordStore, Business) {
        let store = InMemoryRecordStore::new();
        let business = store.insert_business(business()).await.unwrap();
        (store, business)
    }

    #[tokio::test]
    async fn role_insert_is_all_or_nothing() {
        let (store, business) = seeded().await;
        let role = role(business.id, "Cashier");
        let mut rows = Permission::default_batch(role.id, Utc::now());
        rows.push(rows[0].clone());

        let err = store
            .insert_role_with_permissions(role.clone(), rows)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.role(role.id).await.unwrap().is_none());
        assert!(store.permissions_for_roles(&[role.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_role_name_conflicts_case_insensitively() {
        let (store, business) = seeded().await;
        let first = role(business.id, "Cashier");
        store
            .insert_role_with_permissions(first, vec![])
            .await
            .unwrap();

        let err = store
            .insert_role_with_permissions(role(business.id, "cashier"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn same_role_name_in_other_business_is_fine() {
        let (store, business) = seeded().await;
        let other = store.insert_business(super::tests::business()).await.unwrap();

        store
            .insert_role_with_permissions(role(business.id, "Cashier"), vec![])
            .await
            .unwrap();
        store
            .insert_role_with_permissions(role(other.id, "Cashier"), vec![])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn roles_are_listed_by_name() {
        let (store, business) = seeded().await;
        for name in ["manager", "Cashier", "auditor"] {
            store
                .insert_role_with_permissions(role(business.id, name), vec![])
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .roles_for_business(business.id, Page::ALL)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["auditor", "Cashier", "manager"]);
    }

    #[tokio::test]
    async fn upsert_patches_existing_row_only_in_one_field() {
        let (store, business) = seeded().await;
        let role = role(business.id, "Cashier");
        let rows = Permission::default_batch(role.id, Utc::now());
        store.insert_role_with_permissions(role.clone(), rows).await.unwrap();

        let row = store
            .upsert_capability(role.id, Module::Invoices, Capability::Create, true, Utc::now())
            .await
            .unwrap();
        assert_eq!(row.capabilities, CapabilitySet::read_only().with(Capability::Create, true));
    }

    #[tokio::test]
    async fn upsert_inserts_missing_row_with_single_field() {
        let (store, business) = seeded().await;
        let role = role(business.id, "Cashier");
        store.insert_role_with_permissions(role.clone(), vec![]).await.unwrap();

        let row = store
            .upsert_capability(role.id, Module::Finance, Capability::Delete, true, Utc::now())
            .await
            .unwrap();
        assert_eq!(row.capabilities, CapabilitySet::only(Capability::Delete, true));
    }

    #[tokio::test]
    async fn upsert_on_unknown_role_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = store
            .upsert_capability(RoleId::new(), Module::Finance, Capability::Read, true, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("role"));
    }

    #[tokio::test]
    async fn delete_cascade_reports_removed_rows() {
        let (store, business) = seeded().await;
        let role = role(business.id, "Cashier");
        let rows = Permission::default_batch(role.id, Utc::now());
        store.insert_role_with_permissions(role.clone(), rows).await.unwrap();

        let deleted = store.delete_role_cascade(role.id).await.unwrap();
        assert_eq!(deleted.permissions_removed, Module::ALL.len());
        assert!(store.role(role.id).await.unwrap().is_none());
        assert_eq!(
            store.delete_role_cascade(role.id).await.unwrap_err(),
            StoreError::NotFound("role")
        );
    }
}
