use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use bizdesk_business::{EmployeePatch, EmployeeProfile, NewEmployee};
use bizdesk_core::{BusinessId, EmployeeId, RoleId};

use super::{ServiceError, role_in_business};
use crate::store::{Page, RecordStore};

/// Employee profiles and their role links.
#[derive(Clone)]
pub struct EmployeeService {
    store: Arc<dyn RecordStore>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, business_id: BusinessId, input: NewEmployee) -> Result<EmployeeProfile, ServiceError> {
        let profile = input.into_profile(business_id, Utc::now())?;
        let profile = self
            .store
            .insert_employee(profile)
            .await
            .inspect_err(|err| warn!(business_id = %business_id, error = %err, "employee create rejected"))?;
        info!(business_id = %business_id, employee_id = %profile.id, "employee created");
        Ok(profile)
    }

    /// Edit a profile. Setting the status away from `active` revokes every
    /// capability the employee's roles grant.
    pub async fn update(
        &self,
        business_id: BusinessId,
        employee_id: EmployeeId,
        patch: EmployeePatch,
    ) -> Result<EmployeeProfile, ServiceError> {
        let mut profile = self.employee_in_business(business_id, employee_id).await?;
        let previous = profile.status;
        profile.apply_patch(patch, Utc::now())?;
        let profile = self
            .store
            .update_employee(profile)
            .await
            .inspect_err(|err| warn!(employee_id = %employee_id, error = %err, "employee update rejected"))?;
        if profile.status != previous {
            info!(employee_id = %employee_id, status = %profile.status, "employee status changed");
        }
        Ok(profile)
    }

    pub async fn list(&self, business_id: BusinessId, page: Page) -> Result<Vec<EmployeeProfile>, ServiceError> {
        Ok(self.store.employees_for_business(business_id, page).await?)
    }

    /// Link a role to an employee; both must belong to `business_id`.
    pub async fn assign_role(
        &self,
        business_id: BusinessId,
        employee_id: EmployeeId,
        role_id: RoleId,
    ) -> Result<(), ServiceError> {
        self.employee_in_business(business_id, employee_id).await?;
        role_in_business(self.store.as_ref(), business_id, role_id).await?;
        self.store.assign_role(employee_id, role_id).await?;
        info!(employee_id = %employee_id, role_id = %role_id, "role assigned");
        Ok(())
    }

    /// Returns whether a link was removed.
    pub async fn unassign_role(
        &self,
        business_id: BusinessId,
        employee_id: EmployeeId,
        role_id: RoleId,
    ) -> Result<bool, ServiceError> {
        self.employee_in_business(business_id, employee_id).await?;
        let removed = self.store.unassign_role(employee_id, role_id).await?;
        if removed {
            info!(employee_id = %employee_id, role_id = %role_id, "role unassigned");
        }
        Ok(removed)
    }

    pub async fn roles_of(&self, business_id: BusinessId, employee_id: EmployeeId) -> Result<Vec<RoleId>, ServiceError> {
        self.employee_in_business(business_id, employee_id).await?;
        Ok(self.store.roles_for_employee(employee_id).await?)
    }

    async fn employee_in_business(
        &self,
        business_id: BusinessId,
        employee_id: EmployeeId,
    ) -> Result<EmployeeProfile, ServiceError> {
        match self.store.employee(employee_id).await? {
            Some(profile) if profile.business_id == business_id => Ok(profile),
            _ => Err(ServiceError::NotFound("employee")),
        }
    }
}
