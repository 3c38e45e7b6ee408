//! Capability checks against a business's permission matrix.
//!
//! Pure functions: no IO, no panics. Callers resolve the principal and load
//! the matrix first.

use serde::Serialize;
use thiserror::Error;

use bizdesk_core::BusinessId;

use crate::{Capability, Module, PermissionMatrix, Principal, Standing};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("business mismatch")]
    BusinessMismatch,

    #[error("only the business owner may do this")]
    OwnerOnly,

    #[error("employee account is not active")]
    Inactive,

    #[error("forbidden: missing '{capability}' on '{module}'")]
    Forbidden { module: Module, capability: Capability },
}

/// Gate for role and permission management.
pub fn require_owner(principal: &Principal, business_id: BusinessId) -> Result<(), AuthzError> {
    if principal.business_id != business_id {
        return Err(AuthzError::BusinessMismatch);
    }
    if !principal.is_owner() {
        return Err(AuthzError::OwnerOnly);
    }
    Ok(())
}

/// Authorize `principal` for `capability` on `module` within `business_id`.
///
/// The owner holds everything. An employee holds a capability when at least
/// one of their roles has a row for the module with that flag set.
pub fn authorize(
    principal: &Principal,
    business_id: BusinessId,
    matrix: &PermissionMatrix,
    module: Module,
    capability: Capability,
) -> Result<(), AuthzError> {
    if principal.business_id != business_id {
        return Err(AuthzError::BusinessMismatch);
    }

    match &principal.standing {
        Standing::Owner => Ok(()),
        Standing::Employee { active: false, .. } => Err(AuthzError::Inactive),
        Standing::Employee { role_ids, .. } => {
            if role_ids
                .iter()
                .any(|role_id| matrix.allows(*role_id, module, capability))
            {
                Ok(())
            } else {
                Err(AuthzError::Forbidden { module, capability })
            }
        }
    }
}

/// Why a capability check came out the way it did.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub module: Module,
    pub capability: Capability,
    pub granted: bool,
    pub reason: String,
    /// Names of the principal's roles that grant the capability.
    pub granting_roles: Vec<String>,
    /// Names of all roles linked to the principal.
    pub roles: Vec<String>,
}

pub fn explain_authorization(
    principal: &Principal,
    business_id: BusinessId,
    matrix: &PermissionMatrix,
    module: Module,
    capability: Capability,
) -> AuthorizationExplanation {
    let linked: Vec<&crate::Role> = principal
        .role_ids()
        .iter()
        .filter_map(|id| matrix.role(*id))
        .collect();
    let roles: Vec<String> = linked.iter().map(|r| r.name.clone()).collect();
    let granting_roles: Vec<String> = linked
        .iter()
        .filter(|r| matrix.allows(r.id, module, capability))
        .map(|r| r.name.clone())
        .collect();

    let decision = authorize(principal, business_id, matrix, module, capability);
    let reason = match &decision {
        Ok(()) if principal.is_owner() => "business owner holds every capability".to_string(),
        Ok(()) => format!("granted by role(s): {}", granting_roles.join(", ")),
        Err(AuthzError::Forbidden { .. }) if roles.is_empty() => {
            "principal has no roles in this business".to_string()
        }
        Err(AuthzError::Forbidden { .. }) => format!(
            "none of the roles [{}] grants '{capability}' on '{module}'",
            roles.join(", ")
        ),
        Err(e) => e.to_string(),
    };

    AuthorizationExplanation {
        module,
        capability,
        granted: decision.is_ok(),
        reason,
        granting_roles,
        roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_core::{EmployeeId, IdentityId, RoleId};
    use chrono::Utc;

    use crate::{NewRole, Permission};

    fn matrix_with_cashier(business_id: BusinessId) -> (PermissionMatrix, RoleId) {
        let role = NewRole {
            name: "Cashier".to_string(),
            description: None,
        }
        .into_role(business_id, Utc::now())
        .unwrap();
        let id = role.id;
        let mut rows = Permission::default_batch(id, Utc::now());
        rows.iter_mut()
            .filter(|p| p.module == Module::Invoices)
            .for_each(|p| p.toggle(Capability::Create, true, Utc::now()));
        let matrix = PermissionMatrix::new(vec![role], rows);
        (matrix, id)
    }

    fn employee(business_id: BusinessId, role_ids: Vec<RoleId>, active: bool) -> Principal {
        Principal {
            identity_id: IdentityId::new(),
            business_id,
            standing: Standing::Employee {
                employee_id: EmployeeId::new(),
                role_ids,
                active,
            },
        }
    }

    #[test]
    fn owner_is_allowed_everything() {
        let business_id = BusinessId::new();
        let principal = Principal::owner(IdentityId::new(), business_id);
        let matrix = PermissionMatrix::default();
        assert!(authorize(&principal, business_id, &matrix, Module::Finance, Capability::Delete).is_ok());
    }

    #[test]
    fn employee_gets_role_capabilities() {
        let business_id = BusinessId::new();
        let (matrix, cashier) = matrix_with_cashier(business_id);
        let principal = employee(business_id, vec![cashier], true);

        assert!(authorize(&principal, business_id, &matrix, Module::Invoices, Capability::Create).is_ok());
        assert!(authorize(&principal, business_id, &matrix, Module::Reports, Capability::Read).is_ok());
        assert_eq!(
            authorize(&principal, business_id, &matrix, Module::Reports, Capability::Delete),
            Err(AuthzError::Forbidden {
                module: Module::Reports,
                capability: Capability::Delete
            })
        );
    }

    #[test]
    fn inactive_employee_is_denied() {
        let business_id = BusinessId::new();
        let (matrix, cashier) = matrix_with_cashier(business_id);
        let principal = employee(business_id, vec![cashier], false);
        assert_eq!(
            authorize(&principal, business_id, &matrix, Module::Dashboard, Capability::Read),
            Err(AuthzError::Inactive)
        );
    }

    #[test]
    fn other_business_is_rejected() {
        let principal = Principal::owner(IdentityId::new(), BusinessId::new());
        let matrix = PermissionMatrix::default();
        assert_eq!(
            authorize(&principal, BusinessId::new(), &matrix, Module::Dashboard, Capability::Read),
            Err(AuthzError::BusinessMismatch)
        );
        assert_eq!(
            require_owner(&principal, BusinessId::new()),
            Err(AuthzError::BusinessMismatch)
        );
    }

    #[test]
    fn employees_cannot_manage_roles() {
        let business_id = BusinessId::new();
        let principal = employee(business_id, vec![], true);
        assert_eq!(require_owner(&principal, business_id), Err(AuthzError::OwnerOnly));
    }

    #[test]
    fn explanation_names_granting_roles() {
        let business_id = BusinessId::new();
        let (matrix, cashier) = matrix_with_cashier(business_id);
        let principal = employee(business_id, vec![cashier], true);

        let granted = explain_authorization(&principal, business_id, &matrix, Module::Invoices, Capability::Create);
        assert!(granted.granted);
        assert_eq!(granted.granting_roles, vec!["Cashier".to_string()]);

        let denied = explain_authorization(&principal, business_id, &matrix, Module::Invoices, Capability::Delete);
        assert!(!denied.granted);
        assert!(denied.granting_roles.is_empty());
        assert!(denied.reason.contains("Cashier"));
    }
}
