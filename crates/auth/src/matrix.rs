//! Roles × modules capability grid for one business.

use std::collections::BTreeMap;

use serde::Serialize;

use bizdesk_core::RoleId;

use crate::{Capability, CapabilitySet, Module, Permission, Role};

/// In-memory view of a business's roles and their materialized permission rows.
///
/// Built from what the store returns. Lookups follow the storage semantics: a
/// missing row means no capabilities, never "use the defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionMatrix {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
}

/// One role with its capabilities on every module (missing rows shown as none).
#[derive(Debug, Clone, Serialize)]
pub struct RoleGrid {
    pub role: Role,
    pub modules: BTreeMap<Module, CapabilitySet>,
}

impl PermissionMatrix {
    /// `roles` keep the order they are given in (the store lists them by name).
    pub fn new(roles: Vec<Role>, permissions: Vec<Permission>) -> Self {
        Self { roles, permissions }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    pub fn permission(&self, role_id: RoleId, module: Module) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|p| p.role_id == role_id && p.module == module)
    }

    pub fn rows_for(&self, role_id: RoleId) -> impl Iterator<Item = &Permission> {
        self.permissions.iter().filter(move |p| p.role_id == role_id)
    }

    pub fn capabilities(&self, role_id: RoleId, module: Module) -> CapabilitySet {
        self.permission(role_id, module)
            .map(|p| p.capabilities)
            .unwrap_or(CapabilitySet::NONE)
    }

    /// Whether `role_id` holds `cap` on `module`.
    pub fn allows(&self, role_id: RoleId, module: Module, cap: Capability) -> bool {
        self.permission(role_id, module)
            .is_some_and(|p| p.allows(cap))
    }

    /// Display grid: every role against every module.
    pub fn grid(&self) -> Vec<RoleGrid> {
        self.roles
            .iter()
            .map(|role| RoleGrid {
                role: role.clone(),
                modules: Module::ALL
                    .into_iter()
                    .map(|m| (m, self.capabilities(role.id, m)))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use bizdesk_core::BusinessId;

    use crate::NewRole;

    fn role(name: &str) -> Role {
        NewRole {
            name: name.to_string(),
            description: None,
        }
        .into_role(BusinessId::new(), Utc::now())
        .unwrap()
    }

    #[test]
    fn missing_row_grants_nothing() {
        let cashier = role("Cashier");
        let matrix = PermissionMatrix::new(vec![cashier.clone()], vec![]);

        for module in Module::ALL {
            for cap in Capability::ALL {
                assert!(!matrix.allows(cashier.id, module, cap));
            }
        }
        assert_eq!(matrix.capabilities(cashier.id, Module::Reports), CapabilitySet::NONE);
    }

    #[test]
    fn grid_keeps_role_order_and_fills_every_module() {
        let auditor = role("auditor");
        let cashier = role("Cashier");
        let rows = Permission::default_batch(cashier.id, Utc::now());
        let matrix = PermissionMatrix::new(vec![auditor.clone(), cashier.clone()], rows);

        let grid = matrix.grid();
        let names: Vec<_> = grid.iter().map(|g| g.role.name.as_str()).collect();
        assert_eq!(names, vec!["auditor", "Cashier"]);
        assert!(grid.iter().all(|g| g.modules.len() == Module::ALL.len()));
        assert_eq!(grid[0].modules[&Module::Invoices], CapabilitySet::NONE);
        assert_eq!(grid[1].modules[&Module::Invoices], CapabilitySet::read_only());
    }
}
