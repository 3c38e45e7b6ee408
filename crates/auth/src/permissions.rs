use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{Entity, PermissionId, RoleId};

use crate::{Capability, CapabilitySet, Module};

/// Materialized capability row for one (role, module) pair.
///
/// At most one row exists per pair. A pair with no row grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub role_id: RoleId,
    pub module: Module,
    pub capabilities: CapabilitySet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Permission {
    pub fn new(role_id: RoleId, module: Module, capabilities: CapabilitySet, now: DateTime<Utc>) -> Self {
        Self {
            id: PermissionId::new(),
            role_id,
            module,
            capabilities,
            created_at: now,
            updated_at: now,
        }
    }

    /// One read-only row per module, written together with a new role.
    pub fn default_batch(role_id: RoleId, now: DateTime<Utc>) -> Vec<Permission> {
        Module::ALL
            .into_iter()
            .map(|module| Permission::new(role_id, module, CapabilitySet::read_only(), now))
            .collect()
    }

    /// Row created by the first toggle on a pair that had none.
    pub fn first_toggle(role_id: RoleId, module: Module, cap: Capability, value: bool, now: DateTime<Utc>) -> Self {
        Permission::new(role_id, module, CapabilitySet::only(cap, value), now)
    }

    pub fn allows(&self, cap: Capability) -> bool {
        self.capabilities.get(cap)
    }

    /// Patch a single capability, leaving the other three untouched.
    pub fn toggle(&mut self, cap: Capability, value: bool, now: DateTime<Utc>) {
        self.capabilities.set(cap, value);
        self.updated_at = now;
    }
}
