use serde::{Deserialize, Serialize};

use bizdesk_core::DomainError;

/// One CRUD capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Create,
        Capability::Read,
        Capability::Update,
        Capability::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Delete => "delete",
        }
    }

    /// Storage column holding this capability.
    pub fn column(&self) -> &'static str {
        match self {
            Capability::Create => "create_permission",
            Capability::Read => "read_permission",
            Capability::Update => "update_permission",
            Capability::Delete => "delete_permission",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both `create` and the column spelling `create_permission`.
impl core::str::FromStr for Capability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix("_permission").unwrap_or(s);
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| DomainError::validation(format!("unknown capability '{s}'")))
    }
}

/// The four independent CRUD flags of one (role, module) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl CapabilitySet {
    pub const NONE: CapabilitySet = CapabilitySet {
        create: false,
        read: false,
        update: false,
        delete: false,
    };

    /// Policy for rows created alongside a new role.
    pub const fn read_only() -> Self {
        CapabilitySet {
            read: true,
            ..Self::NONE
        }
    }

    /// Row inserted by a first toggle: only `cap` carries `value`.
    pub fn only(cap: Capability, value: bool) -> Self {
        Self::NONE.with(cap, value)
    }

    pub fn get(&self, cap: Capability) -> bool {
        match cap {
            Capability::Create => self.create,
            Capability::Read => self.read,
            Capability::Update => self.update,
            Capability::Delete => self.delete,
        }
    }

    pub fn set(&mut self, cap: Capability, value: bool) {
        match cap {
            Capability::Create => self.create = value,
            Capability::Read => self.read = value,
            Capability::Update => self.update = value,
            Capability::Delete => self.delete = value,
        }
    }

    pub fn with(mut self, cap: Capability, value: bool) -> Self {
        self.set(cap, value);
        self
    }
}
