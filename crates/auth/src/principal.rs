use serde::{Deserialize, Serialize};

use bizdesk_core::{BusinessId, EmployeeId, IdentityId, RoleId};

/// An authenticated principal as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
}

/// How a principal relates to the business it acts in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Standing {
    /// The business owner: every capability on every module.
    Owner,
    /// An employee whose capabilities come from the roles linked to them.
    Employee {
        employee_id: EmployeeId,
        role_ids: Vec<RoleId>,
        active: bool,
    },
}

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub identity_id: IdentityId,
    pub business_id: BusinessId,
    pub standing: Standing,
}

impl Principal {
    pub fn owner(identity_id: IdentityId, business_id: BusinessId) -> Self {
        Self {
            identity_id,
            business_id,
            standing: Standing::Owner,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self.standing, Standing::Owner)
    }

    pub fn role_ids(&self) -> &[RoleId] {
        match &self.standing {
            Standing::Owner => &[],
            Standing::Employee { role_ids, .. } => role_ids,
        }
    }
}
