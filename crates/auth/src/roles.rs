use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{BusinessId, DomainError, DomainResult, Entity, RoleId};

/// Named permission bundle owned by one business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub business_id: BusinessId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Role creation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewRole {
    pub fn into_role(self, business_id: BusinessId, now: DateTime<Utc>) -> DomainResult<Role> {
        Ok(Role {
            id: RoleId::new(),
            business_id,
            name: validate_name(&self.name)?,
            description: normalize_description(self.description),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Field patch for a role.
///
/// `description: Some(None)` clears the description; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    pub name: Option<String>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl Role {
    pub fn apply_patch(&mut self, patch: RolePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = normalize_description(description);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Case-insensitive name comparison used for per-business uniqueness.
    pub fn same_name(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.trim().to_lowercase()
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("role name cannot be empty"));
    }
    Ok(name.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Distinguishes an absent JSON field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}
