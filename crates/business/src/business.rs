use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{BusinessId, DomainError, DomainResult, Entity, IdentityId};

use crate::contact::{ContactInfo, non_blank};

/// The tenant root. Every role, permission and employee is scoped by its id.
///
/// # Invariants
/// - Exactly one owner identity, fixed at setup.
/// - `name` is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub owner_id: IdentityId,
    pub name: String,
    pub contact: ContactInfo,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Business {
    type Id = BusinessId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for first-run setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBusiness {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

impl NewBusiness {
    /// Check the input without building a record, so callers can reject it
    /// before any other side effect.
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        self.contact.clone().normalized()?;
        Ok(())
    }

    /// Validate and materialize the record for `owner_id`.
    pub fn into_business(self, owner_id: IdentityId, now: DateTime<Utc>) -> DomainResult<Business> {
        let name = validate_name(&self.name)?;
        Ok(Business {
            id: BusinessId::new(),
            owner_id,
            name,
            contact: self.contact.normalized()?,
            logo_url: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Settings edit: each `Some` field replaces the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessPatch {
    pub name: Option<String>,
    pub contact: Option<ContactInfo>,
    pub logo_url: Option<String>,
}

impl Business {
    /// Apply a settings patch. Nothing is changed if any field fails validation.
    pub fn apply_patch(&mut self, patch: BusinessPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let contact = patch.contact.map(ContactInfo::normalized).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(contact) = contact {
            self.contact = contact;
        }
        if patch.logo_url.is_some() {
            self.logo_url = non_blank(patch.logo_url);
        }
        self.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("business name cannot be empty"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Business {
        NewBusiness {
            name: "  Corner Shop ".to_string(),
            contact: ContactInfo::default(),
        }
        .into_business(IdentityId::new(), Utc::now())
        .unwrap()
    }

    #[test]
    fn setup_trims_name() {
        assert_eq!(sample().name, "Corner Shop");
    }

    #[test]
    fn setup_rejects_blank_name() {
        let err = NewBusiness {
            name: "   ".to_string(),
            contact: ContactInfo::default(),
        }
        .into_business(IdentityId::new(), Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn validate_checks_name_and_contact_up_front() {
        let blank = NewBusiness { name: " ".to_string(), contact: ContactInfo::default() };
        assert!(matches!(blank.validate(), Err(DomainError::Validation(_))));

        let bad_phone = NewBusiness {
            name: "Corner Shop".to_string(),
            contact: ContactInfo { phone: Some("call me".to_string()), ..ContactInfo::default() },
        };
        assert!(bad_phone.validate().is_err());

        let ok = NewBusiness { name: "Corner Shop".to_string(), contact: ContactInfo::default() };
        assert_eq!(ok.validate(), Ok(()));
    }

    #[test]
    fn patch_replaces_only_named_fields() {
        let mut business = sample();
        let owner = business.owner_id;

        business
            .apply_patch(
                BusinessPatch {
                    contact: Some(ContactInfo {
                        phone: Some("+44 20 7946 0000".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(business.name, "Corner Shop");
        assert_eq!(business.owner_id, owner);
        assert_eq!(business.contact.phone.as_deref(), Some("+44 20 7946 0000"));
    }

    #[test]
    fn invalid_patch_leaves_record_untouched() {
        let mut business = sample();
        let before = business.clone();

        let result = business.apply_patch(
            BusinessPatch {
                name: Some("Renamed".to_string()),
                contact: Some(ContactInfo {
                    email: Some("nope".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(result.is_err());
        assert_eq!(business, before);
    }
}
