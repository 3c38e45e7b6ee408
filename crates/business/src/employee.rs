use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bizdesk_core::{
    BranchId, BusinessId, DomainError, DomainResult, EmployeeId, Entity, IdentityId,
};

use crate::contact::{non_blank, validate_email, validate_phone};

/// Employment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
    OnLeave,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
            EmployeeStatus::OnLeave => "on_leave",
        }
    }
}

impl core::str::FromStr for EmployeeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EmployeeStatus::Active),
            "inactive" => Ok(EmployeeStatus::Inactive),
            "on_leave" => Ok(EmployeeStatus::OnLeave),
            other => Err(DomainError::validation(format!("unknown employee status '{other}'"))),
        }
    }
}

impl core::fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated-employee profile.
///
/// Typed replacement for the loosely shaped employee payload a session used
/// to carry around; only ever built through [`NewEmployee::into_profile`] or
/// loaded back from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub id: EmployeeId,
    pub business_id: BusinessId,
    pub branch_id: Option<BranchId>,
    /// Login identity, when the employee has one.
    pub identity_id: Option<IdentityId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for EmployeeProfile {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl EmployeeProfile {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// Employee input as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub branch_id: Option<BranchId>,
    #[serde(default)]
    pub identity_id: Option<IdentityId>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: EmployeeStatus,
}

impl NewEmployee {
    pub fn into_profile(self, business_id: BusinessId, now: DateTime<Utc>) -> DomainResult<EmployeeProfile> {
        let name = normalize_name(&self.name)?;
        let email = normalize_email(&self.email)?;
        let phone = normalize_phone(self.phone)?;

        Ok(EmployeeProfile {
            id: EmployeeId::new(),
            business_id,
            branch_id: self.branch_id,
            identity_id: self.identity_id,
            name,
            email,
            phone,
            address: non_blank(self.address),
            hire_date: self.hire_date,
            status: self.status,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Profile edit: each `Some` field replaces the stored value. A blank
/// `phone` or `address` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub branch_id: Option<BranchId>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<EmployeeStatus>,
}

impl EmployeeProfile {
    /// Apply an edit. Nothing is changed if any field fails validation.
    pub fn apply_patch(&mut self, patch: EmployeePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.as_deref().map(normalize_name).transpose()?;
        let email = patch.email.as_deref().map(normalize_email).transpose()?;
        let phone = match patch.phone {
            Some(raw) => Some(normalize_phone(Some(raw))?),
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if patch.address.is_some() {
            self.address = non_blank(patch.address);
        }
        if let Some(branch_id) = patch.branch_id {
            self.branch_id = Some(branch_id);
        }
        if let Some(hire_date) = patch.hire_date {
            self.hire_date = Some(hire_date);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }
}

fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.chars().count() < 2 {
        return Err(DomainError::validation("name must be at least 2 characters"));
    }
    Ok(name.to_string())
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    validate_email(&email)?;
    Ok(email)
}

fn normalize_phone(phone: Option<String>) -> DomainResult<Option<String>> {
    let phone = non_blank(phone);
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    Ok(phone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(name: &str, email: &str) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            email: email.to_string(),
            branch_id: None,
            identity_id: None,
            phone: None,
            address: None,
            hire_date: None,
            status: EmployeeStatus::default(),
        }
    }

    #[test]
    fn profile_normalizes_email_and_defaults_to_active() {
        let profile = input("Dana Ruiz", " Dana@Shop.Example ")
            .into_profile(BusinessId::new(), Utc::now())
            .unwrap();
        assert_eq!(profile.email, "dana@shop.example");
        assert!(profile.is_active());
    }

    #[test]
    fn short_name_is_rejected() {
        let err = input(" A ", "a@shop.example")
            .into_profile(BusinessId::new(), Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn status_parses_snake_case_tags() {
        assert_eq!("on_leave".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::OnLeave);
        assert!("retired".parse::<EmployeeStatus>().is_err());
    }

    #[test]
    fn untyped_payload_is_rejected_at_the_boundary() {
        let payload = serde_json::json!({ "name": "Lee", "email": "lee@shop.example", "status": "fired" });
        assert!(serde_json::from_value::<NewEmployee>(payload).is_err());
    }

    #[test]
    fn patch_deactivates_and_edits_fields() {
        let mut profile = input("Dana Ruiz", "dana@shop.example")
            .into_profile(BusinessId::new(), Utc::now())
            .unwrap();
        profile
            .apply_patch(
                EmployeePatch {
                    email: Some(" DANA.R@Shop.Example".to_string()),
                    phone: Some("+1 555 0101".to_string()),
                    status: Some(EmployeeStatus::Inactive),
                    ..EmployeePatch::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(profile.email, "dana.r@shop.example");
        assert_eq!(profile.phone.as_deref(), Some("+1 555 0101"));
        assert!(!profile.is_active());

        profile
            .apply_patch(EmployeePatch { phone: Some(" ".to_string()), ..EmployeePatch::default() }, Utc::now())
            .unwrap();
        assert_eq!(profile.phone, None);
    }

    #[test]
    fn invalid_patch_changes_nothing() {
        let mut profile = input("Dana Ruiz", "dana@shop.example")
            .into_profile(BusinessId::new(), Utc::now())
            .unwrap();
        let before = profile.clone();
        let err = profile
            .apply_patch(
                EmployeePatch {
                    status: Some(EmployeeStatus::OnLeave),
                    email: Some("not-an-email".to_string()),
                    ..EmployeePatch::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(profile, before);
    }

    proptest! {
        /// Property: any two-plus character name with a well-formed email validates,
        /// and the stored name is the trimmed input.
        #[test]
        fn well_formed_input_always_validates(
            name in "[A-Za-z]{2,20}( [A-Za-z]{1,20})?",
            local in "[a-z0-9]{1,12}",
        ) {
            let email = format!("{local}@shop.example");
            let profile = input(&format!("  {name} "), &email)
                .into_profile(BusinessId::new(), Utc::now())
                .unwrap();
            prop_assert_eq!(profile.name, name);
            prop_assert_eq!(profile.email, email);
        }
    }
}
