use serde::{Deserialize, Serialize};

use bizdesk_core::{DomainError, DomainResult};

/// Contact fields shared by businesses and employees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    /// Trim every field, drop blanks, and check the ones that are present.
    pub fn normalized(self) -> DomainResult<Self> {
        let email = non_blank(self.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let phone = non_blank(self.phone);
        if let Some(phone) = &phone {
            validate_phone(phone)?;
        }
        Ok(Self {
            email,
            phone,
            address: non_blank(self.address),
        })
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_email(email: &str) -> DomainResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(DomainError::validation("invalid email address")),
    }
}

/// Digits, spaces, dashes and parentheses, optionally led by `+`.
pub(crate) fn validate_phone(phone: &str) -> DomainResult<()> {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let valid = !body.is_empty()
        && body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation("invalid phone number format"))
    }
}
