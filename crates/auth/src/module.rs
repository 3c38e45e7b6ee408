use serde::{Deserialize, Serialize};

use bizdesk_core::DomainError;

/// Functional area of the console that capabilities are granted on.
///
/// The set is closed; a role's permission batch has one row per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Dashboard,
    Employees,
    Clients,
    Products,
    Inventory,
    Invoices,
    Branches,
    Finance,
    Reports,
    Settings,
}

impl Module {
    /// Every module, in display order.
    pub const ALL: [Module; 10] = [
        Module::Dashboard,
        Module::Employees,
        Module::Clients,
        Module::Products,
        Module::Inventory,
        Module::Invoices,
        Module::Branches,
        Module::Finance,
        Module::Reports,
        Module::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Employees => "employees",
            Module::Clients => "clients",
            Module::Products => "products",
            Module::Inventory => "inventory",
            Module::Invoices => "invoices",
            Module::Branches => "branches",
            Module::Finance => "finance",
            Module::Reports => "reports",
            Module::Settings => "settings",
        }
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Module {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown module '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_parses_back() {
        for module in Module::ALL {
            assert_eq!(module.as_str().parse::<Module>().unwrap(), module);
        }
    }

    #[test]
    fn unknown_tag_is_a_validation_error() {
        assert!(matches!("payroll".parse::<Module>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        assert_eq!(serde_json::to_string(&Module::Invoices).unwrap(), "\"invoices\"");
    }
}
