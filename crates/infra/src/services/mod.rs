//! Application services over the record store.
//!
//! Every operation takes the resolved business id and refuses to touch a
//! role or employee that belongs to another business.

pub mod employees;
pub mod permissions;
pub mod roles;

use thiserror::Error;

use bizdesk_auth::{AuthzError, Role};
use bizdesk_core::{BusinessId, DomainError, RoleId};

use crate::scope::ScopeError;
use crate::store::{RecordStore, StoreError};

pub use employees::EmployeeService;
pub use permissions::PermissionService;
pub use roles::RoleService;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load `role_id`, treating a role of another business as missing.
pub(crate) async fn role_in_business(
    store: &dyn RecordStore,
    business_id: BusinessId,
    role_id: RoleId,
) -> Result<Role, ServiceError> {
    match store.role(role_id).await? {
        Some(role) if role.business_id == business_id => Ok(role),
        _ => Err(ServiceError::NotFound("role")),
    }
}
