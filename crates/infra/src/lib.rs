//! Infrastructure layer: record store, identity provider, business scope and
//! the role/permission/employee services built on them.

pub mod identity;
pub mod scope;
pub mod services;
pub mod store;


pub use identity::{
    IdentityError, IdentityProvider, InMemoryIdentityProvider, PostgresIdentityProvider, Session, SessionChange,
};
pub use scope::{BusinessScope, ScopeError};
pub use services::{EmployeeService, PermissionService, RoleService, ServiceError};
pub use store::{
    DeletedRole, InMemoryRecordStore, Page, PostgresRecordStore, RecordStore, StoreError,
};
