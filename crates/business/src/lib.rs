//! Business domain module: the tenant root and the people who work for it.
//!
//! Plain records plus their validation rules (no IO, no HTTP, no storage).

pub mod business;
pub mod contact;
pub mod employee;

pub use business::{Business, BusinessPatch, NewBusiness};
pub use contact::ContactInfo;
pub use employee::{EmployeePatch, EmployeeProfile, EmployeeStatus, NewEmployee};
