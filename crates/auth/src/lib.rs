//! `bizdesk-auth`: roles, per-module permissions and authorization.
//!
//! Decoupled from HTTP and storage: the record store and the API layer feed
//! these types, they never reach back out.

pub mod authorize;
pub mod capability;
pub mod claims;
pub mod jwt;
pub mod matrix;
pub mod module;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{
    AuthorizationExplanation, AuthzError, authorize, explain_authorization, require_owner,
};
pub use capability::{Capability, CapabilitySet};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtError, JwtValidator, TokenIssuer};
pub use matrix::{PermissionMatrix, RoleGrid};
pub use module::Module;
pub use password::{PasswordError, hash_password, verify_password};
pub use permissions::Permission;
pub use principal::{Identity, Principal, Standing};
pub use roles::{NewRole, Role, RolePatch};
pub use session::{AppSession, SessionPhase};
