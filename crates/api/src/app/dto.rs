use serde::{Deserialize, Serialize};

use bizdesk_auth::{Capability, Identity, Permission, Role, RoleGrid};
use bizdesk_business::NewBusiness;
use bizdesk_core::DomainError;
use bizdesk_infra::Session;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// First-run setup: owner account plus the business it owns.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
    pub business: NewBusiness,
}

#[derive(Debug, Deserialize)]
pub struct SetPermissionRequest {
    pub capability: Capability,
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct PermissionCheckQuery {
    pub role_id: String,
    pub module: String,
    pub capability: String,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub module: String,
    pub capability: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub identity: Identity,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            identity: session.identity,
            access_token: session.access_token,
            token_type: "Bearer",
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedRoleResponse {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<RoleGrid>,
}

// -------------------------
// Parsing helpers
// -------------------------

/// Parse a path/query value with a `DomainError` parser into a 400 on failure.
pub fn parse<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}
