//! API-side authorization guards.
//!
//! Handlers resolve the caller's business and standing here before touching
//! any service, so every business-scoped route fails the same way when the
//! caller has no business yet.

use bizdesk_auth::{Capability, Module, Principal, require_owner};

use crate::app::{AppServices, errors};
use crate::context::IdentityContext;

/// Resolve the caller to a principal in their business.
pub async fn principal(
    services: &AppServices,
    ctx: &IdentityContext,
) -> Result<Principal, axum::response::Response> {
    services
        .scope
        .principal(ctx.identity_id())
        .await
        .map_err(errors::scope_error_to_response)
}

/// Resolve the caller and require owner standing (role and permission management).
pub async fn owner(
    services: &AppServices,
    ctx: &IdentityContext,
) -> Result<Principal, axum::response::Response> {
    let principal = principal(services, ctx).await?;
    require_owner(&principal, principal.business_id).map_err(errors::authz_error_to_response)?;
    Ok(principal)
}

/// Resolve the caller and require `capability` on `module`.
pub async fn capability(
    services: &AppServices,
    ctx: &IdentityContext,
    module: Module,
    capability: Capability,
) -> Result<Principal, axum::response::Response> {
    services
        .permissions
        .authorize_identity(ctx.identity_id(), module, capability)
        .await
        .map_err(errors::service_error_to_response)
}
