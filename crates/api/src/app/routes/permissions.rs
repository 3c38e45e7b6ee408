use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use bizdesk_auth::{Capability, Module};
use bizdesk_core::RoleId;

use crate::app::{AppServices, dto, errors};
use crate::authz;
use crate::context::IdentityContext;

/// `allowed` for one (role, module, capability) in the caller's business.
pub async fn check(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Query(query): Query<dto::PermissionCheckQuery>,
) -> axum::response::Response {
    let role_id: RoleId = match dto::parse(&query.role_id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let module: Module = match dto::parse(&query.module) {
        Ok(m) => m,
        Err(res) => return res,
    };
    let capability: Capability = match dto::parse(&query.capability) {
        Ok(c) => c,
        Err(res) => return res,
    };
    let principal = match authz::principal(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };

    match services
        .permissions
        .check(principal.business_id, role_id, module, capability)
        .await
    {
        Ok(allowed) => Json(serde_json::json!({
            "role_id": role_id.to_string(),
            "module": module,
            "capability": capability,
            "allowed": allowed,
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Why the caller does or does not hold a capability.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Query(query): Query<dto::ExplainQuery>,
) -> axum::response::Response {
    let module: Module = match dto::parse(&query.module) {
        Ok(m) => m,
        Err(res) => return res,
    };
    let capability: Capability = match dto::parse(&query.capability) {
        Ok(c) => c,
        Err(res) => return res,
    };
    match services
        .permissions
        .explain(ctx.identity_id(), module, capability)
        .await
    {
        Ok(explanation) => Json(explanation).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
