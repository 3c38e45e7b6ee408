use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use bizdesk_auth::{Capability, Module, NewRole, RolePatch};
use bizdesk_core::RoleId;
use bizdesk_infra::Page;

use crate::app::{AppServices, dto, errors};
use crate::authz;
use crate::context::IdentityContext;

/// Permission grid for every role of the caller's business.
///
/// Owners always; employees need `read` on `settings`.
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let principal = match authz::capability(&services, &ctx, Module::Settings, Capability::Read).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    let page = Page::new(query.offset, query.limit);
    match services.roles.list(principal.business_id, page).await {
        Ok(matrix) => Json(dto::RolesResponse { roles: matrix.grid() }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Json(body): Json<NewRole>,
) -> axum::response::Response {
    let principal = match authz::owner(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services.roles.create_role(principal.business_id, body).await {
        Ok((role, permissions)) => (
            StatusCode::CREATED,
            Json(dto::CreatedRoleResponse { role, permissions }),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
    Json(patch): Json<RolePatch>,
) -> axum::response::Response {
    let role_id: RoleId = match dto::parse(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let principal = match authz::owner(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services.roles.update_role(principal.business_id, role_id, patch).await {
        Ok(role) => Json(role).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let role_id: RoleId = match dto::parse(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let principal = match authz::owner(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services.roles.delete_role(principal.business_id, role_id).await {
        Ok(deleted) => Json(serde_json::json!({
            "role_id": deleted.role.id.to_string(),
            "permissions_removed": deleted.permissions_removed,
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Toggle one capability of a (role, module) pair.
pub async fn set_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path((id, module)): Path<(String, String)>,
    Json(body): Json<dto::SetPermissionRequest>,
) -> axum::response::Response {
    let role_id: RoleId = match dto::parse(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let module: Module = match dto::parse(&module) {
        Ok(m) => m,
        Err(res) => return res,
    };
    let principal = match authz::owner(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services
        .permissions
        .set_permission(principal.business_id, role_id, module, body.capability, body.value)
        .await
    {
        Ok(permission) => Json(permission).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
