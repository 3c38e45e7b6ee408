use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use bizdesk_auth::{Capability, Module};
use bizdesk_business::{EmployeePatch, NewEmployee};
use bizdesk_core::{EmployeeId, RoleId};
use bizdesk_infra::Page;

use crate::app::{AppServices, dto, errors};
use crate::authz;
use crate::context::IdentityContext;

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let principal = match authz::capability(&services, &ctx, Module::Employees, Capability::Read).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    let page = Page::new(query.offset, query.limit);
    match services.employees.list(principal.business_id, page).await {
        Ok(employees) => Json(employees).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Json(body): Json<NewEmployee>,
) -> axum::response::Response {
    let principal = match authz::capability(&services, &ctx, Module::Employees, Capability::Create).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services.employees.create(principal.business_id, body).await {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Edit a profile, including its status; needs `update` on `employees`.
pub async fn update_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
    Json(patch): Json<EmployeePatch>,
) -> axum::response::Response {
    let employee_id: EmployeeId = match dto::parse(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let principal = match authz::capability(&services, &ctx, Module::Employees, Capability::Update).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services
        .employees
        .update(principal.business_id, employee_id, patch)
        .await
    {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn employee_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let employee_id: EmployeeId = match dto::parse(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let principal = match authz::capability(&services, &ctx, Module::Employees, Capability::Read).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services.employees.roles_of(principal.business_id, employee_id).await {
        Ok(role_ids) => Json(serde_json::json!({ "role_ids": role_ids })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_link(employee_id: &str, role_id: &str) -> Result<(EmployeeId, RoleId), axum::response::Response> {
    Ok((dto::parse(employee_id)?, dto::parse(role_id)?))
}

/// Link a role to an employee; owner only.
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path((id, role_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (employee_id, role_id) = match parse_link(&id, &role_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };
    let principal = match authz::owner(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services
        .employees
        .assign_role(principal.business_id, employee_id, role_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn unassign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path((id, role_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (employee_id, role_id) = match parse_link(&id, &role_id) {
        Ok(ids) => ids,
        Err(res) => return res,
    };
    let principal = match authz::owner(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services
        .employees
        .unassign_role(principal.business_id, employee_id, role_id)
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "role is not assigned"),
        Err(e) => errors::service_error_to_response(e),
    }
}
