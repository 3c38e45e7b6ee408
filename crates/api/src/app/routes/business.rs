use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use bizdesk_business::{BusinessPatch, NewBusiness};

use crate::app::{AppServices, errors};
use crate::authz;
use crate::context::IdentityContext;

/// The caller's business (owner or employee).
pub async fn get_business(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
) -> axum::response::Response {
    let principal = match authz::principal(&services, &ctx).await {
        Ok(p) => p,
        Err(res) => return res,
    };
    match services.scope.business(principal.business_id).await {
        Ok(business) => Json(business).into_response(),
        Err(e) => errors::scope_error_to_response(e),
    }
}

/// Set up a business for an already registered identity.
pub async fn create_business(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Json(body): Json<NewBusiness>,
) -> axum::response::Response {
    match services.scope.setup(ctx.identity_id(), body).await {
        Ok(business) => (StatusCode::CREATED, Json(business)).into_response(),
        Err(e) => errors::scope_error_to_response(e),
    }
}

/// Settings edit; owner only.
pub async fn update_business(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Json(patch): Json<BusinessPatch>,
) -> axum::response::Response {
    if let Err(res) = authz::owner(&services, &ctx).await {
        return res;
    }
    match services.scope.update_settings(ctx.identity_id(), patch).await {
        Ok(business) => Json(business).into_response(),
        Err(e) => errors::scope_error_to_response(e),
    }
}
