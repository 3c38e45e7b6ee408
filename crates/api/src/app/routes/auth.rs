use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::{AppServices, dto, errors};
use crate::context::IdentityContext;

pub async fn sign_up(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    match services.identity.sign_up(&body.email, &body.password).await {
        Ok(identity) => (StatusCode::CREATED, Json(identity)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    match services.identity.sign_in(&body.email, &body.password).await {
        Ok(session) => Json(dto::SessionResponse::from(session)).into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}

pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
) -> axum::response::Response {
    match services.identity.sign_out(ctx.token()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::identity_error_to_response(e),
    }
}
