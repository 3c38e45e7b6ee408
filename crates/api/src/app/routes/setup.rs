use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::{AppServices, dto, errors};

/// Whether any business has been set up yet.
pub async fn status(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.scope.is_initialized().await {
        Ok(initialized) => Json(serde_json::json!({ "initialized": initialized })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// First-run setup: register the owner, create the business and sign them in.
///
/// The business input is checked before the account exists, so a rejected
/// form leaves nothing behind and can be resubmitted with the same email.
pub async fn setup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SetupRequest>,
) -> axum::response::Response {
    if let Err(e) = body.business.validate() {
        return errors::domain_error_to_response(e);
    }

    let identity = match services.identity.sign_up(&body.email, &body.password).await {
        Ok(identity) => identity,
        Err(e) => return errors::identity_error_to_response(e),
    };

    let business = match services.scope.setup(identity.id, body.business).await {
        Ok(business) => business,
        Err(e) => return errors::scope_error_to_response(e),
    };

    let session = match services.identity.sign_in(&body.email, &body.password).await {
        Ok(session) => session,
        Err(e) => return errors::identity_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "business": business,
            "session": dto::SessionResponse::from(session),
        })),
    )
        .into_response()
}
