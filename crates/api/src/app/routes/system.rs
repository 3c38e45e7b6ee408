use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::AppServices;
use crate::context::IdentityContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Identity plus the resolved application session (owner, employee or needs setup).
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
) -> axum::response::Response {
    let session = services.scope.load_session(ctx.identity().clone()).await;

    Json(serde_json::json!({
        "identity_id": ctx.identity_id().to_string(),
        "email": ctx.identity().email,
        "session_id": ctx.session_id().to_string(),
        "phase": session.phase(),
        "business_id": session.business_id().map(|id| id.to_string()),
        "is_owner": session.is_owner(),
        "employee": session.employee(),
    }))
    .into_response()
}
