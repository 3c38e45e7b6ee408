use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use bizdesk_infra::IdentityProvider;

use crate::app::errors::json_error;
use crate::context::IdentityContext;

#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<dyn IdentityProvider>,
}

/// Resolve the bearer token to a live session and attach [`IdentityContext`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token.to_string(),
        Err(status) => return json_error(status, "unauthorized", "missing bearer token"),
    };

    let Some(session) = state.identity.current_session(&token).await else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired session");
    };

    req.extensions_mut()
        .insert(IdentityContext::new(session.identity, session.session_id, token));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
