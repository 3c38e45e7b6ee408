//! Error → JSON response mapping: `{ "error": code, "message": text }`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bizdesk_auth::AuthzError;
use bizdesk_core::DomainError;
use bizdesk_infra::{IdentityError, ScopeError, ServiceError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "unauthorized"),
    }
}

/// Store messages are passed through verbatim.
pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Rejected(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "store_rejected", msg),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "record store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn scope_error_to_response(err: ScopeError) -> axum::response::Response {
    match err {
        ScopeError::NotInitialized => json_error(
            StatusCode::CONFLICT,
            "business_not_initialized",
            err.to_string(),
        ),
        ScopeError::Ambiguous(_) => json_error(StatusCode::CONFLICT, "ambiguous_business", err.to_string()),
        ScopeError::AlreadySetUp => json_error(StatusCode::CONFLICT, "already_set_up", err.to_string()),
        ScopeError::Invalid(e) => domain_error_to_response(e),
        ScopeError::Store(e) => store_error_to_response(e),
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Invalid(e) => domain_error_to_response(e),
        ServiceError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        ServiceError::Forbidden(e) => authz_error_to_response(e),
        ServiceError::Scope(e) => scope_error_to_response(e),
        ServiceError::Store(e) => store_error_to_response(e),
    }
}

pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    match err {
        IdentityError::EmailTaken => json_error(StatusCode::CONFLICT, "email_taken", err.to_string()),
        IdentityError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        IdentityError::InvalidEmail | IdentityError::Password(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        IdentityError::Token(_) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string()),
        IdentityError::Backend(_) => {
            tracing::error!(error = %err, "identity provider failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "identity_error", err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_is_a_conflict() {
        let res = scope_error_to_response(ScopeError::NotInitialized);
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn service_errors_map_to_status() {
        assert_eq!(
            service_error_to_response(ServiceError::NotFound("role")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            service_error_to_response(ServiceError::Forbidden(AuthzError::OwnerOnly)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            service_error_to_response(ServiceError::Store(StoreError::Conflict("dup".into()))).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            service_error_to_response(ServiceError::Invalid(DomainError::validation("bad"))).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
