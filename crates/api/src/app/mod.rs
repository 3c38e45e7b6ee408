//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: record store / identity provider wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, StartupError};

/// Build the full HTTP router around `services`.
pub fn build_app(services: AppServices) -> Router {
    let auth_state = middleware::AuthState {
        identity: services.identity.clone(),
    };
    let services = Arc::new(services);

    // Protected routes: require a live session.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services.clone()))
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            )),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/setup/status", get(routes::setup::status))
        .route("/setup", post(routes::setup::setup))
        .route("/auth/sign-up", post(routes::auth::sign_up))
        .route("/auth/sign-in", post(routes::auth::sign_in))
        .layer(Extension(services))
        .merge(protected)
}
