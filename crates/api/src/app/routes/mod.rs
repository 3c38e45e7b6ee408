use axum::{
    Router,
    routing::{get, post, put},
};

pub mod auth;
pub mod business;
pub mod employees;
pub mod permissions;
pub mod roles;
pub mod setup;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/sign-out", post(auth::sign_out))
        .route(
            "/business",
            get(business::get_business)
                .patch(business::update_business)
                .post(business::create_business),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route("/roles/:id", axum::routing::patch(roles::update_role).delete(roles::delete_role))
        .route("/roles/:id/permissions/:module", put(roles::set_permission))
        .route("/permissions/check", get(permissions::check))
        .route("/permissions/explain", get(permissions::explain))
        .route("/employees", get(employees::list_employees).post(employees::create_employee))
        .route("/employees/:id", axum::routing::patch(employees::update_employee))
        .route("/employees/:id/roles", get(employees::employee_roles))
        .route(
            "/employees/:id/roles/:role_id",
            put(employees::assign_role).delete(employees::unassign_role),
        )
}
