//! HTTP API application wiring (Axum router).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and mapping from domain types
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use bau_auth::TokenVerifier;

use crate::idp::IdentityProvider;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// `verifier = None` runs the local profile: no bearer token is inspected and
/// every request is anonymous.
pub fn build_app(
    verifier: Option<Arc<dyn TokenVerifier>>,
    idp: Arc<dyn IdentityProvider>,
) -> Router {
    let auth_state = middleware::AuthState { verifier };

    let api = routes::router()
        .layer(Extension(idp))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api)
        .layer(ServiceBuilder::new())
}
