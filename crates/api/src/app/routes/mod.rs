use axum::Router;

pub mod auth;
pub mod system;

/// Router for everything below `/api/v1`.
pub fn router() -> Router {
    Router::new().nest("/auth", auth::router())
}
