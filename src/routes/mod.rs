pub mod auth;

use axum::Router;

fn api_v1_router() -> Router {
    Router::new().nest("/auth", auth::auth_router())
}

// Main router that serves as the entry point for all routes
pub fn main_router() -> Router {
    Router::new().nest("/api/v1", api_v1_router())
}
