//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, health, posts};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Create the application routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(health::root_banner))
        .route("/health", get(health::health_check))
        .route("/signup", post(auth::signup_handler))
        .route("/login", post(auth::login_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route("/post", post(posts::create_post))
        .route("/post/:id", delete(posts::delete_post))
        .route("/search", get(posts::search_posts))
        .route("/search/area", get(posts::search_area))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
