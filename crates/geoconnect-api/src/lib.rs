//! GeoConnect API - HTTP server
//!
//! Signup/login with bearer tokens, geotagged posts, and radius/area search.
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod posts;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    Router,
};
use geoconnect_core::config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the application router with all middleware layers
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = state.config.server.clone();

    let mut router = routes::api_routes(state.clone()).merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
    );

    if let Some(dir) = &server.static_dir {
        tracing::info!(dir = %dir.display(), "Serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors_layer(&server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy; an empty origin list allows any origin
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if server.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(feature = "test-utils")]
pub mod testing {
    //! In-memory application for integration tests

    use super::*;
    use geoconnect_core::config::AppConfig;
    use geoconnect_core::memory::{InMemoryBlobStore, InMemoryCredentialStore, InMemoryPostStore};
    use geoconnect_core::{Clock, HashingConfig, SystemClock};

    /// Router plus handles on its in-memory collaborators
    pub struct TestApp {
        pub router: Router,
        pub state: Arc<AppState>,
        pub credentials: Arc<InMemoryCredentialStore>,
        pub posts: Arc<InMemoryPostStore>,
        pub blobs: Arc<InMemoryBlobStore>,
    }

    /// Config with cheap hashing and `root` as the only admin
    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-test-secret-key".to_string();
        config.auth.admins = vec!["root".to_string()];
        config.auth.hashing = HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        };
        config
    }

    pub fn test_app_with(config: AppConfig, clock: Arc<dyn Clock>) -> TestApp {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let posts = Arc::new(InMemoryPostStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());

        let state = Arc::new(
            AppState::with_clock(
                config,
                credentials.clone(),
                posts.clone(),
                blobs.clone(),
                clock,
            )
            .expect("test state"),
        );

        TestApp {
            router: create_router(state.clone()),
            state,
            credentials,
            posts,
            blobs,
        }
    }

    pub fn test_app() -> TestApp {
        test_app_with(test_config(), Arc::new(SystemClock))
    }
}

/// Router over in-memory collaborators
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    testing::test_app().router
}
