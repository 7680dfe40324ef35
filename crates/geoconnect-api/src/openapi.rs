//! OpenAPI document
//!
//! Author: hephaex@gmail.com

use crate::auth::{Identity, LoginRequest, LoginResponse, SignupRequest, StatusResponse};
use crate::error::ApiError;
use crate::handlers::{self, health::HealthResponse, posts};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "GeoConnect API", description = "Geotagged posts with radius and area search"),
    paths(
        handlers::health::health_check,
        handlers::auth::signup_handler,
        handlers::auth::login_handler,
        handlers::auth::me_handler,
        handlers::posts::create_post,
        handlers::posts::search_posts,
        handlers::posts::search_area,
        handlers::posts::delete_post,
    ),
    components(schemas(
        ApiError,
        HealthResponse,
        SignupRequest,
        LoginRequest,
        LoginResponse,
        StatusResponse,
        Identity,
        posts::GeoPoint,
        posts::CreatePostRequest,
        posts::CreatePostResponse,
        posts::PostResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Signup, login and identity"),
        (name = "posts", description = "Create, search and delete posts"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in ["/signup", "/login", "/post", "/post/{id}", "/search", "/search/area"] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
