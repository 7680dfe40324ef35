//! Authentication API handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientInfo;
use crate::auth::{Identity, LoginRequest, SignupRequest, StatusResponse};
use crate::error::{ApiJson, AppError};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use std::sync::Arc;

/// Create an account
///
/// The username is trimmed and lowercased, then must match `[a-z0-9_]+`.
/// Only an Argon2id digest of the password is stored.
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = StatusResponse),
        (status = 400, description = "Invalid username or password", body = crate::error::ApiError),
        (status = 409, description = "Username already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    state.auth.signup(request, &client).await?;

    Ok(Json(StatusResponse::ok()))
}

/// Exchange username and password for a bearer token
///
/// Every credential failure returns the same 401 body.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::auth::LoginResponse),
        (status = 400, description = "Malformed body or empty fields", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let response = state.auth.login(request, &client).await?;

    Ok(Json(response))
}

/// The caller's verified identity
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current identity", body = Identity),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(identity: Identity) -> Json<Identity> {
    Json(identity)
}
