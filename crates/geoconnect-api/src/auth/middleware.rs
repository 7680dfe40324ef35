/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header, verifies it
/// with the application's token issuer and stores the resulting `Identity`
/// in request extensions. Handlers take `Identity` as an extractor.
use super::jwt::TokenVerdict;
use super::models::Identity;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;

/// Authentication errors; all map to 401
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingAuthHeader,

    #[error("invalid authorization header")]
    InvalidAuthHeader,

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid token")]
    InvalidToken,
}

impl AuthError {
    fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_header",
            AuthError::InvalidAuthHeader => "malformed_header",
            AuthError::ExpiredToken => "expired",
            AuthError::InvalidToken => "invalid",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("UNAUTHORIZED", self.to_string())),
        )
            .into_response()
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Middleware requiring a valid, unexpired bearer token
///
/// ```ignore
/// let protected = Router::new()
///     .route("/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let verdict = bearer_token(request.headers()).and_then(|token| {
        match state.auth.verify_token(token) {
            TokenVerdict::Authenticated(identity) => Ok(identity),
            TokenVerdict::Expired => Err(AuthError::ExpiredToken),
            TokenVerdict::Invalid => Err(AuthError::InvalidToken),
        }
    });

    let identity = match verdict {
        Ok(identity) => identity,
        Err(e) => {
            let client = ClientInfo::from_headers(request.headers());
            audit_log(&AuditEvent::InvalidToken {
                reason: e.reason().to_string(),
                ip_address: client.ip_address,
                user_agent: client.user_agent,
            });
            return Err(e);
        }
    };

    tracing::debug!(username = %identity.username, "Request authenticated");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(&headers_with("bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(&headers_with("BEARER  abc ")), Ok("abc"));
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert_eq!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingAuthHeader)
        );
        assert_eq!(
            bearer_token(&headers_with("Basic dXNlcjpwdw==")),
            Err(AuthError::InvalidAuthHeader)
        );
        assert_eq!(
            bearer_token(&headers_with("Bearer")),
            Err(AuthError::InvalidAuthHeader)
        );
        assert_eq!(
            bearer_token(&headers_with("Bearer   ")),
            Err(AuthError::InvalidAuthHeader)
        );
    }

    #[tokio::test]
    async fn test_identity_extractor_requires_middleware() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let result = Identity::from_request_parts(&mut parts, &()).await;
        assert_eq!(result, Err(AuthError::MissingAuthHeader));

        parts.extensions.insert(Identity::new("alice", false));
        let identity = Identity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(identity.username, "alice");
    }
}
