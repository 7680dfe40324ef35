//! Authentication request/response models and the caller identity

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub gender: String,
}

/// Credential exchange request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    pub password: String,
}

/// Issued bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

/// Generic success acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "ok")]
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Authenticated caller, established from a verified token
///
/// Inserted into request extensions by the auth middleware. Handlers take it
/// as an extractor argument; it never comes from the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    #[schema(example = "alice")]
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_optional_profile() {
        let req: SignupRequest =
            serde_json::from_str(r#"{"username":"alice","password":"pw"}"#).unwrap();
        assert_eq!(req.age, 0);
        assert_eq!(req.gender, "");
    }

    #[test]
    fn test_login_request_requires_password() {
        assert!(serde_json::from_str::<LoginRequest>(r#"{"username":"alice"}"#).is_err());
    }
}
