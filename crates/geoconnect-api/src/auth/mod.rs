//! Authentication and authorization
//!
//! - Password hashing with Argon2id
//! - JWT issuance and verification
//! - Bearer-token middleware and the `Identity` extractor
//! - Admin set and the delete policy
//! - Signup/login service over the credential store

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;
pub mod service;

pub use jwt::{Claims, JwtConfig, JwtError, TokenIssuer, TokenVerdict};
pub use middleware::{auth_middleware, bearer_token, AuthError};
pub use models::{Identity, LoginRequest, LoginResponse, SignupRequest, StatusResponse};
pub use password::{CredentialHasher, PasswordError};
pub use policy::{can_delete, AdminSet};
pub use service::AuthService;
