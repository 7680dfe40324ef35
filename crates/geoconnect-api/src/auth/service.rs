//! Authentication service layer
//!
//! Signup and login business logic on top of a credential store. Login
//! failures are deliberately indistinguishable to the client: unknown users,
//! wrong passwords and unreadable stored digests all return the same error,
//! and an unknown user still pays for one hash verification.

use super::jwt::{JwtConfig, TokenIssuer, TokenVerdict};
use super::models::{LoginRequest, LoginResponse, SignupRequest};
use super::password::CredentialHasher;
use super::policy::AdminSet;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::AppError;
use geoconnect_core::{AuthConfig, Clock, Credential, CredentialStore, GeoError};
use std::sync::Arc;

/// Authentication service
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    admins: AdminSet,
    /// Verified against when the user does not exist
    dummy_digest: String,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        admins: AdminSet,
    ) -> Result<Self, AppError> {
        let dummy_digest = hasher.hash("geoconnect-timing-equalizer")?;
        Ok(Self {
            credentials,
            hasher,
            tokens,
            admins,
            dummy_digest,
        })
    }

    /// Build the service from config with the given clock
    pub fn from_config(
        config: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let hasher = CredentialHasher::new(&config.hashing, config.max_password_bytes)?;
        let tokens = TokenIssuer::with_clock(JwtConfig::from(config), clock);
        Self::new(credentials, hasher, tokens, AdminSet::new(&config.admins))
    }

    pub fn admins(&self) -> &AdminSet {
        &self.admins
    }

    pub fn verify_token(&self, token: &str) -> TokenVerdict {
        self.tokens.verify(token)
    }

    /// Register a new account
    ///
    /// Returns the normalized username.
    pub async fn signup(
        &self,
        request: SignupRequest,
        client: &ClientInfo,
    ) -> Result<String, AppError> {
        let username = Credential::normalize_username(&request.username);

        let result = self.create_account(&username, request).await;
        match &result {
            Ok(()) => audit_log(&AuditEvent::SignupSuccess {
                username: username.clone(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            }),
            Err(e) => audit_log(&AuditEvent::SignupFailure {
                username: username.clone(),
                reason: signup_failure_reason(e).to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            }),
        }

        result.map(|()| username)
    }

    async fn create_account(&self, username: &str, request: SignupRequest) -> Result<(), AppError> {
        if !Credential::is_valid_username(username) {
            return Err(AppError::BadRequest(
                "username must be non-empty and use only a-z, 0-9 and _".to_string(),
            ));
        }
        if request.password.is_empty() {
            return Err(AppError::BadRequest("password is required".to_string()));
        }
        if request.password.len() > self.hasher.max_password_bytes() {
            return Err(AppError::BadRequest(format!(
                "password must be at most {} bytes",
                self.hasher.max_password_bytes()
            )));
        }

        // cheap early answer; the create-only write below is what enforces uniqueness
        if self.credentials.get_by_username(username).await?.is_some() {
            return Err(username_taken());
        }

        let hasher = self.hasher.clone();
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))??;

        let credential = Credential {
            username: username.to_string(),
            password_hash,
            age: request.age,
            gender: request.gender,
        };

        match self.credentials.create(&credential).await {
            Ok(()) => Ok(()),
            Err(GeoError::Conflict(_)) => Err(username_taken()),
            Err(e) => Err(e.into()),
        }
    }

    /// Exchange credentials for a signed token
    pub async fn login(
        &self,
        request: LoginRequest,
        client: &ClientInfo,
    ) -> Result<LoginResponse, AppError> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::BadRequest(
                "username and password are required".to_string(),
            ));
        }
        let username = Credential::normalize_username(&request.username);

        let outcome = self.check_credentials(&username, request.password).await;
        let failure = |reason: &str| {
            audit_log(&AuditEvent::LoginFailure {
                username: username.clone(),
                reason: reason.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
        };

        match outcome {
            Ok(LoginCheck::Verified) => {}
            Ok(LoginCheck::Rejected(reason)) => {
                failure(reason);
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => {
                failure("lookup_failed");
                return Err(e);
            }
        }

        let is_admin = self.admins.contains(&username);
        let token = self.tokens.issue(&username, is_admin)?;

        audit_log(&AuditEvent::LoginSuccess {
            username: username.clone(),
            is_admin,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_secs(),
        })
    }

    async fn check_credentials(
        &self,
        username: &str,
        password: String,
    ) -> Result<LoginCheck, AppError> {
        let (digest, reason) = if Credential::is_valid_username(username) {
            match self.credentials.get_by_username(username).await? {
                Some(credential) => (credential.password_hash, "wrong_password"),
                None => (self.dummy_digest.clone(), "unknown_user"),
            }
        } else {
            (self.dummy_digest.clone(), "invalid_username")
        };
        let is_dummy = reason != "wrong_password";

        let hasher = self.hasher.clone();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {e}")))?;

        Ok(if matched && !is_dummy {
            LoginCheck::Verified
        } else {
            LoginCheck::Rejected(reason)
        })
    }
}

enum LoginCheck {
    Verified,
    Rejected(&'static str),
}

fn username_taken() -> AppError {
    AppError::Conflict("username already exists".to_string())
}

fn signup_failure_reason(error: &AppError) -> &'static str {
    match error {
        AppError::BadRequest(_) => "invalid_input",
        AppError::Conflict(_) => "username_taken",
        _ => "internal_error",
    }
}
