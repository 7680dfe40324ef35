//! JWT token issuance and verification
//!
//! Tokens are HMAC-SHA256 signed and carry the username, the admin flag
//! computed at login, and issue/expiry times. Expiry is checked against an
//! injected clock rather than the library's own time source so it can be
//! exercised deterministically.

use super::models::Identity;
use geoconnect_core::{AuthConfig, Clock, SystemClock};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - normalized username
    pub sub: String,
    /// Admin authority at the time of login
    pub admin: bool,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// JWT issuance errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
}

/// Outcome of verifying a presented token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    Authenticated(Identity),
    Expired,
    Invalid,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret
    pub secret: String,
    /// Token lifetime in seconds
    pub ttl_secs: u64,
    /// Issuer written into and required from every token
    pub issuer: String,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl_secs: config.token_ttl_secs,
            issuer: config.issuer.clone(),
        }
    }
}

/// Signs and verifies tokens with a fixed key
pub struct TokenIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
            clock,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.config.ttl_secs
    }

    /// Issue a token for `username` valid for the configured lifetime
    pub fn issue(&self, username: &str, is_admin: bool) -> Result<String, JwtError> {
        let now = self.clock.now().timestamp();
        let ttl = i64::try_from(self.config.ttl_secs).unwrap_or(i64::MAX);

        let claims = Claims {
            iss: self.config.issuer.clone(),
            sub: username.to_string(),
            admin: is_admin,
            iat: now,
            exp: now.saturating_add(ttl),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify signature, issuer, claim shape and expiry
    ///
    /// A token is expired once the clock reaches its `exp`.
    pub fn verify(&self, token: &str) -> TokenVerdict {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = false;

        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "Token rejected");
                return TokenVerdict::Invalid;
            }
        };

        if claims.sub.is_empty() {
            return TokenVerdict::Invalid;
        }
        if self.clock.now().timestamp() >= claims.exp {
            return TokenVerdict::Expired;
        }

        TokenVerdict::Authenticated(Identity::new(claims.sub, claims.admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use geoconnect_core::FixedClock;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-unit-tests".to_string(),
            ttl_secs: 24 * 60 * 60,
            issuer: "geoconnect".to_string(),
        }
    }

    fn issuer_at(seconds_after_t0: i64) -> TokenIssuer {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        TokenIssuer::with_clock(
            config(),
            Arc::new(FixedClock(t0 + Duration::seconds(seconds_after_t0))),
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer_at(0);
        let token = issuer.issue("alice", false).unwrap();

        assert_eq!(
            issuer.verify(&token),
            TokenVerdict::Authenticated(Identity::new("alice", false))
        );
    }

    #[test]
    fn test_admin_flag_round_trips() {
        let issuer = issuer_at(0);
        let token = issuer.issue("root", true).unwrap();

        match issuer.verify(&token) {
            TokenVerdict::Authenticated(identity) => assert!(identity.is_admin),
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let token = issuer_at(0).issue("alice", false).unwrap();
        let day = 24 * 60 * 60;

        assert!(matches!(
            issuer_at(day - 1).verify(&token),
            TokenVerdict::Authenticated(_)
        ));
        assert_eq!(issuer_at(day).verify(&token), TokenVerdict::Expired);
        assert_eq!(issuer_at(day + 1).verify(&token), TokenVerdict::Expired);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = issuer_at(0).issue("alice", false).unwrap();

        let other = TokenIssuer::new(JwtConfig {
            secret: "a-completely-different-secret".to_string(),
            ..config()
        });
        assert_eq!(other.verify(&token), TokenVerdict::Invalid);
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let token = issuer_at(0).issue("alice", false).unwrap();

        let other = TokenIssuer::new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..config()
        });
        assert_eq!(other.verify(&token), TokenVerdict::Invalid);
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let issuer = issuer_at(0);
        assert_eq!(issuer.verify(""), TokenVerdict::Invalid);
        assert_eq!(issuer.verify("not-a-jwt"), TokenVerdict::Invalid);
        assert_eq!(issuer.verify("a.b.c"), TokenVerdict::Invalid);
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let issuer = issuer_at(0);
        let token = issuer.issue("alice", false).unwrap();

        // swap in a payload claiming admin, keep the original signature
        let forged = issuer.issue("alice", true).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(issuer.verify(&spliced), TokenVerdict::Invalid);
    }

    #[test]
    fn test_wrong_claim_shape_is_invalid() {
        #[derive(Serialize)]
        struct OtherClaims {
            iss: String,
            sub: String,
            exp: i64,
            admin: String,
        }

        let claims = OtherClaims {
            iss: "geoconnect".to_string(),
            sub: "alice".to_string(),
            exp: i64::MAX / 2,
            admin: "yes".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config().secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(issuer_at(0).verify(&token), TokenVerdict::Invalid);
    }
}
