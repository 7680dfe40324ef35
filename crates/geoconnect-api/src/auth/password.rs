/// Password hashing and verification using Argon2id
///
/// Digests are PHC strings carrying algorithm, parameters and a 16-byte
/// random salt, so the cost can be raised later without invalidating
/// existing digests. Verification reads the parameters from the digest.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use geoconnect_core::HashingConfig;
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Password exceeds {max} bytes")]
    TooLong { max: usize },
}

/// Argon2id hasher with a fixed cost
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
    max_password_bytes: usize,
}

impl CredentialHasher {
    pub fn new(config: &HashingConfig, max_password_bytes: usize) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self {
            params,
            max_password_bytes,
        })
    }

    pub fn max_password_bytes(&self) -> usize {
        self.max_password_bytes
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > self.max_password_bytes {
            return Err(PasswordError::TooLong {
                max: self.max_password_bytes,
            });
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Check a plaintext password against a stored digest
    ///
    /// Returns false for a mismatch, an oversized password, or a digest that
    /// cannot be parsed.
    pub fn verify(&self, digest: &str, password: &str) -> bool {
        if password.len() > self.max_password_bytes {
            return false;
        }

        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password digest is malformed");
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cheap_hasher() -> CredentialHasher {
        let config = HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        };
        CredentialHasher::new(&config, 1024).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap_hasher();
        let digest = hasher.hash("hunter2").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify(&digest, "hunter2"));
        assert!(!hasher.verify(&digest, "hunter3"));
    }

    #[test]
    fn test_same_password_different_digests() {
        let hasher = cheap_hasher();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify(&a, "same"));
        assert!(hasher.verify(&b, "same"));
    }

    #[test]
    fn test_digest_records_cost() {
        let config = HashingConfig {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        };
        let hasher = CredentialHasher::new(&config, 1024).unwrap();
        let digest = hasher.hash("pw").unwrap();

        assert!(digest.contains("m=16"));
        assert!(digest.contains("t=2"));
        assert!(digest.contains("p=1"));

        // verification uses the digest's own parameters
        assert!(cheap_hasher().verify(&digest, "pw"));
    }

    #[test]
    fn test_malformed_digest_never_verifies() {
        let hasher = cheap_hasher();
        assert!(!hasher.verify("", "pw"));
        assert!(!hasher.verify("not-a-phc-string", "pw"));
        assert!(!hasher.verify("$argon2id$v=19$garbage", "pw"));
    }

    #[test]
    fn test_password_length_bound() {
        let hasher = cheap_hasher();
        let long = "x".repeat(1025);

        assert!(matches!(
            hasher.hash(&long),
            Err(PasswordError::TooLong { max: 1024 })
        ));
        assert!(hasher.hash(&"x".repeat(1024)).is_ok());

        let digest = hasher.hash("short").unwrap();
        assert!(!hasher.verify(&digest, &long));
    }

    #[test]
    fn test_invalid_params() {
        let config = HashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            CredentialHasher::new(&config, 1024),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_verify_accepts_only_the_hashed_password(
            password in ".{0,64}",
            other in ".{0,64}",
        ) {
            let hasher = cheap_hasher();
            let digest = hasher.hash(&password).unwrap();

            prop_assert!(hasher.verify(&digest, &password));
            if other != password {
                prop_assert!(!hasher.verify(&digest, &other));
            }
        }
    }
}
