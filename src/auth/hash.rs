//! One-way hashing for refresh tokens and passwords, and refresh token generation.

use base64::prelude::*;
use rand::Rng;
use std::sync::Arc;

use crate::errors::HashError;

/// One-way hash and verify capability for secrets
pub trait CredentialHasher: Send + Sync {
    /// Hash a secret for storage
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// Check a plaintext secret against a stored hash; a malformed hash never verifies
    fn verify(&self, secret: &str, hashed: &str) -> bool;
}

/// bcrypt-backed credential hasher
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        bcrypt::hash(secret, self.cost).map_err(|e| HashError::HashFailed(e.to_string()))
    }

    fn verify(&self, secret: &str, hashed: &str) -> bool {
        bcrypt::verify(secret, hashed).unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "stored credential hash could not be verified");
            false
        })
    }
}

/// Hash a secret on the blocking pool
pub async fn hash_secret(
    hasher: Arc<dyn CredentialHasher>,
    secret: String,
) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hasher.hash(&secret))
        .await
        .map_err(|e| HashError::TaskFailed(e.to_string()))?
}

/// Verify a secret on the blocking pool
pub async fn verify_secret(
    hasher: Arc<dyn CredentialHasher>,
    secret: String,
    hashed: String,
) -> Result<bool, HashError> {
    tokio::task::spawn_blocking(move || hasher.verify(&secret, &hashed))
        .await
        .map_err(|e| HashError::TaskFailed(e.to_string()))
}

/// Generate a refresh token: 256 random bits, URL-safe base64 without padding
pub fn generate_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcrypt_hash_and_verify() {
        let hasher = BcryptHasher::new(4);
        let hashed = hasher.hash("correct horse").unwrap();

        assert_ne!(hashed, "correct horse");
        assert!(hasher.verify("correct horse", &hashed));
        assert!(!hasher.verify("battery staple", &hashed));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = BcryptHasher::new(4);
        assert!(!hasher.verify("secret", "not-a-bcrypt-hash"));
        assert!(!hasher.verify("secret", ""));
    }

    #[test]
    fn test_generate_refresh_token() {
        let first = generate_refresh_token();
        let second = generate_refresh_token();

        assert_eq!(first.len(), 43);
        assert_ne!(first, second);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(BcryptHasher::new(4));
        let hashed = hash_secret(hasher.clone(), "secret".to_string())
            .await
            .unwrap();

        assert!(
            verify_secret(hasher.clone(), "secret".to_string(), hashed.clone())
                .await
                .unwrap()
        );
        assert!(
            !verify_secret(hasher, "other".to_string(), hashed)
                .await
                .unwrap()
        );
    }
}
