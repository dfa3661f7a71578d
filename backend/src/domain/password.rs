//! Password hashing with bcrypt.
//!
//! Hashing and verification are CPU bound, so the async helpers move the work
//! onto the blocking pool.

use std::fmt;

use zeroize::Zeroizing;

/// Work factor used for new hashes outside tests.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Failures raised while hashing or verifying a password.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {message}")]
    Hashing { message: String },
    #[error("password hashing task aborted: {message}")]
    Aborted { message: String },
}

/// A bcrypt hash of a user password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash `plain` with the given bcrypt cost.
    pub fn create(plain: &str, cost: u32) -> Result<Self, PasswordError> {
        bcrypt::hash(plain, cost)
            .map(Self)
            .map_err(|err| PasswordError::Hashing {
                message: err.to_string(),
            })
    }

    /// Wrap a hash loaded from storage.
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Check whether `plain` matches this hash.
    pub fn verify(&self, plain: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(plain, &self.0).map_err(|err| PasswordError::Hashing {
            message: err.to_string(),
        })
    }

    /// Hash on the blocking pool.
    pub async fn create_blocking(
        plain: Zeroizing<String>,
        cost: u32,
    ) -> Result<Self, PasswordError> {
        tokio::task::spawn_blocking(move || Self::create(&plain, cost))
            .await
            .map_err(|err| PasswordError::Aborted {
                message: err.to_string(),
            })?
    }

    /// Verify on the blocking pool.
    pub async fn verify_blocking(&self, plain: Zeroizing<String>) -> Result<bool, PasswordError> {
        let hash = self.clone();
        tokio::task::spawn_blocking(move || hash.verify(&plain))
            .await
            .map_err(|err| PasswordError::Aborted {
                message: err.to_string(),
            })?
    }

    /// Encoded hash suitable for storage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}
