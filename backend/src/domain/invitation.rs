//! One-time invitation tokens used to activate new accounts.
//!
//! Only the sha256 digest of a token is persisted; the plaintext is handed to
//! the registrant and mailed out.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How long an invitation stays valid after registration.
pub const INVITATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Plaintext invitation token.
#[derive(Clone, PartialEq, Eq)]
pub struct InvitationToken(String);

impl InvitationToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a token received from a client.
    pub fn from_plain(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex sha256 digest stored at rest.
    #[must_use]
    pub fn digest(&self) -> TokenDigest {
        TokenDigest(hex::encode(Sha256::digest(self.0.as_bytes())))
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken(<redacted>)")
    }
}

/// Hex-encoded sha256 of an invitation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenDigest(String);

impl TokenDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Invitation row to persist alongside a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub digest: TokenDigest,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// Invitation for `token` expiring [`INVITATION_TTL`] after `now`.
    #[must_use]
    pub fn issue(token: &InvitationToken, now: DateTime<Utc>) -> Self {
        let ttl =
            chrono::Duration::from_std(INVITATION_TTL).unwrap_or_else(|_| chrono::Duration::days(1));
        Self {
            digest: token.digest(),
            expires_at: now + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
