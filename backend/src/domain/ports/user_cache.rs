//! Port for the disposable user cache consulted before the user store.
use async_trait::async_trait;

use crate::domain::{User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user cache adapters.
    pub enum UserCacheError {
        /// The cache backend could not be reached or rejected the command.
        Backend { message: String } => "user cache backend failed: {message}",
        /// A cached value could not be encoded or decoded.
        Serialization { message: String } => "user cache serialisation failed: {message}",
    }
}

/// Key-value cache of [`User`] records with adapter-defined expiry.
///
/// A miss is `Ok(None)`; it must never be reported as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>, UserCacheError>;

    async fn put(&self, user: &User) -> Result<(), UserCacheError>;
}

/// Cache key for a user record.
#[must_use]
pub fn user_cache_key(id: UserId) -> String {
    format!("user-{id}")
}
