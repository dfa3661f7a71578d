//! Cache-aside user lookup.
//!
//! The durable store is the source of truth. When a cache is configured it is
//! consulted first; misses are filled from the store and written back. Cache
//! failures surface as errors instead of silently bypassing the cache.

use std::sync::Arc;

use tracing::debug;

use super::ports::{UserCache, UserCacheError, UserPersistenceError, UserRepository};
use super::{Error, User, UserId};

/// Resolve users by id, optionally through a cache.
#[derive(Clone)]
pub struct UserLookup {
    users: Arc<dyn UserRepository>,
    cache: Option<Arc<dyn UserCache>>,
}

pub(crate) fn map_user_persistence_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user store unavailable: {message}"))
        }
        UserPersistenceError::UserNotFound { .. } => Error::not_found("user not found"),
        UserPersistenceError::InvitationNotFound => Error::not_found("invitation not found"),
        UserPersistenceError::DuplicateEmail | UserPersistenceError::DuplicateUsername => {
            Error::conflict(error.to_string())
        }
        UserPersistenceError::Query { .. } | UserPersistenceError::MissingRole { .. } => {
            Error::internal(error.to_string())
        }
    }
}

fn map_cache_error(error: UserCacheError) -> Error {
    match error {
        UserCacheError::Backend { message } => {
            Error::service_unavailable(format!("user cache unavailable: {message}"))
        }
        UserCacheError::Serialization { .. } => Error::internal(error.to_string()),
    }
}

impl UserLookup {
    /// Lookup that always reads the store.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users, cache: None }
    }

    /// Route reads through `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn UserCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn load(&self, id: UserId) -> Result<User, Error> {
        self.users
            .find_by_id(id)
            .await
            .map_err(map_user_persistence_error)?
            .ok_or_else(|| Error::not_found("user not found"))
    }

    /// Fetch an active user.
    pub async fn get_user(&self, id: UserId) -> Result<User, Error> {
        let Some(cache) = &self.cache else {
            return self.load(id).await;
        };

        if let Some(user) = cache.get(id).await.map_err(map_cache_error)? {
            debug!(user_id = %id, "user cache hit");
            return Ok(user);
        }

        debug!(user_id = %id, "user cache miss");
        let user = self.load(id).await?;
        cache.put(&user).await.map_err(map_cache_error)?;
        Ok(user)
    }
}
