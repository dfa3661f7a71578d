//! Redis-backed `UserCache` using a `bb8` connection pool.
//!
//! Users are stored as JSON under `user-{id}` with a fixed expiry. Every
//! command is bounded so a stalled Redis cannot hold a request hostage.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::{RedisConnectionManager, bb8, redis};
use tracing::debug;

use crate::domain::ports::{UserCache, UserCacheError, user_cache_key};
use crate::domain::{User, UserId};

use super::UserCacheSettings;

/// Lifetime of a cached user record.
pub const USER_CACHE_TTL: Duration = Duration::from_secs(60);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);
const POOL_SIZE: u32 = 16;

/// Redis user cache adapter.
#[derive(Clone)]
pub struct RedisUserCache {
    pool: bb8::Pool<RedisConnectionManager>,
    ttl: Duration,
}

impl RedisUserCache {
    /// Connect a pool to the configured Redis server.
    ///
    /// # Errors
    ///
    /// Returns [`UserCacheError::Backend`] when the URL is invalid or no
    /// connection can be opened.
    pub async fn connect(settings: &UserCacheSettings) -> Result<Self, UserCacheError> {
        let url = settings
            .connection_url()
            .map_err(|err| UserCacheError::backend(err.to_string()))?;
        let manager = RedisConnectionManager::new(url.as_str()).map_err(map_redis_error)?;
        let pool = bb8::Pool::builder()
            .max_size(POOL_SIZE)
            .connection_timeout(COMMAND_TIMEOUT)
            .build(manager)
            .await
            .map_err(map_redis_error)?;
        Ok(Self {
            pool,
            ttl: USER_CACHE_TTL,
        })
    }

    async fn connection(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, UserCacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| UserCacheError::backend(err.to_string()))
    }
}

fn map_redis_error(error: redis::RedisError) -> UserCacheError {
    UserCacheError::backend(error.to_string())
}

async fn bounded<T, F>(command: &'static str, future: F) -> Result<T, UserCacheError>
where
    F: std::future::Future<Output = Result<T, UserCacheError>>,
{
    tokio::time::timeout(COMMAND_TIMEOUT, future)
        .await
        .unwrap_or_else(|_| Err(UserCacheError::backend(format!("{command} timed out"))))
}

fn encode(user: &User) -> Result<String, UserCacheError> {
    serde_json::to_string(user).map_err(|err| UserCacheError::serialization(err.to_string()))
}

fn decode(payload: &str) -> Result<User, UserCacheError> {
    serde_json::from_str(payload).map_err(|err| UserCacheError::serialization(err.to_string()))
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, id: UserId) -> Result<Option<User>, UserCacheError> {
        bounded("GET", async {
            let mut conn = self.connection().await?;
            let payload: Option<String> = redis::cmd("GET")
                .arg(user_cache_key(id))
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_error)?;
            debug!(user_id = %id, hit = payload.is_some(), "user cache lookup");
            payload.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn put(&self, user: &User) -> Result<(), UserCacheError> {
        let payload = encode(user)?;
        bounded("SET", async {
            let mut conn = self.connection().await?;
            let _: () = redis::cmd("SET")
                .arg(user_cache_key(user.id))
                .arg(payload)
                .arg("EX")
                .arg(self.ttl.as_secs())
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_error)?;
            Ok(())
        })
        .await
    }
}
