//! User cache adapters.
//!
//! [`RedisUserCache`] is used when `REDIS_ENABLED` is set; otherwise user
//! lookups go straight to the store.

mod config;
mod redis_user_cache;

pub use config::{InvalidRedisAddress, UserCacheSettings};
pub use redis_user_cache::{RedisUserCache, USER_CACHE_TTL};
