//! In-memory adapters.
//!
//! Used by tests and by the server when no `DATABASE_URL` is configured.

mod store;
mod user_cache;

pub use store::InMemoryStore;
pub use user_cache::InMemoryUserCache;
