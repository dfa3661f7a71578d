//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL through `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Bounded calls**: every operation runs under a five second deadline.
//!
//! # Example
//!
//! ```ignore
//! use murmur::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/murmur")).await?;
//! let users = DieselUserRepository::new(pool);
//! ```

mod diesel_comment_repository;
mod diesel_follow_repository;
pub(crate) mod diesel_helpers;
mod diesel_post_repository;
mod diesel_role_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_comment_repository::DieselCommentRepository;
pub use diesel_follow_repository::DieselFollowRepository;
pub use diesel_post_repository::DieselPostRepository;
pub use diesel_role_repository::DieselRoleRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
