//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **memory**: process-local repositories and cache
//! - **cache**: Redis-backed user cache
//! - **mail**: invitation mail delivery
//! - **token**: signed access tokens
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod mail;
pub mod memory;
pub mod persistence;
pub mod token;
