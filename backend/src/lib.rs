//! murmur: a small social network service.
//!
//! Hexagonal layout: [`domain`] owns entities, services and ports;
//! [`inbound`] adapts HTTP onto the domain; [`outbound`] implements the
//! ports for PostgreSQL, Redis, mail delivery and token signing.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod rate_limit;
pub mod seed;
#[cfg(test)]
mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::{RateLimit, Trace};
