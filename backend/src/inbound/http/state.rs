//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use crate::domain::{AccountService, FollowService, PostAccessPolicy, PostService, UserLookup};

/// Deployment facts reported by `GET /v1/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub environment: String,
    pub version: String,
}

impl AppInfo {
    /// Report `environment` with the crate version.
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// Parameter object bundling the services behind the HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub accounts: Arc<AccountService>,
    pub users: Arc<UserLookup>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub access: Arc<PostAccessPolicy>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<AccountService>,
    pub users: Arc<UserLookup>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub access: Arc<PostAccessPolicy>,
    pub info: AppInfo,
}

impl HttpState {
    /// Construct state from a services bundle.
    pub fn new(ports: HttpStatePorts, info: AppInfo) -> Self {
        let HttpStatePorts {
            accounts,
            users,
            posts,
            follows,
            access,
        } = ports;
        Self {
            accounts,
            users,
            posts,
            follows,
            access,
            info,
        }
    }
}
