//! Follow and unfollow use-cases.

use std::sync::Arc;

use tracing::info;

use super::ports::{FollowPersistenceError, FollowRepository};
use super::{Error, UserId};

fn map_follow_error(error: FollowPersistenceError) -> Error {
    match error {
        FollowPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("follow store unavailable: {message}"))
        }
        FollowPersistenceError::Query { .. } => Error::internal(error.to_string()),
        FollowPersistenceError::SelfFollow => Error::invalid_request(error.to_string()),
        FollowPersistenceError::AlreadyFollowing { .. } => Error::conflict(error.to_string()),
        FollowPersistenceError::NotFollowing { .. } | FollowPersistenceError::UserNotFound { .. } => {
            Error::not_found(error.to_string())
        }
    }
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowRepository>) -> Self {
        Self { follows }
    }

    /// Record that `follower` follows `followed`.
    pub async fn follow(&self, follower: UserId, followed: UserId) -> Result<(), Error> {
        if follower == followed {
            return Err(map_follow_error(FollowPersistenceError::self_follow()));
        }
        self.follows
            .follow(follower, followed)
            .await
            .map_err(map_follow_error)?;
        info!(%follower, %followed, "user followed");
        Ok(())
    }

    pub async fn unfollow(&self, follower: UserId, followed: UserId) -> Result<(), Error> {
        self.follows
            .unfollow(follower, followed)
            .await
            .map_err(map_follow_error)?;
        info!(%follower, %followed, "user unfollowed");
        Ok(())
    }
}
