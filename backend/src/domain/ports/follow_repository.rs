//! Port for follower edges between users.
use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    pub enum FollowPersistenceError {
        Connection { message: String } => "follow repository connection failed: {message}",
        Query { message: String } => "follow repository query failed: {message}",
        /// A user tried to follow themselves.
        SelfFollow => "users cannot follow themselves",
        /// The edge already exists.
        AlreadyFollowing { followed: UserId } => "already following user {followed}",
        /// The edge does not exist.
        NotFollowing { followed: UserId } => "not following user {followed}",
        /// The followed user does not exist.
        UserNotFound { id: UserId } => "user {id} not found",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn follow(&self, follower: UserId, followed: UserId)
    -> Result<(), FollowPersistenceError>;

    async fn unfollow(
        &self,
        follower: UserId,
        followed: UserId,
    ) -> Result<(), FollowPersistenceError>;
}
