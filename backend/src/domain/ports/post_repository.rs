//! Port for post storage with version-checked updates.
use async_trait::async_trait;

use crate::domain::{FeedItem, FeedQuery, Post, PostDraft, PostId, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by post repository adapters.
    pub enum PostPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "post repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "post repository query failed: {message}",
        /// No post has this identifier.
        NotFound { id: PostId } => "post {id} not found",
        /// The post exists but its stored version differs from the one submitted.
        VersionConflict { id: PostId, expected: i32, actual: i32 } =>
            "post {id} was modified concurrently: expected version {expected}, found {actual}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post at the initial version.
    async fn create(&self, draft: &PostDraft) -> Result<Post, PostPersistenceError>;

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostPersistenceError>;

    /// Persist `post` only if the stored version equals `post.version`.
    ///
    /// On success the returned post carries `post.version + 1`.
    async fn update(&self, post: &Post) -> Result<Post, PostPersistenceError>;

    async fn delete(&self, id: PostId) -> Result<(), PostPersistenceError>;

    /// Posts by `viewer` or by users `viewer` follows.
    async fn feed(
        &self,
        viewer: UserId,
        query: &FeedQuery,
    ) -> Result<Vec<FeedItem>, PostPersistenceError>;
}
