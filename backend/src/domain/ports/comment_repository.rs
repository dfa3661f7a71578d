//! Port for comment storage.
use async_trait::async_trait;

use crate::domain::{Comment, CommentDraft, PostId};

use super::define_port_error;

define_port_error! {
    pub enum CommentPersistenceError {
        Connection { message: String } => "comment repository connection failed: {message}",
        Query { message: String } => "comment repository query failed: {message}",
        /// The referenced post does not exist.
        PostNotFound { id: PostId } => "post {id} not found",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, draft: &CommentDraft) -> Result<Comment, CommentPersistenceError>;

    /// Comments on `post`, newest first.
    async fn list_for_post(&self, post: PostId) -> Result<Vec<Comment>, CommentPersistenceError>;
}
