//! Comments attached to posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{PostId, UserId};

const CONTENT_MAX: usize = 255;

/// Public view of a comment author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentAuthor {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub post_id: PostId,
    pub author: CommentAuthor,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("comment must be between 1 and {max} characters")]
pub struct CommentValidationError {
    pub max: usize,
}

/// Validated input for a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
}

impl CommentDraft {
    pub fn new(
        post_id: PostId,
        author_id: UserId,
        content: String,
    ) -> Result<Self, CommentValidationError> {
        let len = content.trim().chars().count();
        if len == 0 || len > CONTENT_MAX {
            return Err(CommentValidationError { max: CONTENT_MAX });
        }
        Ok(Self {
            post_id,
            author_id,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_and_oversized_content() {
        let post = PostId::new(1);
        let author = UserId::new(1);
        assert!(CommentDraft::new(post, author, " ".to_owned()).is_err());
        assert!(CommentDraft::new(post, author, "x".repeat(256)).is_err());
        assert!(CommentDraft::new(post, author, "nice".to_owned()).is_ok());
    }
}
