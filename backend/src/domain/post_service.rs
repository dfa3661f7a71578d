//! Post use-cases: creation, reads, version-checked updates and the feed.

use std::sync::Arc;

use tracing::info;

use super::ports::{
    CommentPersistenceError, CommentRepository, PostPersistenceError, PostRepository,
};
use super::{
    Comment, CommentDraft, Error, FeedItem, FeedQuery, Post, PostDraft, PostId, PostPatch,
    PostWithComments, UserId,
};

fn map_post_error(error: PostPersistenceError) -> Error {
    match error {
        PostPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("post store unavailable: {message}"))
        }
        PostPersistenceError::Query { .. } => Error::internal(error.to_string()),
        PostPersistenceError::NotFound { .. } => Error::not_found("post not found"),
        PostPersistenceError::VersionConflict { .. } => Error::conflict(error.to_string()),
    }
}

fn map_comment_error(error: CommentPersistenceError) -> Error {
    match error {
        CommentPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("comment store unavailable: {message}"))
        }
        CommentPersistenceError::Query { .. } => Error::internal(error.to_string()),
        CommentPersistenceError::PostNotFound { .. } => Error::not_found("post not found"),
    }
}

/// Post operations over the post and comment stores.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { posts, comments }
    }

    pub async fn create(&self, draft: PostDraft) -> Result<Post, Error> {
        let post = self.posts.create(&draft).await.map_err(map_post_error)?;
        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    /// Load a post or fail with `NotFound`.
    pub async fn get(&self, id: PostId) -> Result<Post, Error> {
        self.posts
            .find_by_id(id)
            .await
            .map_err(map_post_error)?
            .ok_or_else(|| Error::not_found("post not found"))
    }

    pub async fn with_comments(&self, post: Post) -> Result<PostWithComments, Error> {
        let comments = self
            .comments
            .list_for_post(post.id)
            .await
            .map_err(map_comment_error)?;
        Ok(PostWithComments { post, comments })
    }

    /// Apply `patch` to `current` with a version-checked write.
    ///
    /// A stale version yields `Conflict`; a post deleted in the meantime
    /// yields `NotFound`.
    pub async fn update(&self, current: &Post, patch: PostPatch) -> Result<Post, Error> {
        let candidate = patch.apply_to(current);
        let updated = self
            .posts
            .update(&candidate)
            .await
            .map_err(map_post_error)?;
        info!(post_id = %updated.id, version = updated.version, "post updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: PostId) -> Result<(), Error> {
        self.posts.delete(id).await.map_err(map_post_error)?;
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    pub async fn feed(&self, viewer: UserId, query: &FeedQuery) -> Result<Vec<FeedItem>, Error> {
        self.posts.feed(viewer, query).await.map_err(map_post_error)
    }

    pub async fn comment(&self, draft: CommentDraft) -> Result<Comment, Error> {
        self.comments.create(&draft).await.map_err(map_comment_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockCommentRepository, MockPostRepository};
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    fn stored(version: i32) -> Post {
        Post {
            id: PostId::new(4),
            author_id: UserId::new(1),
            title: "title".to_owned(),
            content: "content".to_owned(),
            tags: vec![],
            version,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn service(posts: MockPostRepository) -> PostService {
        PostService::new(Arc::new(posts), Arc::new(MockCommentRepository::new()))
    }

    #[tokio::test]
    async fn update_submits_patched_post_at_current_version() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_update()
            .withf(|post| post.title == "renamed" && post.version == 2)
            .times(1)
            .returning(|post| {
                let mut next = post.clone();
                next.version += 1;
                Ok(next)
            });

        let patch = PostPatch {
            title: Some("renamed".to_owned()),
            ..PostPatch::default()
        };
        let updated = service(posts)
            .update(&stored(2), patch)
            .await
            .expect("updated");
        assert_eq!(updated.version, 3);
    }

    #[rstest]
    #[case(PostPersistenceError::version_conflict(PostId::new(4), 0, 1), ErrorCode::Conflict)]
    #[case(PostPersistenceError::not_found(PostId::new(4)), ErrorCode::NotFound)]
    #[case(PostPersistenceError::connection("down"), ErrorCode::ServiceUnavailable)]
    #[case(PostPersistenceError::query("syntax"), ErrorCode::InternalError)]
    #[tokio::test]
    async fn update_failures_map_to_error_codes(
        #[case] failure: PostPersistenceError,
        #[case] expected: ErrorCode,
    ) {
        let mut posts = MockPostRepository::new();
        posts.expect_update().return_once(move |_| Err(failure));
        let err = service(posts)
            .update(&stored(0), PostPatch::default())
            .await
            .expect_err("update fails");
        assert_eq!(err.code(), expected);
    }

    #[tokio::test]
    async fn get_missing_post_is_not_found() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().return_once(|_| Ok(None));
        let err = service(posts).get(PostId::new(9)).await.expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn with_comments_attaches_listing() {
        let mut comments = MockCommentRepository::new();
        comments
            .expect_list_for_post()
            .times(1)
            .return_once(|_| Ok(vec![]));
        let service = PostService::new(Arc::new(MockPostRepository::new()), Arc::new(comments));
        let view = service.with_comments(stored(0)).await.expect("view");
        assert!(view.comments.is_empty());
        assert_eq!(view.post.id, PostId::new(4));
    }
}
