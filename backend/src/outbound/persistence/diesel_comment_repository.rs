//! PostgreSQL-backed `CommentRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CommentPersistenceError, CommentRepository};
use crate::domain::{Comment, CommentDraft, PostId};

use super::diesel_helpers::{DbFailure, bounded};
use super::models::{CommentRow, NewCommentRow};
use super::pool::DbPool;
use super::schema::{comments, users};

#[derive(Clone)]
pub struct DieselCommentRepository {
    pool: DbPool,
}

impl DieselCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<DbFailure> for CommentPersistenceError {
    fn from(failure: DbFailure) -> Self {
        match failure {
            DbFailure::Connection(message) => Self::connection(message),
            DbFailure::Query(message) => Self::query(message),
            DbFailure::UniqueViolation { .. }
            | DbFailure::ForeignKeyViolation { .. }
            | DbFailure::CheckViolation { .. } => Self::query("constraint violated"),
        }
    }
}

/// A foreign key failure on insert means the post vanished.
fn map_insert_failure(failure: DbFailure, post: PostId) -> CommentPersistenceError {
    match failure {
        DbFailure::ForeignKeyViolation { .. } => CommentPersistenceError::post_not_found(post),
        other => other.into(),
    }
}

#[async_trait]
impl CommentRepository for DieselCommentRepository {
    async fn create(&self, draft: &CommentDraft) -> Result<Comment, CommentPersistenceError> {
        bounded("create comment", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let row: CommentRow = diesel::insert_into(comments::table)
                .values(&NewCommentRow {
                    post_id: draft.post_id.get(),
                    user_id: draft.author_id.get(),
                    content: &draft.content,
                })
                .returning(CommentRow::as_returning())
                .get_result(&mut conn)
                .await
                .map_err(|err| map_insert_failure(err.into(), draft.post_id))?;
            let username: String = users::table
                .find(row.user_id)
                .select(users::username)
                .first(&mut conn)
                .await
                .map_err(DbFailure::from)?;
            Ok(row.into_comment(username))
        })
        .await
    }

    async fn list_for_post(&self, post: PostId) -> Result<Vec<Comment>, CommentPersistenceError> {
        bounded("list comments", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let rows: Vec<(CommentRow, String)> = comments::table
                .inner_join(users::table)
                .filter(comments::post_id.eq(post.get()))
                .order((comments::created_at.desc(), comments::id.desc()))
                .select((CommentRow::as_select(), users::username))
                .load(&mut conn)
                .await
                .map_err(DbFailure::from)?;
            Ok(rows
                .into_iter()
                .map(|(row, username)| row.into_comment(username))
                .collect())
        })
        .await
    }
}
