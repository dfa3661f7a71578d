//! PostgreSQL-backed `PostRepository` with version-checked updates.
//!
//! An update only touches the row whose `version` still equals the one the
//! caller read. When no row matches, the current row is re-read to tell a
//! missing post apart from a concurrent edit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{PostPersistenceError, PostRepository};
use crate::domain::{FeedItem, FeedQuery, Post, PostDraft, PostId, SortOrder, UserId};

use super::diesel_helpers::{DbFailure, bounded, like_pattern};
use super::models::{NewPostRow, PostRow};
use super::pool::DbPool;
use super::schema::{comments, followers, posts, users};

/// Diesel-backed implementation of the `PostRepository` port.
#[derive(Clone)]
pub struct DieselPostRepository {
    pool: DbPool,
}

impl DieselPostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<DbFailure> for PostPersistenceError {
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

/// Explain why a version-checked update matched no row.
async fn handle_post_update_failure<C>(conn: &mut C, post: &Post) -> PostPersistenceError
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let current = posts::table
        .find(post.id.get())
        .select(posts::version)
        .first::<i32>(conn)
        .await
        .optional();

    match current {
        Ok(Some(actual)) => PostPersistenceError::version_conflict(post.id, post.version, actual),
        Ok(None) => PostPersistenceError::not_found(post.id),
        Err(err) => DbFailure::from(err).into(),
    }
}

/// Attach author names and comment totals to a page of posts.
fn assemble_feed(rows: Vec<(PostRow, String)>, counts: &HashMap<i64, i64>) -> Vec<FeedItem> {
    rows.into_iter()
        .map(|(row, author_username)| {
            let comment_count = counts.get(&row.id).copied().unwrap_or(0);
            FeedItem {
                post: row.into(),
                author_username,
                comment_count,
            }
        })
        .collect()
}

#[async_trait]
impl PostRepository for DieselPostRepository {
    async fn create(&self, draft: &PostDraft) -> Result<Post, PostPersistenceError> {
        bounded("create post", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let row: PostRow = diesel::insert_into(posts::table)
                .values(&NewPostRow {
                    user_id: draft.author_id.get(),
                    title: &draft.title,
                    content: &draft.content,
                    tags: &draft.tags,
                })
                .returning(PostRow::as_returning())
                .get_result(&mut conn)
                .await
                .map_err(DbFailure::from)?;
            Ok(row.into())
        })
        .await
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostPersistenceError> {
        bounded("find post", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let row: Option<PostRow> = posts::table
                .find(id.get())
                .select(PostRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(DbFailure::from)?;
            Ok(row.map(Post::from))
        })
        .await
    }

    async fn update(&self, post: &Post) -> Result<Post, PostPersistenceError> {
        bounded("update post", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let updated: Option<PostRow> = diesel::update(
                posts::table
                    .filter(posts::id.eq(post.id.get()))
                    .filter(posts::version.eq(post.version)),
            )
            .set((
                posts::title.eq(&post.title),
                posts::content.eq(&post.content),
                posts::tags.eq(&post.tags),
                posts::version.eq(posts::version + 1),
                posts::updated_at.eq(Utc::now()),
            ))
            .returning(PostRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(DbFailure::from)?;

            match updated {
                Some(row) => Ok(row.into()),
                None => {
                    let error = handle_post_update_failure(&mut conn, post).await;
                    debug!(post_id = %post.id, %error, "version-checked update matched no row");
                    Err(error)
                }
            }
        })
        .await
    }

    async fn delete(&self, id: PostId) -> Result<(), PostPersistenceError> {
        bounded("delete post", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let deleted = diesel::delete(posts::table.find(id.get()))
                .execute(&mut conn)
                .await
                .map_err(DbFailure::from)?;
            if deleted == 0 {
                return Err(PostPersistenceError::not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn feed(
        &self,
        viewer: UserId,
        query: &FeedQuery,
    ) -> Result<Vec<FeedItem>, PostPersistenceError> {
        bounded("load feed", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;

            let followed = followers::table
                .filter(followers::follower_id.eq(viewer.get()))
                .select(followers::user_id);
            let mut statement = posts::table
                .inner_join(users::table)
                .filter(
                    posts::user_id
                        .eq(viewer.get())
                        .or(posts::user_id.eq_any(followed)),
                )
                .select((PostRow::as_select(), users::username))
                .into_boxed();

            if let Some(search) = &query.search {
                let pattern = like_pattern(search);
                statement = statement.filter(
                    posts::title
                        .ilike(pattern.clone())
                        .or(posts::content.ilike(pattern)),
                );
            }
            if let Some(since) = query.since {
                statement = statement.filter(posts::created_at.ge(since));
            }
            if let Some(until) = query.until {
                statement = statement.filter(posts::created_at.le(until));
            }
            statement = match query.sort {
                SortOrder::Asc => statement.order((posts::created_at.asc(), posts::id.asc())),
                SortOrder::Desc => statement.order((posts::created_at.desc(), posts::id.desc())),
            };

            let rows: Vec<(PostRow, String)> = statement
                .limit(i64::from(query.limit))
                .offset(i64::from(query.offset))
                .load(&mut conn)
                .await
                .map_err(DbFailure::from)?;

            let ids: Vec<i64> = rows.iter().map(|(row, _)| row.id).collect();
            let counts: HashMap<i64, i64> = if ids.is_empty() {
                HashMap::new()
            } else {
                comments::table
                    .filter(comments::post_id.eq_any(&ids))
                    .group_by(comments::post_id)
                    .select((comments::post_id, diesel::dsl::count(comments::id)))
                    .load::<(i64, i64)>(&mut conn)
                    .await
                    .map_err(DbFailure::from)?
                    .into_iter()
                    .collect()
            };

            Ok(assemble_feed(rows, &counts))
        })
        .await
    }
}
