//! Internal Diesel row structs for database operations.
//!
//! These types never leave the persistence layer; repositories convert them
//! into domain entities.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{Comment, CommentAuthor, Post, PostId, Role, User, UserId};

use super::schema::{comments, followers, posts, roles, user_invitations, users};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RoleRow {
    pub id: i64,
    pub name: String,
    pub level: i32,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self::new(row.name, row.level)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn into_user(self, role: RoleRow) -> User {
        User {
            id: UserId::new(self.id),
            username: self.username,
            email: self.email,
            is_active: self.is_active,
            role: role.into(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub role_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_invitations)]
pub(crate) struct NewInvitationRow<'a> {
    pub token: &'a str,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::new(row.id),
            author_id: UserId::new(row.user_id),
            title: row.title,
            content: row.content,
            tags: row.tags,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub content: &'a str,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CommentRow {
    pub(crate) fn into_comment(self, username: String) -> Comment {
        Comment {
            id: self.id,
            post_id: PostId::new(self.post_id),
            author: CommentAuthor {
                id: UserId::new(self.user_id),
                username,
            },
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub(crate) struct NewCommentRow<'a> {
    pub post_id: i64,
    pub user_id: i64,
    pub content: &'a str,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = followers)]
pub(crate) struct NewFollowerRow {
    pub user_id: i64,
    pub follower_id: i64,
}
