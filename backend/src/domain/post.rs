//! Posts and the versioned update protocol.
//!
//! Every stored post carries a `version` that starts at [`INITIAL_VERSION`]
//! and is bumped by exactly one on each successful update. Writers submit the
//! version they read; a store refuses the write if it no longer matches.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;
use super::comment::Comment;

/// Version assigned to freshly created posts.
pub const INITIAL_VERSION: i32 = 0;

const TITLE_MAX: usize = 255;
const CONTENT_MAX: usize = 255;
const TAG_MAX: usize = 100;

/// Database identifier of a post.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct PostId(i64);

impl PostId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post together with its comments, newest comment first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Validation failures for post input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostValidationError {
    #[error("title must be between 1 and {max} characters")]
    Title { max: usize },
    #[error("content must be between 1 and {max} characters")]
    Content { max: usize },
    #[error("each tag must be at most {max} characters")]
    Tag { max: usize },
}

fn check_title(title: &str) -> Result<(), PostValidationError> {
    let len = title.trim().chars().count();
    if len == 0 || len > TITLE_MAX {
        return Err(PostValidationError::Title { max: TITLE_MAX });
    }
    Ok(())
}

fn check_content(content: &str) -> Result<(), PostValidationError> {
    let len = content.trim().chars().count();
    if len == 0 || len > CONTENT_MAX {
        return Err(PostValidationError::Content { max: CONTENT_MAX });
    }
    Ok(())
}

fn check_tags(tags: &[String]) -> Result<(), PostValidationError> {
    if tags.iter().any(|tag| tag.chars().count() > TAG_MAX) {
        return Err(PostValidationError::Tag { max: TAG_MAX });
    }
    Ok(())
}

/// Validated input for a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl PostDraft {
    /// Validate the fields of a new post.
    pub fn new(
        author_id: UserId,
        title: String,
        content: String,
        tags: Vec<String>,
    ) -> Result<Self, PostValidationError> {
        check_title(&title)?;
        check_content(&content)?;
        check_tags(&tags)?;
        Ok(Self {
            author_id,
            title,
            content,
            tags,
        })
    }
}

/// Partial update submitted by a client.
///
/// `expected_version` lets a client pin the version it last read; when absent
/// the version of the freshly loaded post is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub expected_version: Option<i32>,
}

impl PostPatch {
    /// Validate the fields that are present.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(content) = &self.content {
            check_content(content)?;
        }
        if let Some(tags) = &self.tags {
            check_tags(tags)?;
        }
        Ok(())
    }

    /// Produce the candidate post to submit to the store.
    ///
    /// The returned post carries the version the write is conditional on.
    #[must_use]
    pub fn apply_to(self, current: &Post) -> Post {
        let mut next = current.clone();
        if let Some(title) = self.title {
            next.title = title;
        }
        if let Some(content) = self.content {
            next.content = content;
        }
        if let Some(tags) = self.tags {
            next.tags = tags;
        }
        if let Some(version) = self.expected_version {
            next.version = version;
        }
        next
    }
}
