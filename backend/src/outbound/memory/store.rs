//! Process-local implementation of every repository port.
//!
//! Mirrors the PostgreSQL schema's constraints (unique emails and usernames,
//! cascading deletes, the follower check) so services behave the same against
//! either backend. State is lost on restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{
    CommentPersistenceError, CommentRepository, FollowPersistenceError, FollowRepository,
    PostPersistenceError, PostRepository, RolePersistenceError, RoleRepository,
    UserPersistenceError, UserRepository,
};
use crate::domain::{
    Comment, CommentAuthor, CommentDraft, DEFAULT_ROLE, FeedItem, FeedQuery, INITIAL_VERSION,
    Invitation, NewUser, PasswordHash, Post, PostDraft, PostId, Role, SortOrder, TokenDigest,
    User, UserCredentials, UserId,
};

struct UserRecord {
    user: User,
    password: PasswordHash,
}

struct InvitationRecord {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

struct Tables {
    roles: Vec<Role>,
    users: BTreeMap<i64, UserRecord>,
    invitations: HashMap<String, InvitationRecord>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    /// `(followed, follower)` pairs.
    followers: BTreeSet<(i64, i64)>,
    next_user_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
}

impl Tables {
    fn seeded() -> Self {
        Self {
            roles: vec![
                Role::new("user", 1),
                Role::new("moderator", 2),
                Role::new("admin", 3),
            ],
            users: BTreeMap::new(),
            invitations: HashMap::new(),
            posts: BTreeMap::new(),
            comments: BTreeMap::new(),
            followers: BTreeSet::new(),
            next_user_id: 1,
            next_post_id: 1,
            next_comment_id: 1,
        }
    }

    fn active_user(&self, id: i64) -> Option<&UserRecord> {
        self.users.get(&id).filter(|record| record.user.is_active)
    }

    fn visible_to(&self, viewer: i64, author: i64) -> bool {
        author == viewer || self.followers.contains(&(author, viewer))
    }
}

/// In-memory store backing every repository port.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store with the standard roles seeded.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Store stamping rows with times read from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(Tables::seeded()),
            clock,
        }
    }

    /// Replace the role table. Mainly useful for exercising missing roles.
    pub fn set_roles(&self, roles: Vec<Role>) {
        self.tables().roles = roles;
    }

    /// Give an existing user the named role. Returns `false` if either is unknown.
    pub fn set_user_role(&self, id: UserId, role: &str) -> bool {
        let mut tables = self.tables();
        let Some(role) = tables.roles.iter().find(|r| r.name == role).cloned() else {
            return false;
        };
        match tables.users.get_mut(&id.get()) {
            Some(record) => {
                record.user.role = role;
                true
            }
            None => false,
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_with_invitation(
        &self,
        user: &NewUser,
        invitation: &Invitation,
    ) -> Result<User, UserPersistenceError> {
        let now = self.clock.utc();
        let mut tables = self.tables();
        let role = tables
            .roles
            .iter()
            .find(|role| role.name == DEFAULT_ROLE)
            .cloned()
            .ok_or_else(|| UserPersistenceError::missing_role(DEFAULT_ROLE))?;
        if tables.users.values().any(|r| r.user.email == user.email) {
            return Err(UserPersistenceError::duplicate_email());
        }
        if tables.users.values().any(|r| r.user.username == user.username) {
            return Err(UserPersistenceError::duplicate_username());
        }

        let id = tables.next_user_id;
        tables.next_user_id += 1;
        let created = User {
            id: UserId::new(id),
            username: user.username.clone(),
            email: user.email.clone(),
            is_active: false,
            role,
            created_at: now,
        };
        tables.users.insert(
            id,
            UserRecord {
                user: created.clone(),
                password: user.password.clone(),
            },
        );
        tables.invitations.insert(
            invitation.digest.as_str().to_owned(),
            InvitationRecord {
                user_id: id,
                expires_at: invitation.expires_at,
            },
        );
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self
            .tables()
            .active_user(id.get())
            .map(|record| record.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, UserPersistenceError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|record| record.user.is_active && record.user.email == email)
            .map(|record| UserCredentials {
                user: record.user.clone(),
                password: record.password.clone(),
            }))
    }

    async fn activate(
        &self,
        digest: &TokenDigest,
        now: DateTime<Utc>,
    ) -> Result<(), UserPersistenceError> {
        let mut tables = self.tables();
        let user_id = tables
            .invitations
            .get(digest.as_str())
            .filter(|invitation| invitation.expires_at > now)
            .map(|invitation| invitation.user_id)
            .ok_or_else(UserPersistenceError::invitation_not_found)?;
        if let Some(record) = tables.users.get_mut(&user_id) {
            record.user.is_active = true;
        }
        tables
            .invitations
            .retain(|_, invitation| invitation.user_id != user_id);
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<(), UserPersistenceError> {
        let raw = id.get();
        let mut tables = self.tables();
        if tables.users.remove(&raw).is_none() {
            return Err(UserPersistenceError::user_not_found(id));
        }
        tables.invitations.retain(|_, invitation| invitation.user_id != raw);
        tables.posts.retain(|_, post| post.author_id != id);
        let Tables {
            posts, comments, ..
        } = &mut *tables;
        comments.retain(|_, comment| {
            comment.author.id != id && posts.contains_key(&comment.post_id.get())
        });
        tables
            .followers
            .retain(|&(followed, follower)| followed != raw && follower != raw);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, draft: &PostDraft) -> Result<Post, PostPersistenceError> {
        let now = self.clock.utc();
        let mut tables = self.tables();
        if !tables.users.contains_key(&draft.author_id.get()) {
            return Err(PostPersistenceError::query("author does not exist"));
        }
        let id = tables.next_post_id;
        tables.next_post_id += 1;
        let post = Post {
            id: PostId::new(id),
            author_id: draft.author_id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
            version: INITIAL_VERSION,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostPersistenceError> {
        Ok(self.tables().posts.get(&id.get()).cloned())
    }

    async fn update(&self, post: &Post) -> Result<Post, PostPersistenceError> {
        let now = self.clock.utc();
        let mut tables = self.tables();
        let stored = tables
            .posts
            .get_mut(&post.id.get())
            .ok_or_else(|| PostPersistenceError::not_found(post.id))?;
        if stored.version != post.version {
            return Err(PostPersistenceError::version_conflict(
                post.id,
                post.version,
                stored.version,
            ));
        }
        stored.title.clone_from(&post.title);
        stored.content.clone_from(&post.content);
        stored.tags.clone_from(&post.tags);
        stored.version += 1;
        stored.updated_at = now;
        Ok(stored.clone())
    }

    async fn delete(&self, id: PostId) -> Result<(), PostPersistenceError> {
        let mut tables = self.tables();
        if tables.posts.remove(&id.get()).is_none() {
            return Err(PostPersistenceError::not_found(id));
        }
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(())
    }

    async fn feed(
        &self,
        viewer: UserId,
        query: &FeedQuery,
    ) -> Result<Vec<FeedItem>, PostPersistenceError> {
        let tables = self.tables();
        let needle = query.search.as_deref().map(str::to_lowercase);
        let mut visible: Vec<&Post> = tables
            .posts
            .values()
            .filter(|post| tables.visible_to(viewer.get(), post.author_id.get()))
            .filter(|post| {
                needle.as_deref().is_none_or(|needle| {
                    post.title.to_lowercase().contains(needle)
                        || post.content.to_lowercase().contains(needle)
                })
            })
            .filter(|post| query.since.is_none_or(|since| post.created_at >= since))
            .filter(|post| query.until.is_none_or(|until| post.created_at <= until))
            .collect();

        visible.sort_by_key(|post| (post.created_at, post.id.get()));
        if query.sort == SortOrder::Desc {
            visible.reverse();
        }

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(visible
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| {
                let author_username = tables
                    .users
                    .get(&post.author_id.get())
                    .map(|record| record.user.username.clone())
                    .unwrap_or_default();
                let comment_count = tables
                    .comments
                    .values()
                    .filter(|comment| comment.post_id == post.id)
                    .count();
                FeedItem {
                    post: post.clone(),
                    author_username,
                    comment_count: i64::try_from(comment_count).unwrap_or(i64::MAX),
                }
            })
            .collect())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, draft: &CommentDraft) -> Result<Comment, CommentPersistenceError> {
        let now = self.clock.utc();
        let mut tables = self.tables();
        if !tables.posts.contains_key(&draft.post_id.get()) {
            return Err(CommentPersistenceError::post_not_found(draft.post_id));
        }
        let username = tables
            .users
            .get(&draft.author_id.get())
            .map(|record| record.user.username.clone())
            .ok_or_else(|| CommentPersistenceError::query("author does not exist"))?;
        let id = tables.next_comment_id;
        tables.next_comment_id += 1;
        let comment = Comment {
            id,
            post_id: draft.post_id,
            author: CommentAuthor {
                id: draft.author_id,
                username,
            },
            content: draft.content.clone(),
            created_at: now,
        };
        tables.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post: PostId) -> Result<Vec<Comment>, CommentPersistenceError> {
        let tables = self.tables();
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| std::cmp::Reverse((comment.created_at, comment.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn follow(
        &self,
        follower: UserId,
        followed: UserId,
    ) -> Result<(), FollowPersistenceError> {
        if follower == followed {
            return Err(FollowPersistenceError::self_follow());
        }
        let mut tables = self.tables();
        if tables.active_user(followed.get()).is_none() {
            return Err(FollowPersistenceError::user_not_found(followed));
        }
        if !tables.followers.insert((followed.get(), follower.get())) {
            return Err(FollowPersistenceError::already_following(followed));
        }
        Ok(())
    }

    async fn unfollow(
        &self,
        follower: UserId,
        followed: UserId,
    ) -> Result<(), FollowPersistenceError> {
        if self
            .tables()
            .followers
            .remove(&(followed.get(), follower.get()))
        {
            Ok(())
        } else {
            Err(FollowPersistenceError::not_following(followed))
        }
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RolePersistenceError> {
        Ok(self
            .tables()
            .roles
            .iter()
            .find(|role| role.name == name)
            .cloned())
    }
}
