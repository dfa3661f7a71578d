//! Ownership and role checks guarding post mutations.

use std::sync::Arc;

use tracing::warn;

use super::ports::{RolePersistenceError, RoleRepository};
use super::{Error, Post, User};

/// Mutations that require ownership or an elevated role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Update,
    Delete,
}

impl PostAction {
    /// Role whose level a non-author must reach.
    #[must_use]
    pub const fn required_role(self) -> &'static str {
        match self {
            Self::Update => "moderator",
            Self::Delete => "admin",
        }
    }
}

/// Decide whether a user may mutate a post.
#[derive(Clone)]
pub struct PostAccessPolicy {
    roles: Arc<dyn RoleRepository>,
}

impl PostAccessPolicy {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// Grant access to the author, or to a user whose role level reaches the
    /// level of the action's required role.
    ///
    /// A required role missing from the role table is an internal error.
    pub async fn authorize(&self, user: &User, post: &Post, action: PostAction) -> Result<(), Error> {
        if post.author_id == user.id {
            return Ok(());
        }

        let name = action.required_role();
        let required = self
            .roles
            .find_by_name(name)
            .await
            .map_err(|err| match err {
                RolePersistenceError::Connection { message } => {
                    Error::service_unavailable(format!("role store unavailable: {message}"))
                }
                RolePersistenceError::Query { .. } => Error::internal(err.to_string()),
            })?
            .ok_or_else(|| Error::internal(format!("role {name} is not defined")))?;

        if user.role.satisfies(&required) {
            Ok(())
        } else {
            warn!(
                user_id = %user.id,
                post_id = %post.id,
                ?action,
                "post access denied"
            );
            Err(Error::forbidden("insufficient permissions"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockRoleRepository;
    use crate::domain::{ErrorCode, PostId, Role, UserId};
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    fn user(id: i64, role: Role) -> User {
        User {
            id: UserId::new(id),
            username: format!("u{id}"),
            email: format!("u{id}@example.com"),
            is_active: true,
            role,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn post_by(author: i64) -> Post {
        Post {
            id: PostId::new(10),
            author_id: UserId::new(author),
            title: "t".to_owned(),
            content: "c".to_owned(),
            tags: vec![],
            version: 0,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn seeded_roles() -> MockRoleRepository {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_by_name().returning(|name| {
            Ok(match name {
                "user" => Some(Role::new("user", 1)),
                "moderator" => Some(Role::new("moderator", 2)),
                "admin" => Some(Role::new("admin", 3)),
                _ => None,
            })
        });
        roles
    }

    #[tokio::test]
    async fn author_is_allowed_without_role_lookup() {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_by_name().never();
        let policy = PostAccessPolicy::new(Arc::new(roles));
        let result = policy
            .authorize(&user(1, Role::new("user", 1)), &post_by(1), PostAction::Delete)
            .await;
        assert!(result.is_ok());
    }

    #[rstest]
    #[case(Role::new("user", 1), PostAction::Update, false)]
    #[case(Role::new("moderator", 2), PostAction::Update, true)]
    #[case(Role::new("moderator", 2), PostAction::Delete, false)]
    #[case(Role::new("admin", 3), PostAction::Delete, true)]
    #[case(Role::new("admin", 3), PostAction::Update, true)]
    #[tokio::test]
    async fn non_author_needs_required_level(
        #[case] role: Role,
        #[case] action: PostAction,
        #[case] allowed: bool,
    ) {
        let policy = PostAccessPolicy::new(Arc::new(seeded_roles()));
        let result = policy.authorize(&user(2, role), &post_by(1), action).await;
        match result {
            Ok(()) => assert!(allowed),
            Err(err) => {
                assert!(!allowed);
                assert_eq!(err.code(), ErrorCode::Forbidden);
            }
        }
    }

    #[tokio::test]
    async fn missing_role_is_internal() {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_by_name().return_once(|_| Ok(None));
        let policy = PostAccessPolicy::new(Arc::new(roles));
        let err = policy
            .authorize(&user(2, Role::new("user", 1)), &post_by(1), PostAction::Update)
            .await
            .expect_err("role missing");
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
