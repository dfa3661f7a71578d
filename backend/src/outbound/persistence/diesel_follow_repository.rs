//! PostgreSQL-backed `FollowRepository`.
//!
//! The follower table's primary key rejects duplicate edges and its check
//! constraint rejects self-follows; both are reported as domain errors.
//! Accounts that have not been activated cannot be followed.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::ports::{FollowPersistenceError, FollowRepository};

use super::diesel_helpers::{DbFailure, bounded};
use super::models::NewFollowerRow;
use super::pool::DbPool;
use super::schema::{followers, users};

#[derive(Clone)]
pub struct DieselFollowRepository {
    pool: DbPool,
}

impl DieselFollowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<DbFailure> for FollowPersistenceError {
    fn from(failure: DbFailure) -> Self {
        match failure {
            DbFailure::Connection(message) => Self::connection(message),
            DbFailure::Query(message) => Self::query(message),
            DbFailure::CheckViolation { .. } => Self::self_follow(),
            DbFailure::UniqueViolation { .. } | DbFailure::ForeignKeyViolation { .. } => {
                Self::query("constraint violated")
            }
        }
    }
}

fn map_follow_failure(failure: DbFailure, followed: UserId) -> FollowPersistenceError {
    match failure {
        DbFailure::UniqueViolation { .. } => FollowPersistenceError::already_following(followed),
        DbFailure::ForeignKeyViolation { .. } => FollowPersistenceError::user_not_found(followed),
        other => other.into(),
    }
}

#[async_trait]
impl FollowRepository for DieselFollowRepository {
    async fn follow(
        &self,
        follower: UserId,
        followed: UserId,
    ) -> Result<(), FollowPersistenceError> {
        bounded("follow user", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let target_active: bool = diesel::select(diesel::dsl::exists(
                users::table
                    .filter(users::id.eq(followed.get()))
                    .filter(users::is_active.eq(true)),
            ))
            .get_result(&mut conn)
            .await
            .map_err(DbFailure::from)?;
            if !target_active {
                return Err(FollowPersistenceError::user_not_found(followed));
            }
            diesel::insert_into(followers::table)
                .values(&NewFollowerRow {
                    user_id: followed.get(),
                    follower_id: follower.get(),
                })
                .execute(&mut conn)
                .await
                .map_err(|err| map_follow_failure(err.into(), followed))?;
            Ok(())
        })
        .await
    }

    async fn unfollow(
        &self,
        follower: UserId,
        followed: UserId,
    ) -> Result<(), FollowPersistenceError> {
        bounded("unfollow user", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let removed = diesel::delete(
                followers::table
                    .filter(followers::user_id.eq(followed.get()))
                    .filter(followers::follower_id.eq(follower.get())),
            )
            .execute(&mut conn)
            .await
            .map_err(DbFailure::from)?;
            if removed == 0 {
                return Err(FollowPersistenceError::not_following(followed));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        DbFailure::UniqueViolation { constraint: Some("followers_pkey".to_owned()) },
        FollowPersistenceError::AlreadyFollowing { followed: UserId::new(2) }
    )]
    #[case(
        DbFailure::ForeignKeyViolation { constraint: None },
        FollowPersistenceError::UserNotFound { id: UserId::new(2) }
    )]
    #[case(
        DbFailure::CheckViolation { constraint: Some("followers_no_self_follow".to_owned()) },
        FollowPersistenceError::SelfFollow
    )]
    fn insert_failures_map_to_follow_errors(
        #[case] failure: DbFailure,
        #[case] expected: FollowPersistenceError,
    ) {
        assert_eq!(map_follow_failure(failure, UserId::new(2)), expected);
    }
}
