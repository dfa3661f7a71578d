//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Registration writes the user row and its invitation in one transaction;
//! activation consumes the invitation and flips `is_active` in another.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{
    DEFAULT_ROLE, Invitation, NewUser, PasswordHash, TokenDigest, User, UserCredentials, UserId,
};

use super::diesel_helpers::{DbFailure, bounded};
use super::models::{NewInvitationRow, NewUserRow, RoleRow, UserRow};
use super::pool::DbPool;
use super::schema::{roles, user_invitations, users};

const EMAIL_CONSTRAINT: &str = "users_email_key";
const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<DbFailure> for UserPersistenceError {
    fn from(failure: DbFailure) -> Self {
        if failure.is_unique(EMAIL_CONSTRAINT) {
            return Self::duplicate_email();
        }
        if failure.is_unique(USERNAME_CONSTRAINT) {
            return Self::duplicate_username();
        }
        match failure {
            DbFailure::Connection(message) => Self::connection(message),
            DbFailure::Query(message) => Self::query(message),
            DbFailure::UniqueViolation { .. }
            | DbFailure::ForeignKeyViolation { .. }
            | DbFailure::CheckViolation { .. } => Self::query("constraint violated"),
        }
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create_with_invitation(
        &self,
        user: &NewUser,
        invitation: &Invitation,
    ) -> Result<User, UserPersistenceError> {
        bounded("create user", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;

            let role: RoleRow = roles::table
                .filter(roles::name.eq(DEFAULT_ROLE))
                .select(RoleRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(DbFailure::from)?
                .ok_or_else(|| UserPersistenceError::missing_role(DEFAULT_ROLE))?;

            let new_user = NewUserRow {
                email: &user.email,
                username: &user.username,
                password: user.password.as_str(),
                role_id: role.id,
            };
            let digest = invitation.digest.as_str();
            let expiry = invitation.expires_at;

            let row = conn
                .transaction::<_, DbFailure, _>(|conn| {
                    async move {
                        let row: UserRow = diesel::insert_into(users::table)
                            .values(&new_user)
                            .returning(UserRow::as_returning())
                            .get_result(conn)
                            .await?;
                        diesel::insert_into(user_invitations::table)
                            .values(&NewInvitationRow {
                                token: digest,
                                user_id: row.id,
                                expiry,
                            })
                            .execute(conn)
                            .await?;
                        Ok(row)
                    }
                    .scope_boxed()
                })
                .await?;

            debug!(user_id = row.id, "user created with pending invitation");
            Ok(row.into_user(role))
        })
        .await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        bounded("find user", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let found: Option<(UserRow, RoleRow)> = users::table
                .inner_join(roles::table)
                .filter(users::id.eq(id.get()))
                .filter(users::is_active.eq(true))
                .select((UserRow::as_select(), RoleRow::as_select()))
                .first(&mut conn)
                .await
                .optional()
                .map_err(DbFailure::from)?;
            Ok(found.map(|(user, role)| user.into_user(role)))
        })
        .await
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, UserPersistenceError> {
        bounded("find credentials", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let found: Option<(UserRow, RoleRow)> = users::table
                .inner_join(roles::table)
                .filter(users::email.eq(email))
                .filter(users::is_active.eq(true))
                .select((UserRow::as_select(), RoleRow::as_select()))
                .first(&mut conn)
                .await
                .optional()
                .map_err(DbFailure::from)?;
            Ok(found.map(|(user, role)| {
                let password = PasswordHash::from_stored(user.password.clone());
                UserCredentials {
                    user: user.into_user(role),
                    password,
                }
            }))
        })
        .await
    }

    async fn activate(
        &self,
        digest: &TokenDigest,
        now: DateTime<Utc>,
    ) -> Result<(), UserPersistenceError> {
        bounded("activate user", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let activated = conn
                .transaction::<_, DbFailure, _>(|conn| {
                    async move {
                        let user_id: Option<i64> = user_invitations::table
                            .filter(user_invitations::token.eq(digest.as_str()))
                            .filter(user_invitations::expiry.gt(now))
                            .select(user_invitations::user_id)
                            .first(conn)
                            .await
                            .optional()?;
                        let Some(user_id) = user_id else {
                            return Ok(None);
                        };
                        diesel::update(users::table.find(user_id))
                            .set(users::is_active.eq(true))
                            .execute(conn)
                            .await?;
                        diesel::delete(
                            user_invitations::table.filter(user_invitations::user_id.eq(user_id)),
                        )
                        .execute(conn)
                        .await?;
                        Ok(Some(user_id))
                    }
                    .scope_boxed()
                })
                .await?;

            match activated {
                Some(user_id) => {
                    debug!(user_id, "user activated");
                    Ok(())
                }
                None => Err(UserPersistenceError::invitation_not_found()),
            }
        })
        .await
    }

    async fn delete(&self, id: UserId) -> Result<(), UserPersistenceError> {
        bounded("delete user", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let deleted = diesel::delete(users::table.find(id.get()))
                .execute(&mut conn)
                .await
                .map_err(DbFailure::from)?;
            if deleted == 0 {
                return Err(UserPersistenceError::user_not_found(id));
            }
            Ok(())
        })
        .await
    }
}
