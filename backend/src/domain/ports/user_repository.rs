//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Invitation, NewUser, TokenDigest, User, UserCredentials, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another account already uses this email.
        DuplicateEmail => "a user with that email already exists",
        /// Another account already uses this username.
        DuplicateUsername => "a user with that username already exists",
        /// The invitation is unknown, expired or already consumed.
        InvitationNotFound => "invitation not found",
        /// No user row matched.
        UserNotFound { id: UserId } => "user {id} not found",
        /// The default role is missing from the reference table.
        MissingRole { name: String } => "role {name} is not defined",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert an inactive user and its invitation atomically.
    async fn create_with_invitation(
        &self,
        user: &NewUser,
        invitation: &Invitation,
    ) -> Result<User, UserPersistenceError>;

    /// Fetch an active user by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch an active user and their password hash by email.
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, UserPersistenceError>;

    /// Consume an unexpired invitation and activate its user.
    ///
    /// Fails with [`UserPersistenceError::InvitationNotFound`] when the digest
    /// is unknown, expired at `now`, or already used.
    async fn activate(
        &self,
        digest: &TokenDigest,
        now: DateTime<Utc>,
    ) -> Result<(), UserPersistenceError>;

    /// Delete a user and any pending invitations.
    async fn delete(&self, id: UserId) -> Result<(), UserPersistenceError>;
}
