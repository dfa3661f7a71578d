//! Domain ports: the traits adapters implement and the errors they raise.
//!
//! Each port declares its own error enum through [`define_port_error!`] so the
//! domain services can map failures once, close to where they are observed.

mod macros;

pub(crate) use macros::define_port_error;

mod comment_repository;
mod follow_repository;
mod mailer;
mod post_repository;
mod role_repository;
mod token_authenticator;
mod user_cache;
mod user_repository;

#[cfg(test)]
pub use comment_repository::MockCommentRepository;
pub use comment_repository::{CommentPersistenceError, CommentRepository};
#[cfg(test)]
pub use follow_repository::MockFollowRepository;
pub use follow_repository::{FollowPersistenceError, FollowRepository};
#[cfg(test)]
pub use mailer::MockMailer;
pub use mailer::{InvitationMail, Mailer, MailerError};
#[cfg(test)]
pub use post_repository::MockPostRepository;
pub use post_repository::{PostPersistenceError, PostRepository};
#[cfg(test)]
pub use role_repository::MockRoleRepository;
pub use role_repository::{RolePersistenceError, RoleRepository};
#[cfg(test)]
pub use token_authenticator::MockTokenAuthenticator;
pub use token_authenticator::{TokenAuthenticator, TokenError};
#[cfg(test)]
pub use user_cache::MockUserCache;
pub use user_cache::{UserCache, UserCacheError, user_cache_key};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
