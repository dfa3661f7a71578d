//! Domain entities, services and ports.
//!
//! Nothing in this module knows about HTTP, SQL or Redis. Adapters live under
//! `inbound` and `outbound` and talk to the domain through [`ports`].

pub mod account_service;
pub mod auth;
pub mod comment;
pub mod error;
pub mod feed;
pub mod follow_service;
pub mod invitation;
pub mod invitation_mail;
pub mod password;
pub mod ports;
pub mod post;
pub mod post_access;
pub mod post_service;
pub mod role;
pub mod trace_id;
pub mod user;
pub mod user_lookup;

pub use self::account_service::{AccountService, AccountSettings, RegisteredUser};
pub use self::auth::{
    ACCESS_TOKEN_TTL, AccessClaims, CredentialsValidationError, LoginCredentials, Registration,
};
pub use self::comment::{Comment, CommentAuthor, CommentDraft, CommentValidationError};
pub use self::error::{Error, ErrorCode};
pub use self::feed::{FeedItem, FeedParams, FeedQuery, FeedQueryError, SortOrder};
pub use self::follow_service::FollowService;
pub use self::invitation::{INVITATION_TTL, Invitation, InvitationToken, TokenDigest};
pub use self::invitation_mail::{
    InvitationMailJob, MailDispatcher, MailJobAborted, MailJobHandle, MailOutcome,
    MailRetryPolicy, MailSleeper, TokioSleeper,
};
pub use self::password::{PasswordError, PasswordHash};
pub use self::post::{
    INITIAL_VERSION, Post, PostDraft, PostId, PostPatch, PostValidationError, PostWithComments,
};
pub use self::post_access::{PostAccessPolicy, PostAction};
pub use self::post_service::PostService;
pub use self::role::{DEFAULT_ROLE, Role};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{NewUser, User, UserCredentials, UserId};
pub use self::user_lookup::UserLookup;
