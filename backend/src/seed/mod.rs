//! Demo data for local development: users, posts, comments and follows.
//!
//! [`SeedPlan::generate`] is deterministic for a given seed value.
//! [`seed_database`] writes a plan through the repository ports, so the same
//! code fills PostgreSQL or the in-memory store. Generated accounts are
//! activated and share one password.

pub mod config;

pub use config::SeedSettings;

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::ports::{
    CommentPersistenceError, CommentRepository, FollowPersistenceError, FollowRepository,
    PostPersistenceError, PostRepository, UserPersistenceError, UserRepository,
};
use crate::domain::{
    CommentDraft, Invitation, InvitationToken, NewUser, PasswordError, PasswordHash, PostDraft,
    UserId,
};

const USERNAMES: &[&str] = &[
    "ada", "grace", "alan", "edsger", "barbara", "donald", "margaret", "ken", "dennis", "frances",
    "john", "radia", "niklaus", "leslie", "tony", "hedy", "claude", "katherine", "linus", "sophie",
];

const TITLES: &[&str] = &[
    "Notes from the weekend",
    "What I learned this week",
    "A short rant about deadlines",
    "Reading list",
    "Small wins",
    "Debugging a heisenbug",
    "Why I switched editors",
    "Thoughts on remote work",
    "Lessons from a failed launch",
    "Coffee and compilers",
];

const CONTENTS: &[&str] = &[
    "Spent most of the day tracing a bug that turned out to be a missing index.",
    "Finally tried writing tests first. It felt slow until it suddenly did not.",
    "Three books I keep coming back to, and why each one still holds up.",
    "The build is green, the coffee is warm and the backlog is shorter than yesterday.",
    "Sometimes the best refactor is deleting the code nobody calls.",
    "Wrote down every interruption today. The list was longer than the work.",
    "Pairing for a whole afternoon taught me more than a week of reading.",
    "If it is not in version control, it did not happen.",
];

const TAGS: &[&str] = &[
    "rust", "postgres", "career", "reading", "productivity", "testing", "design", "life",
];

const COMMENTS: &[&str] = &[
    "Great post, thanks for sharing!",
    "I had the same experience last month.",
    "Could you write more about this?",
    "Bookmarked.",
    "Not sure I agree, but interesting take.",
    "This made my day.",
    "What tools did you use?",
];

const TAGS_PER_POST: usize = 2;

/// How much data to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows_per_user: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
}

/// Authors and posts are indices into [`SeedPlan::users`] and
/// [`SeedPlan::posts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPost {
    pub author: usize,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedComment {
    pub post: usize,
    pub author: usize,
    pub content: String,
}

/// `follower` follows `followed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedFollow {
    pub follower: usize,
    pub followed: usize,
}

/// Everything a seeding run will insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlan {
    pub users: Vec<SeedUser>,
    pub posts: Vec<SeedPost>,
    pub comments: Vec<SeedComment>,
    pub follows: Vec<SeedFollow>,
}

fn pick<'a>(rng: &mut SmallRng, words: &[&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

impl SeedPlan {
    /// Generate a plan; the same `counts` and `seed` always give the same plan.
    ///
    /// Posts, comments and follows need authors, so a plan without users is
    /// empty.
    #[must_use]
    pub fn generate(counts: SeedCounts, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let users: Vec<SeedUser> = (0..counts.users)
            .map(|index| {
                let username = format!("{}{index}", USERNAMES[index % USERNAMES.len()]);
                SeedUser {
                    email: format!("{username}@example.com"),
                    username,
                }
            })
            .collect();
        if users.is_empty() {
            return Self {
                users,
                posts: Vec::new(),
                comments: Vec::new(),
                follows: Vec::new(),
            };
        }

        let posts: Vec<SeedPost> = (0..counts.posts)
            .map(|_| SeedPost {
                author: rng.gen_range(0..users.len()),
                title: pick(&mut rng, TITLES).to_owned(),
                content: pick(&mut rng, CONTENTS).to_owned(),
                tags: TAGS
                    .choose_multiple(&mut rng, TAGS_PER_POST)
                    .map(|tag| (*tag).to_owned())
                    .collect(),
            })
            .collect();

        let comments = if posts.is_empty() {
            Vec::new()
        } else {
            (0..counts.comments)
                .map(|_| SeedComment {
                    post: rng.gen_range(0..posts.len()),
                    author: rng.gen_range(0..users.len()),
                    content: pick(&mut rng, COMMENTS).to_owned(),
                })
                .collect()
        };

        let mut follows = Vec::new();
        for follower in 0..users.len() {
            let candidates: Vec<usize> = (0..users.len()).filter(|&id| id != follower).collect();
            follows.extend(
                candidates
                    .choose_multiple(&mut rng, counts.follows_per_user)
                    .map(|&followed| SeedFollow { follower, followed }),
            );
        }

        Self {
            users,
            posts,
            comments,
            follows,
        }
    }
}

/// Errors raised while writing a plan.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Users(#[from] UserPersistenceError),
    #[error(transparent)]
    Posts(#[from] PostPersistenceError),
    #[error(transparent)]
    Comments(#[from] CommentPersistenceError),
    #[error(transparent)]
    Follows(#[from] FollowPersistenceError),
    #[error("generated content was rejected: {0}")]
    Invalid(String),
}

/// Repositories written by [`seed_database`].
pub struct SeedTargets<'a> {
    pub users: &'a dyn UserRepository,
    pub posts: &'a dyn PostRepository,
    pub comments: &'a dyn CommentRepository,
    pub follows: &'a dyn FollowRepository,
}

/// Rows inserted by a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
}

/// Insert `plan`, creating every user as active with `password`.
///
/// Rows are inserted one at a time; a failure stops the run and leaves what
/// was already written.
///
/// # Errors
///
/// Returns the first repository failure, such as a username that already
/// exists from an earlier run.
pub async fn seed_database(
    targets: SeedTargets<'_>,
    plan: &SeedPlan,
    password: &PasswordHash,
    now: DateTime<Utc>,
) -> Result<SeedOutcome, SeedError> {
    let mut user_ids: Vec<UserId> = Vec::with_capacity(plan.users.len());
    for user in &plan.users {
        let token = InvitationToken::generate();
        let created = targets
            .users
            .create_with_invitation(
                &NewUser {
                    username: user.username.clone(),
                    email: user.email.clone(),
                    password: password.clone(),
                },
                &Invitation::issue(&token, now),
            )
            .await?;
        targets.users.activate(&token.digest(), now).await?;
        debug!(user_id = %created.id, username = %user.username, "seeded user");
        user_ids.push(created.id);
    }

    let mut post_ids = Vec::with_capacity(plan.posts.len());
    for post in &plan.posts {
        let draft = PostDraft::new(
            user_ids[post.author],
            post.title.clone(),
            post.content.clone(),
            post.tags.clone(),
        )
        .map_err(|err| SeedError::Invalid(err.to_string()))?;
        post_ids.push(targets.posts.create(&draft).await?.id);
    }

    for comment in &plan.comments {
        let draft = CommentDraft::new(
            post_ids[comment.post],
            user_ids[comment.author],
            comment.content.clone(),
        )
        .map_err(|err| SeedError::Invalid(err.to_string()))?;
        targets.comments.create(&draft).await?;
    }

    for follow in &plan.follows {
        targets
            .follows
            .follow(user_ids[follow.follower], user_ids[follow.followed])
            .await?;
    }

    let outcome = SeedOutcome {
        users: user_ids.len(),
        posts: post_ids.len(),
        comments: plan.comments.len(),
        follows: plan.follows.len(),
    };
    info!(
        users = outcome.users,
        posts = outcome.posts,
        comments = outcome.comments,
        follows = outcome.follows,
        "seeding complete"
    );
    Ok(outcome)
}
