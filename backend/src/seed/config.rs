//! Seeding configuration loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::SeedCounts;

const DEFAULT_USERS: usize = 100;
const DEFAULT_POSTS: usize = 200;
const DEFAULT_COMMENTS: usize = 500;
const DEFAULT_FOLLOWS_PER_USER: usize = 5;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_PASSWORD: &str = "password";

/// Settings read from `SEED_*` environment variables.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SEED")]
pub struct SeedSettings {
    pub users: Option<usize>,
    pub posts: Option<usize>,
    pub comments: Option<usize>,
    pub follows_per_user: Option<usize>,
    /// RNG seed; the same value always produces the same data.
    pub seed: Option<u64>,
    /// Shared password for every generated account.
    pub password: Option<String>,
}

impl SeedSettings {
    #[must_use]
    pub fn counts(&self) -> SeedCounts {
        SeedCounts {
            users: self.users.unwrap_or(DEFAULT_USERS),
            posts: self.posts.unwrap_or(DEFAULT_POSTS),
            comments: self.comments.unwrap_or(DEFAULT_COMMENTS),
            follows_per_user: self.follows_per_user.unwrap_or(DEFAULT_FOLLOWS_PER_USER),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or(DEFAULT_PASSWORD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> SeedSettings {
        SeedSettings::load_from_iter([OsString::from("seed")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env([
            ("SEED_USERS", None::<String>),
            ("SEED_POSTS", None::<String>),
            ("SEED_COMMENTS", None::<String>),
            ("SEED_FOLLOWS_PER_USER", None::<String>),
            ("SEED_SEED", None::<String>),
            ("SEED_PASSWORD", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.counts(),
            SeedCounts {
                users: 100,
                posts: 200,
                comments: 500,
                follows_per_user: 5,
            }
        );
        assert_eq!(settings.seed(), 42);
        assert_eq!(settings.password(), "password");
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("SEED_USERS", Some("3".to_owned())),
            ("SEED_POSTS", Some("4".to_owned())),
            ("SEED_COMMENTS", Some("5".to_owned())),
            ("SEED_FOLLOWS_PER_USER", Some("1".to_owned())),
            ("SEED_SEED", Some("7".to_owned())),
            ("SEED_PASSWORD", Some("hunter22".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.counts().users, 3);
        assert_eq!(settings.counts().follows_per_user, 1);
        assert_eq!(settings.seed(), 7);
        assert_eq!(settings.password(), "hunter22");
    }
}
