//! User cache configuration loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_ADDR: &str = "localhost:6379";

/// Settings read from `REDIS_*` environment variables.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "REDIS")]
pub struct UserCacheSettings {
    /// Consult Redis before the user store.
    #[ortho_config(default = false)]
    pub enabled: bool,
    /// `host:port` of the Redis server.
    pub addr: Option<String>,
    pub password: Option<String>,
    /// Logical database index.
    pub database: Option<u32>,
}

/// The configured address does not form a valid Redis URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid redis address {addr}")]
pub struct InvalidRedisAddress {
    pub addr: String,
}

impl UserCacheSettings {
    pub fn addr(&self) -> &str {
        self.addr.as_deref().unwrap_or(DEFAULT_ADDR)
    }

    /// Connection URL with the password percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRedisAddress`] when the address cannot be parsed.
    pub fn connection_url(&self) -> Result<Url, InvalidRedisAddress> {
        let invalid = || InvalidRedisAddress {
            addr: self.addr().to_owned(),
        };
        let database = self.database.unwrap_or(0);
        let mut url =
            Url::parse(&format!("redis://{}/{database}", self.addr())).map_err(|_| invalid())?;
        if let Some(password) = self.password.as_deref().filter(|pw| !pw.is_empty()) {
            url.set_password(Some(password)).map_err(|()| invalid())?;
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> UserCacheSettings {
        UserCacheSettings::load_from_iter([OsString::from("murmur")]).expect("config should load")
    }

    #[rstest]
    fn cache_is_disabled_by_default() {
        let _guard = lock_env([
            ("REDIS_ENABLED", None::<String>),
            ("REDIS_ADDR", None::<String>),
            ("REDIS_PASSWORD", None::<String>),
            ("REDIS_DATABASE", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert!(!settings.enabled);
        assert_eq!(settings.addr(), DEFAULT_ADDR);
        assert_eq!(
            settings.connection_url().expect("url").as_str(),
            "redis://localhost:6379/0"
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("REDIS_ENABLED", Some("true".to_owned())),
            ("REDIS_ADDR", Some("cache.internal:6380".to_owned())),
            ("REDIS_PASSWORD", Some("s3cret".to_owned())),
            ("REDIS_DATABASE", Some("2".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert!(settings.enabled);
        assert_eq!(
            settings.connection_url().expect("url").as_str(),
            "redis://:s3cret@cache.internal:6380/2"
        );
    }

    #[rstest]
    fn malformed_address_is_rejected() {
        let settings = UserCacheSettings {
            enabled: true,
            addr: Some("bad host:port".to_owned()),
            password: None,
            database: None,
        };
        assert!(settings.connection_url().is_err());
    }
}
