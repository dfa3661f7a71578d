//! Environment-driven server configuration.
//!
//! Values are read through [`mockable::Env`] so parsing can be tested without
//! touching the process environment. Debug builds fall back to a development
//! signing key with a warning; release builds refuse to start without one.

use std::net::SocketAddr;

use mockable::Env;
use murmur::outbound::mail::HttpMailerConfig;
use tracing::warn;
use url::Url;
use zeroize::Zeroizing;

const SERVER_ADDR_ENV: &str = "SERVER_ADDR";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const DB_MAX_CONNECTIONS_ENV: &str = "DB_MAX_CONNECTIONS";
const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";
const APP_NAME_ENV: &str = "APP_NAME";
const APP_ENV_ENV: &str = "APP_ENV";
const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
const MAIL_API_URL_ENV: &str = "MAIL_API_URL";
const MAIL_API_TOKEN_ENV: &str = "MAIL_API_TOKEN";
const FROM_EMAIL_ENV: &str = "FROM_EMAIL";
const CORS_ALLOW_ORIGIN_ENV: &str = "CORS_ALLOW_ORIGIN";

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 30;
const DEV_JWT_SECRET: &str = "example";
const DEFAULT_APP_NAME: &str = "murmur";
const DEFAULT_APP_ENV: &str = "development";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Build mode for configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate a missing signing key.
    Debug,
    /// Release builds require every secret explicitly.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Errors raised while reading server configuration.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Browser origin permitted by the CORS layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AllowedOrigin {
    /// `*`: any origin may call the API.
    Any,
    /// A serialised origin such as `https://murmur.example`.
    Exact(String),
}

/// Settings for the HTTP listener and the adapters behind it.
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: Zeroizing<String>,
    pub app_name: String,
    pub app_env: String,
    pub frontend_url: String,
    pub allowed_origin: AllowedOrigin,
    /// Absent means activation links are only logged.
    pub mail: Option<HttpMailerConfig>,
}

impl ServerConfig {
    /// Read configuration from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for malformed values and
    /// [`ConfigError::MissingEnv`] when a required variable is absent.
    pub fn from_env<E: Env>(env: &E, mode: BuildMode) -> Result<Self, ConfigError> {
        let bind_addr = parse_or(env, SERVER_ADDR_ENV, DEFAULT_ADDR, "host:port")?;
        let db_max_connections = match non_empty(env, DB_MAX_CONNECTIONS_ENV) {
            Some(value) => match value.parse::<u32>() {
                Ok(parsed) if parsed > 0 => parsed,
                _ => return Err(invalid(DB_MAX_CONNECTIONS_ENV, value, "a positive integer")),
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let app_name = non_empty(env, APP_NAME_ENV).unwrap_or_else(|| DEFAULT_APP_NAME.to_owned());
        let frontend_url =
            non_empty(env, FRONTEND_URL_ENV).unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_owned());
        if Url::parse(&frontend_url).is_err() {
            return Err(invalid(FRONTEND_URL_ENV, frontend_url, "an absolute URL"));
        }

        Ok(Self {
            bind_addr,
            database_url: non_empty(env, DATABASE_URL_ENV),
            db_max_connections,
            jwt_secret: jwt_secret(env, mode)?,
            allowed_origin: allowed_origin(env)?,
            mail: mail_config(env, &app_name)?,
            app_env: non_empty(env, APP_ENV_ENV).unwrap_or_else(|| DEFAULT_APP_ENV.to_owned()),
            app_name,
            frontend_url,
        })
    }
}

fn non_empty<E: Env>(env: &E, name: &str) -> Option<String> {
    env.string(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn invalid(name: &'static str, value: String, expected: &'static str) -> ConfigError {
    ConfigError::InvalidEnv {
        name,
        value,
        expected,
    }
}

fn parse_or<E: Env, T: std::str::FromStr>(
    env: &E,
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = non_empty(env, name).unwrap_or_else(|| default.to_owned());
    value.parse().map_err(|_| invalid(name, value, expected))
}

fn jwt_secret<E: Env>(env: &E, mode: BuildMode) -> Result<Zeroizing<String>, ConfigError> {
    match env.string(JWT_SECRET_ENV).filter(|value| !value.is_empty()) {
        Some(secret) => Ok(Zeroizing::new(secret)),
        None if mode.is_debug() => {
            warn!(name = JWT_SECRET_ENV, "signing key not set; using development key");
            Ok(Zeroizing::new(DEV_JWT_SECRET.to_owned()))
        }
        None => Err(ConfigError::MissingEnv {
            name: JWT_SECRET_ENV,
        }),
    }
}

fn allowed_origin<E: Env>(env: &E) -> Result<AllowedOrigin, ConfigError> {
    let value =
        non_empty(env, CORS_ALLOW_ORIGIN_ENV).unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_owned());
    if value == "*" {
        return Ok(AllowedOrigin::Any);
    }
    match Url::parse(&value) {
        Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => {
            Ok(AllowedOrigin::Exact(url.origin().ascii_serialization()))
        }
        _ => Err(invalid(CORS_ALLOW_ORIGIN_ENV, value, "an http(s) origin or '*'")),
    }
}

fn mail_config<E: Env>(env: &E, app_name: &str) -> Result<Option<HttpMailerConfig>, ConfigError> {
    let Some(raw_endpoint) = non_empty(env, MAIL_API_URL_ENV) else {
        return Ok(None);
    };
    let endpoint = Url::parse(&raw_endpoint)
        .map_err(|_| invalid(MAIL_API_URL_ENV, raw_endpoint.clone(), "an absolute URL"))?;
    let api_token = non_empty(env, MAIL_API_TOKEN_ENV).ok_or(ConfigError::MissingEnv {
        name: MAIL_API_TOKEN_ENV,
    })?;
    let from_email = non_empty(env, FROM_EMAIL_ENV).ok_or(ConfigError::MissingEnv {
        name: FROM_EMAIL_ENV,
    })?;
    Ok(Some(HttpMailerConfig {
        endpoint,
        api_token,
        from_email,
        app_name: app_name.to_owned(),
    }))
}
