//! Registration and login input, plus the claims carried by access tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::UserId;

/// Lifetime of an issued access token.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

const USERNAME_MIN: usize = 2;
const USERNAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;
const PASSWORD_MIN: usize = 8;
// bcrypt ignores input beyond 72 bytes.
const PASSWORD_MAX: usize = 72;

/// Validation failures for registration and login input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsValidationError {
    #[error("username must be between {min} and {max} characters")]
    UsernameLength { min: usize, max: usize },
    #[error("email must be a valid address of at most {max} characters")]
    InvalidEmail { max: usize },
    #[error("password must be between {min} and {max} bytes")]
    PasswordLength { min: usize, max: usize },
}

/// Emails are stored lowercased so uniqueness ignores case.
fn validate_email(raw: &str) -> Result<String, CredentialsValidationError> {
    let email = raw.trim();
    let invalid = CredentialsValidationError::InvalidEmail { max: EMAIL_MAX };
    if email.is_empty() || email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return Err(invalid);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid);
    };
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok {
        return Err(invalid);
    }
    Ok(email.to_ascii_lowercase())
}

fn validate_password(raw: String) -> Result<Zeroizing<String>, CredentialsValidationError> {
    let password = Zeroizing::new(raw);
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&password.len()) {
        return Err(CredentialsValidationError::PasswordLength {
            min: PASSWORD_MIN,
            max: PASSWORD_MAX,
        });
    }
    Ok(password)
}

/// Validated sign-up request.
#[derive(Debug)]
pub struct Registration {
    username: String,
    email: String,
    password: Zeroizing<String>,
}

impl Registration {
    /// Validate raw sign-up fields.
    ///
    /// # Examples
    /// ```
    /// use murmur::domain::Registration;
    ///
    /// let ok = Registration::try_from_parts("ada", "ada@example.com", "password1".into());
    /// assert!(ok.is_ok());
    /// let short = Registration::try_from_parts("a", "ada@example.com", "password1".into());
    /// assert!(short.is_err());
    /// ```
    pub fn try_from_parts(
        username: &str,
        email: &str,
        password: String,
    ) -> Result<Self, CredentialsValidationError> {
        let username = username.trim();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&username.chars().count()) {
            return Err(CredentialsValidationError::UsernameLength {
                min: USERNAME_MIN,
                max: USERNAME_MAX,
            });
        }
        Ok(Self {
            username: username.to_owned(),
            email: validate_email(email)?,
            password: validate_password(password)?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Consume the registration, returning the plaintext password.
    pub fn into_password(self) -> Zeroizing<String> {
        self.password
    }
}

/// Validated login request.
#[derive(Debug)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Validate raw login fields.
    pub fn try_from_parts(email: &str, password: String) -> Result<Self, CredentialsValidationError> {
        Ok(Self {
            email: validate_email(email)?,
            password: validate_password(password)?,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &Zeroizing<String> {
        &self.password
    }
}

/// Claims embedded in a signed access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id rendered as decimal text.
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl AccessClaims {
    /// Claims for `user` valid from `now` for `ttl`.
    #[must_use]
    pub fn issue(
        user: UserId,
        issuer: &str,
        audience: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let issued = now.timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: user.to_string(),
            iss: issuer.to_owned(),
            aud: audience.to_owned(),
            iat: issued,
            nbf: issued,
            exp: issued.saturating_add(ttl_secs),
        }
    }

    /// Parse the subject back into a user id.
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}
