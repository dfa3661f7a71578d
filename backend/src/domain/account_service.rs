//! Account lifecycle: registration, activation, login and bearer checks.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{debug, info};

use super::ports::{InvitationMail, TokenAuthenticator, TokenError, UserRepository};
use super::user_lookup::map_user_persistence_error;
use super::{
    ACCESS_TOKEN_TTL, AccessClaims, Error, Invitation, InvitationMailJob, InvitationToken,
    LoginCredentials, MailDispatcher, MailJobHandle, NewUser, PasswordError, PasswordHash,
    Registration, User, UserId,
};

/// Settings that shape issued tokens and activation links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSettings {
    /// Used as both token issuer and audience.
    pub app_name: String,
    /// Base URL of the web client; activation links point below it.
    pub frontend_url: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AccountSettings {
    pub fn new(app_name: impl Into<String>, frontend_url: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            frontend_url: frontend_url.into(),
            token_ttl: ACCESS_TOKEN_TTL,
            bcrypt_cost: super::password::DEFAULT_COST,
        }
    }

    fn activation_url(&self, token: &InvitationToken) -> String {
        format!(
            "{}/confirm/{}",
            self.frontend_url.trim_end_matches('/'),
            token.as_str()
        )
    }
}

/// A freshly registered user with the plaintext invitation token.
#[derive(Debug)]
pub struct RegisteredUser {
    pub user: User,
    pub token: InvitationToken,
    pub mail: MailJobHandle,
}

fn map_password_error(error: PasswordError) -> Error {
    Error::internal(error.to_string())
}

fn map_token_error(error: TokenError) -> Error {
    match error {
        TokenError::Signing { .. } => Error::internal(error.to_string()),
        TokenError::InvalidSignature
        | TokenError::Expired
        | TokenError::IssuerMismatch
        | TokenError::AudienceMismatch
        | TokenError::InvalidAlgorithm
        | TokenError::Malformed { .. } => Error::unauthorized("invalid or expired token"),
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenAuthenticator>,
    mail: MailDispatcher,
    clock: Arc<dyn Clock>,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenAuthenticator>,
        mail: MailDispatcher,
        clock: Arc<dyn Clock>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            users,
            tokens,
            mail,
            clock,
            settings,
        }
    }

    /// Create an inactive user, store its invitation, and queue the mail.
    pub async fn register(&self, registration: Registration) -> Result<RegisteredUser, Error> {
        let username = registration.username().to_owned();
        let email = registration.email().to_owned();
        let password =
            PasswordHash::create_blocking(registration.into_password(), self.settings.bcrypt_cost)
                .await
                .map_err(map_password_error)?;

        let token = InvitationToken::generate();
        let invitation = Invitation::issue(&token, self.clock.utc());
        let new_user = NewUser {
            username,
            email,
            password,
        };
        let user = self
            .users
            .create_with_invitation(&new_user, &invitation)
            .await
            .map_err(map_user_persistence_error)?;
        info!(user_id = %user.id, "user registered");

        let mail = self.mail.dispatch(InvitationMailJob {
            user_id: user.id,
            mail: InvitationMail {
                recipient_email: user.email.clone(),
                recipient_name: user.username.clone(),
                activation_url: self.settings.activation_url(&token),
            },
        });

        Ok(RegisteredUser { user, token, mail })
    }

    /// Consume an invitation token.
    pub async fn activate(&self, token: &InvitationToken) -> Result<(), Error> {
        self.users
            .activate(&token.digest(), self.clock.utc())
            .await
            .map_err(map_user_persistence_error)?;
        info!("user activated");
        Ok(())
    }

    /// Exchange credentials for a signed access token.
    ///
    /// Unknown emails, inactive users and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<String, Error> {
        let invalid = || Error::unauthorized("invalid credentials");
        let Some(stored) = self
            .users
            .find_credentials_by_email(credentials.email())
            .await
            .map_err(map_user_persistence_error)?
        else {
            debug!("login for unknown or inactive email");
            return Err(invalid());
        };

        let matches = stored
            .password
            .verify_blocking(credentials.password().clone())
            .await
            .map_err(map_password_error)?;
        if !matches {
            debug!(user_id = %stored.user.id, "login with wrong password");
            return Err(invalid());
        }

        let claims = AccessClaims::issue(
            stored.user.id,
            &self.settings.app_name,
            &self.settings.app_name,
            self.clock.utc(),
            self.settings.token_ttl,
        );
        let token = self.tokens.generate(&claims).map_err(map_token_error)?;
        info!(user_id = %stored.user.id, "access token issued");
        Ok(token)
    }

    /// Validate a bearer token and return its subject.
    pub fn authenticate(&self, token: &str) -> Result<UserId, Error> {
        let claims = self.tokens.validate(token).map_err(|err| {
            debug!(error = %err, "bearer token rejected");
            map_token_error(err)
        })?;
        claims
            .user_id()
            .ok_or_else(|| Error::unauthorized("invalid or expired token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockMailer, MockTokenAuthenticator, MockUserRepository, UserPersistenceError,
    };
    use crate::domain::{ErrorCode, MailOutcome, Role, UserCredentials};
    use crate::test_support::{ImmediateSleeper, MutableClock};
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    const TEST_COST: u32 = 4;

    fn user(id: i64, email: &str) -> User {
        User {
            id: UserId::new(id),
            username: "ada".to_owned(),
            email: email.to_owned(),
            is_active: false,
            role: Role::new("user", 1),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn settings() -> AccountSettings {
        AccountSettings {
            bcrypt_cost: TEST_COST,
            ..AccountSettings::new("murmur", "http://localhost:3000/")
        }
    }

    fn service(
        users: MockUserRepository,
        tokens: MockTokenAuthenticator,
        mailer: MockMailer,
    ) -> AccountService {
        let users: Arc<dyn UserRepository> = Arc::new(users);
        let mail = MailDispatcher::new(Arc::new(mailer), Arc::clone(&users))
            .with_sleeper(Arc::new(ImmediateSleeper));
        AccountService::new(
            users,
            Arc::new(tokens),
            mail,
            Arc::new(MutableClock::new(DateTime::<Utc>::UNIX_EPOCH)),
            settings(),
        )
    }

    #[tokio::test]
    async fn register_stores_digest_and_mails_plain_token() {
        let mut users = MockUserRepository::new();
        users
            .expect_create_with_invitation()
            .times(1)
            .returning(|new_user, invitation| {
                assert!(new_user.password.verify("password1").expect("bcrypt"));
                assert_eq!(
                    invitation.expires_at,
                    DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::hours(24)
                );
                Ok(user(1, &new_user.email))
            });
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_invitation()
            .times(1)
            .withf(|mail| mail.activation_url.starts_with("http://localhost:3000/confirm/"))
            .returning(|_| Ok(()));

        let registration =
            Registration::try_from_parts("ada", "ada@example.com", "password1".to_owned())
                .expect("valid registration");
        let registered = service(users, MockTokenAuthenticator::new(), mailer)
            .register(registration)
            .await
            .expect("registered");

        assert_eq!(registered.user.email, "ada@example.com");
        let outcome = registered.mail.outcome().await.expect("mail job");
        assert_eq!(outcome, MailOutcome::Delivered { attempts: 1 });
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_create_with_invitation()
            .return_once(|_, _| Err(UserPersistenceError::duplicate_email()));
        let registration =
            Registration::try_from_parts("ada", "ada@example.com", "password1".to_owned())
                .expect("valid registration");
        let err = service(users, MockTokenAuthenticator::new(), MockMailer::new())
            .register(registration)
            .await
            .expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn activation_with_unknown_token_is_not_found() {
        let mut users = MockUserRepository::new();
        users
            .expect_activate()
            .return_once(|_, _| Err(UserPersistenceError::invitation_not_found()));
        let err = service(users, MockTokenAuthenticator::new(), MockMailer::new())
            .activate(&InvitationToken::from_plain("nope"))
            .await
            .expect_err("unknown token");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    fn credentials_repo() -> MockUserRepository {
        let hash = PasswordHash::create("password1", TEST_COST).expect("hash");
        let mut users = MockUserRepository::new();
        users.expect_find_credentials_by_email().returning(move |email| {
            Ok((email == "ada@example.com").then(|| UserCredentials {
                user: user(1, email),
                password: hash.clone(),
            }))
        });
        users
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_password() {
        let mut tokens = MockTokenAuthenticator::new();
        tokens
            .expect_generate()
            .withf(|claims| claims.sub == "1" && claims.iss == "murmur" && claims.aud == "murmur")
            .times(1)
            .returning(|_| Ok("signed".to_owned()));
        let credentials =
            LoginCredentials::try_from_parts("ada@example.com", "password1".to_owned())
                .expect("valid");
        let token = service(credentials_repo(), tokens, MockMailer::new())
            .login(credentials)
            .await
            .expect("token");
        assert_eq!(token, "signed");
    }

    #[rstest]
    #[case("ada@example.com", "wrong-password")]
    #[case("bob@example.com", "password1")]
    #[tokio::test]
    async fn login_rejects_bad_credentials(#[case] email: &str, #[case] password: &str) {
        let mut tokens = MockTokenAuthenticator::new();
        tokens.expect_generate().never();
        let credentials =
            LoginCredentials::try_from_parts(email, password.to_owned()).expect("valid");
        let err = service(credentials_repo(), tokens, MockMailer::new())
            .login(credentials)
            .await
            .expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[case(TokenError::expired())]
    #[case(TokenError::invalid_signature())]
    #[case(TokenError::audience_mismatch())]
    fn authenticate_maps_token_failures_to_unauthorized(#[case] failure: TokenError) {
        let mut tokens = MockTokenAuthenticator::new();
        tokens.expect_validate().return_once(move |_| Err(failure));
        let err = service(MockUserRepository::new(), tokens, MockMailer::new())
            .authenticate("token")
            .expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
