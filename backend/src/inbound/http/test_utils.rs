//! Test helpers for inbound HTTP components.
//!
//! Handlers run against the real domain services backed by
//! [`InMemoryStore`], a real JWT authenticator and a logging mailer.

use std::sync::Arc;

use actix_web::{App, web};
use mockable::DefaultClock;
use zeroize::Zeroizing;

use crate::domain::{
    AccountService, AccountSettings, FollowService, LoginCredentials, MailDispatcher,
    PostAccessPolicy, PostService, Registration, User, UserLookup,
};
use crate::outbound::mail::LoggingMailer;
use crate::outbound::memory::InMemoryStore;
use crate::outbound::token::JwtAuthenticator;
use crate::test_support::ImmediateSleeper;

use super::state::{AppInfo, HttpState, HttpStatePorts};

pub const TEST_APP: &str = "murmur-test";

/// State plus a handle on the store for seeding and inspection.
pub struct TestHarness {
    pub state: web::Data<HttpState>,
    pub store: Arc<InMemoryStore>,
}

/// Build handler state over a fresh in-memory store.
///
/// Bcrypt runs at its minimum cost so registration and login stay fast.
pub fn test_harness() -> TestHarness {
    let store = Arc::new(InMemoryStore::new());
    let secret = Zeroizing::new("test-secret".to_owned());
    let tokens = Arc::new(JwtAuthenticator::new(&secret, TEST_APP, TEST_APP));
    let mail = MailDispatcher::new(Arc::new(LoggingMailer), store.clone())
        .with_sleeper(Arc::new(ImmediateSleeper));
    let mut settings = AccountSettings::new(TEST_APP, "http://localhost:3000");
    settings.bcrypt_cost = 4;

    let ports = HttpStatePorts {
        accounts: Arc::new(AccountService::new(
            store.clone(),
            tokens,
            mail,
            Arc::new(DefaultClock),
            settings,
        )),
        users: Arc::new(UserLookup::new(store.clone())),
        posts: Arc::new(PostService::new(store.clone(), store.clone())),
        follows: Arc::new(FollowService::new(store.clone())),
        access: Arc::new(PostAccessPolicy::new(store.clone())),
    };
    TestHarness {
        state: web::Data::new(HttpState::new(ports, AppInfo::new("test"))),
        store,
    }
}

/// An `App` carrying the harness state and the JSON error configuration.
pub fn test_app(
    harness: &TestHarness,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    App::new()
        .app_data(harness.state.clone())
        .configure(super::configure_extractors)
}

pub const TEST_PASSWORD: &str = "correct horse";

/// Register, activate and log in `username`, returning the user and a token.
pub async fn signed_in(harness: &TestHarness, username: &str) -> (User, String) {
    let email = format!("{username}@example.com");
    let accounts = &harness.state.accounts;
    let registration = Registration::try_from_parts(username, &email, TEST_PASSWORD.to_owned())
        .expect("valid registration");
    let registered = accounts.register(registration).await.expect("registered");
    accounts
        .activate(&registered.token)
        .await
        .expect("activated");
    let credentials = LoginCredentials::try_from_parts(&email, TEST_PASSWORD.to_owned())
        .expect("valid credentials");
    let token = accounts.login(credentials).await.expect("logged in");
    let user = harness
        .state
        .users
        .get_user(registered.user.id)
        .await
        .expect("active user");
    (user, token)
}

/// `Authorization` header value for `token`.
pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (actix_web::http::header::AUTHORIZATION, format!("Bearer {token}"))
}
