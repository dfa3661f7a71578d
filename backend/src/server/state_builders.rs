//! Builders for HTTP state from configured adapters.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::{info, warn};

use murmur::domain::ports::{
    CommentRepository, FollowRepository, Mailer, PostRepository, RoleRepository, UserCache,
    UserRepository,
};
use murmur::domain::{
    AccountService, AccountSettings, FollowService, MailDispatcher, PostAccessPolicy, PostService,
    TokioSleeper, UserLookup,
};
use murmur::inbound::http::state::{AppInfo, HttpState, HttpStatePorts};
use murmur::outbound::cache::{RedisUserCache, UserCacheSettings};
use murmur::outbound::mail::{HttpMailer, LoggingMailer};
use murmur::outbound::memory::InMemoryStore;
use murmur::outbound::persistence::{
    DbPool, DieselCommentRepository, DieselFollowRepository, DieselPostRepository,
    DieselRoleRepository, DieselUserRepository,
};
use murmur::outbound::token::JwtAuthenticator;

use super::ServerConfig;

/// The storage ports, backed by one adapter family.
struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    follows: Arc<dyn FollowRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl Repositories {
    fn diesel(pool: &DbPool) -> Self {
        Self {
            users: Arc::new(DieselUserRepository::new(pool.clone())),
            posts: Arc::new(DieselPostRepository::new(pool.clone())),
            comments: Arc::new(DieselCommentRepository::new(pool.clone())),
            follows: Arc::new(DieselFollowRepository::new(pool.clone())),
            roles: Arc::new(DieselRoleRepository::new(pool.clone())),
        }
    }

    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            roles: store,
        }
    }
}

fn build_mailer(config: &ServerConfig) -> std::io::Result<Arc<dyn Mailer>> {
    match &config.mail {
        Some(mail) => {
            let mailer = HttpMailer::new(mail.clone())
                .map_err(|err| std::io::Error::other(format!("mail client setup failed: {err}")))?;
            info!(endpoint = %mail.endpoint, "invitation mail goes through the mail API");
            Ok(Arc::new(mailer))
        }
        None => {
            warn!("MAIL_API_URL not set; activation links are only logged");
            Ok(Arc::new(LoggingMailer))
        }
    }
}

/// Connect the Redis user cache when enabled. A cache whose pool cannot be
/// built is logged and skipped; lookups then go to the store.
async fn build_user_cache(settings: &UserCacheSettings) -> Option<Arc<dyn UserCache>> {
    if !settings.enabled {
        return None;
    }
    match RedisUserCache::connect(settings).await {
        Ok(cache) => {
            info!(addr = settings.addr(), "user cache enabled");
            Some(Arc::new(cache))
        }
        Err(error) => {
            warn!(%error, addr = settings.addr(), "user cache unavailable; continuing without it");
            None
        }
    }
}

/// Assemble the services behind the HTTP handlers.
///
/// Uses Diesel repositories when `pool` is present, otherwise a shared
/// [`InMemoryStore`].
///
/// # Errors
///
/// Returns [`std::io::Error`] when the mail client cannot be constructed.
pub async fn build_http_state(
    config: &ServerConfig,
    pool: Option<&DbPool>,
    cache_settings: &UserCacheSettings,
) -> std::io::Result<web::Data<HttpState>> {
    let repos = match pool {
        Some(pool) => Repositories::diesel(pool),
        None => {
            warn!("DATABASE_URL not set; data lives in memory and is lost on restart");
            Repositories::in_memory()
        }
    };

    let tokens = Arc::new(JwtAuthenticator::new(
        &config.jwt_secret,
        &config.app_name,
        &config.app_name,
    ));
    let mail = MailDispatcher::new(build_mailer(config)?, repos.users.clone())
        .with_sleeper(Arc::new(TokioSleeper));
    let accounts = AccountService::new(
        repos.users.clone(),
        tokens,
        mail,
        Arc::new(DefaultClock),
        AccountSettings::new(&config.app_name, &config.frontend_url),
    );

    let mut users = UserLookup::new(repos.users.clone());
    if let Some(cache) = build_user_cache(cache_settings).await {
        users = users.with_cache(cache);
    }

    let ports = HttpStatePorts {
        accounts: Arc::new(accounts),
        users: Arc::new(users),
        posts: Arc::new(PostService::new(repos.posts, repos.comments)),
        follows: Arc::new(FollowService::new(repos.follows)),
        access: Arc::new(PostAccessPolicy::new(repos.roles)),
    };
    Ok(web::Data::new(HttpState::new(
        ports,
        AppInfo::new(config.app_env.clone()),
    )))
}
