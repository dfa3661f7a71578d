//! Service entry-point: reads configuration, wires adapters and runs the
//! HTTP server until it is asked to stop.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use murmur::inbound::http::health::HealthState;
use murmur::middleware::RateLimit;
use murmur::outbound::cache::UserCacheSettings;
use murmur::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use murmur::rate_limit::{ClientRateLimiter, RateLimitSettings};

use server::{AppDependencies, BuildMode, ServerConfig, build_http_state, create_server};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}

async fn connect_database(config: &ServerConfig) -> Result<Option<DbPool>> {
    let Some(url) = config.database_url.as_deref() else {
        return Ok(None);
    };
    run_migrations(url)
        .await
        .wrap_err("failed to apply database migrations")?;
    let pool = DbPool::new(PoolConfig::new(url).with_max_size(config.db_max_connections))
        .await
        .wrap_err("failed to build database pool")?;
    info!(max_connections = config.db_max_connections, "database pool ready");
    Ok(Some(pool))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let config = ServerConfig::from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("invalid server configuration")?;
    let rate_limit_settings =
        RateLimitSettings::load().map_err(|err| eyre!("invalid rate limiter settings: {err}"))?;
    let cache_settings =
        UserCacheSettings::load().map_err(|err| eyre!("invalid user cache settings: {err}"))?;

    let pool = connect_database(&config).await?;
    let http_state = build_http_state(&config, pool.as_ref(), &cache_settings).await?;

    let limiter = rate_limit_settings
        .enabled
        .then(|| Arc::new(ClientRateLimiter::new(rate_limit_settings.policy())));
    let rate_limit = match &limiter {
        Some(limiter) => {
            limiter.start();
            if rate_limit_settings.trust_proxy {
                info!("rate limiter keys on forwarded client addresses");
            }
            RateLimit::new(limiter.clone()).trust_proxy(rate_limit_settings.trust_proxy)
        }
        None => {
            warn!("rate limiting disabled");
            RateLimit::disabled()
        }
    };

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        AppDependencies {
            health_state: health_state.clone(),
            http_state,
            rate_limit,
            allowed_origin: config.allowed_origin.clone(),
            #[cfg(feature = "metrics")]
            metrics: server::initialize_metrics(server::make_metrics),
        },
        config.bind_addr,
    )?;

    info!(addr = %config.bind_addr, environment = %config.app_env, "listening");
    health_state.mark_ready();
    let outcome = server.await;

    health_state.mark_unhealthy();
    if let Some(limiter) = limiter {
        limiter.stop().await;
    }
    info!("server stopped");
    outcome.wrap_err("server terminated with an error")
}
