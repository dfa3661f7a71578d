//! Fill a PostgreSQL database with demo users, posts, comments and follows.

use chrono::Utc;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::{DefaultEnv, Env};
use ortho_config::OrthoConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroizing;

use murmur::domain::PasswordHash;
use murmur::domain::password::DEFAULT_COST;
use murmur::outbound::persistence::{
    DbPool, DieselCommentRepository, DieselFollowRepository, DieselPostRepository,
    DieselUserRepository, PoolConfig, run_migrations,
};
use murmur::seed::{SeedPlan, SeedSettings, SeedTargets, seed_database};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| eyre!("tracing init failed: {err}"))?;

    let settings = SeedSettings::load().map_err(|err| eyre!("invalid seed settings: {err}"))?;
    let url = DefaultEnv::new()
        .string("DATABASE_URL")
        .ok_or_else(|| eyre!("DATABASE_URL must be set"))?;

    run_migrations(&url)
        .await
        .wrap_err("failed to apply database migrations")?;
    let pool = DbPool::new(PoolConfig::new(url))
        .await
        .wrap_err("failed to build database pool")?;

    let plan = SeedPlan::generate(settings.counts(), settings.seed());
    info!(seed = settings.seed(), users = plan.users.len(), "seeding database");
    let password =
        PasswordHash::create_blocking(Zeroizing::new(settings.password().to_owned()), DEFAULT_COST)
            .await
            .wrap_err("failed to hash the seed password")?;

    let users = DieselUserRepository::new(pool.clone());
    let posts = DieselPostRepository::new(pool.clone());
    let comments = DieselCommentRepository::new(pool.clone());
    let follows = DieselFollowRepository::new(pool);
    seed_database(
        SeedTargets {
            users: &users,
            posts: &posts,
            comments: &comments,
            follows: &follows,
        },
        &plan,
        &password,
        Utc::now(),
    )
    .await
    .wrap_err("seeding failed")?;
    Ok(())
}
