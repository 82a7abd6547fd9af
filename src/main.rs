mod config;
mod db;
mod domain;
mod error;
mod middleware;
mod services;
mod state;
mod web;

use crate::config::Config;
use crate::db::seed;
use crate::middleware::RateLimiter;
use crate::services::{github::GithubClient, jokes::JokeStore};
use crate::state::SharedState;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOGIN_ATTEMPTS_PER_MINUTE: usize = 5;
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        e
    })?;
    tracing::info!("Database migrations completed");

    seed::seed_all(&pool, &config.admin_uid, config.admin_password.as_deref()).await?;

    let jokes = JokeStore::new(&config.data_folder);
    let init_store = jokes.clone();
    if tokio::task::spawn_blocking(move || init_store.init()).await?? {
        tracing::info!("Initialized joke store at {}", jokes.path().display());
    }

    let github = GithubClient::new(&config.github_api_url, config.github_token.clone())?;
    if config.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN not set, GitHub requests are unauthenticated");
    }

    let shared: SharedState = Arc::new(state::AppState {
        pool,
        session_key: config.session_key,
        secure_cookies: config.secure_cookies,
        github,
        jokes,
        login_limiter: RateLimiter::new(LOGIN_ATTEMPTS_PER_MINUTE, 60),
    });

    let limiter_state = shared.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter_state.login_limiter.cleanup().await;
            if removed > 0 {
                tracing::info!("Cleaned up {} idle rate limiter entries", removed);
            }
        }
    });

    let app = web::routes(shared).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
