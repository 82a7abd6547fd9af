use crate::middleware::RateLimiter;
use crate::services::github::GithubClient;
use crate::services::jokes::JokeStore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_key: Vec<u8>,
    pub secure_cookies: bool,
    pub github: GithubClient,
    pub jokes: JokeStore,
    pub login_limiter: RateLimiter,
}

pub type SharedState = Arc<AppState>;
