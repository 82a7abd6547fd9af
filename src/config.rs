use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub session_key: Vec<u8>,
    pub bind_addr: String,
    pub data_folder: PathBuf,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub admin_uid: String,
    pub admin_password: Option<String>,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL missing")?;
        let session_key_b64 = env::var("SESSION_KEY").context("SESSION_KEY missing")?;
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64.trim())
            .context("SESSION_KEY must be base64")?;
        if session_key.len() < 16 {
            anyhow::bail!("SESSION_KEY must decode to at least 16 bytes");
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let secure_cookies = env::var("PRODUCTION").is_ok()
            || env::var("RAILWAY_ENVIRONMENT").is_ok()
            || env::var("FLY_APP_NAME").is_ok();

        Ok(Self {
            database_url,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", 10)?,
            session_key,
            bind_addr,
            data_folder: PathBuf::from(env::var("DATA_FOLDER").unwrap_or_else(|_| "data".into())),
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".into()),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            admin_uid: env::var("ADMIN_UID").unwrap_or_else(|_| "admin".into()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            secure_cookies,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        Err(_) => {
            tracing::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
