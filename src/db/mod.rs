pub mod analytics;
pub mod candyland;
pub mod game;
pub mod seed;

use crate::domain::models::UserRole;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(skip)]
    pub hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl DbUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub async fn find_user_by_uid(pool: &PgPool, uid: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, uid, name, hash, role, created_at
        FROM users
        WHERE uid = $1
        "#,
    )
    .bind(uid)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: i64) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, uid, name, hash, role, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Inserts a user unless the uid is taken. Returns `None` on conflict.
pub async fn create_user(
    pool: &PgPool,
    uid: &str,
    name: &str,
    hash: &str,
    role: UserRole,
) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        INSERT INTO users (uid, name, hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (uid) DO NOTHING
        RETURNING id, uid, name, hash, role, created_at
        "#,
    )
    .bind(uid)
    .bind(name)
    .bind(hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn count_users(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
