use crate::domain::badge::BadgeGrant;
use crate::domain::models::{BadgeStats, CandylandBadge, CandylandCharacter, CandylandScore};
use anyhow::Result;
use sqlx::{PgConnection, PgPool};

pub async fn find_character(pool: &PgPool, user_id: i64) -> Result<Option<CandylandCharacter>> {
    let row = sqlx::query_as::<_, CandylandCharacter>(
        "SELECT character_type, character_name FROM candyland_character WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn upsert_character(
    pool: &PgPool,
    user_id: i64,
    character_type: Option<&str>,
    character_name: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO candyland_character (user_id, character_type, character_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id)
        DO UPDATE SET character_type = EXCLUDED.character_type,
                      character_name = EXCLUDED.character_name
        "#,
    )
    .bind(user_id)
    .bind(character_type)
    .bind(character_name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_score(pool: &PgPool, user_id: i64, score_type: &str, score_value: i32) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO candyland_scores (user_id, score_type, score_value)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, score_type)
        DO UPDATE SET score_value = EXCLUDED.score_value
        "#,
    )
    .bind(user_id)
    .bind(score_type)
    .bind(score_value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_scores(pool: &PgPool, user_id: i64) -> Result<Vec<CandylandScore>> {
    let rows = sqlx::query_as::<_, CandylandScore>(
        "SELECT score_type, score_value FROM candyland_scores WHERE user_id = $1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns the badge definition, creating it with `icon` on first use.
pub async fn ensure_badge(conn: &mut PgConnection, name: &str, icon: &str) -> Result<CandylandBadge> {
    sqlx::query(
        r#"
        INSERT INTO candyland_badges (badge_name, badge_icon)
        VALUES ($1, $2)
        ON CONFLICT (badge_name) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(icon)
    .execute(&mut *conn)
    .await?;

    let badge = sqlx::query_as::<_, CandylandBadge>(
        "SELECT id, badge_name, badge_icon FROM candyland_badges WHERE badge_name = $1",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(badge)
}

pub async fn grant_badge(conn: &mut PgConnection, user_id: i64, badge_id: i32) -> Result<BadgeGrant> {
    let result = sqlx::query(
        r#"
        INSERT INTO candyland_user_badges (user_id, badge_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, badge_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(badge_id)
    .execute(conn)
    .await?;
    Ok(BadgeGrant::from_rows_affected(result.rows_affected()))
}

pub async fn badge_stats(pool: &PgPool, badge_name: Option<&str>) -> Result<Vec<BadgeStats>> {
    let rows = sqlx::query_as::<_, BadgeStats>(
        r#"
        SELECT
            b.id,
            b.badge_name,
            b.badge_icon,
            (SELECT COUNT(*) FROM candyland_user_badges ub WHERE ub.badge_id = b.id) AS earned,
            j.attempts
        FROM candyland_badges b
        LEFT JOIN candyland_jinja_admin j ON j.game_name = b.badge_name
        WHERE ($1::text IS NULL OR b.badge_name = $1)
        ORDER BY b.id
        "#,
    )
    .bind(badge_name)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn user_badge_stats(pool: &PgPool, user_id: i64) -> Result<Vec<BadgeStats>> {
    let rows = sqlx::query_as::<_, BadgeStats>(
        r#"
        SELECT
            b.id,
            b.badge_name,
            b.badge_icon,
            (SELECT COUNT(*) FROM candyland_user_badges ub WHERE ub.badge_id = b.id) AS earned,
            j.attempts
        FROM candyland_user_badges mine
        JOIN candyland_badges b ON b.id = mine.badge_id
        LEFT JOIN candyland_jinja_admin j ON j.game_name = b.badge_name
        WHERE mine.user_id = $1
        ORDER BY b.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Bumps the global attempt counter for a game or badge name.
pub async fn record_attempt(pool: &PgPool, game_name: &str) -> Result<i32> {
    let attempts: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO candyland_jinja_admin (game_name, attempts)
        VALUES ($1, 1)
        ON CONFLICT (game_name)
        DO UPDATE SET attempts = candyland_jinja_admin.attempts + 1
        RETURNING attempts
        "#,
    )
    .bind(game_name)
    .fetch_one(pool)
    .await?;
    Ok(attempts)
}

pub async fn clear_attempt_counters(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM candyland_jinja_admin")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
