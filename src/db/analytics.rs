use crate::domain::models::GameSession;
use anyhow::Result;
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
pub struct SessionInteractionStats {
    pub session_id: String,
    pub interaction_count: i64,
    pub questions_seen: i64,
    pub correct_count: i64,
    pub avg_response_time_ms: Option<f64>,
}

#[derive(Debug, FromRow)]
pub struct QuestionStats {
    pub question_id: i32,
    pub question_text: String,
    pub difficulty_level: Option<i32>,
    pub category: Option<String>,
    pub college_board_aligned: bool,
    pub attempt_count: i64,
    pub correct_count: i64,
    pub avg_response_time_ms: Option<f64>,
}

pub async fn sessions_for_user(pool: &PgPool, user_id: i64, limit: i64) -> Result<Vec<GameSession>> {
    let rows = sqlx::query_as::<_, GameSession>(
        r#"
        SELECT session_id, user_id, gas_holder_npc_id, start_time, end_time, is_completed, attempts_count
        FROM game_sessions
        WHERE user_id = $1
        ORDER BY start_time DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn recent_sessions(pool: &PgPool, limit: i64) -> Result<Vec<GameSession>> {
    let rows = sqlx::query_as::<_, GameSession>(
        r#"
        SELECT session_id, user_id, gas_holder_npc_id, start_time, end_time, is_completed, attempts_count
        FROM game_sessions
        ORDER BY start_time DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn interaction_stats(pool: &PgPool, session_ids: &[String]) -> Result<Vec<SessionInteractionStats>> {
    if session_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, SessionInteractionStats>(
        r#"
        SELECT
            session_id,
            COUNT(interaction_id) AS interaction_count,
            COUNT(question_id) AS questions_seen,
            COUNT(*) FILTER (WHERE is_correct) AS correct_count,
            AVG(response_time_ms)::float8 AS avg_response_time_ms
        FROM player_interactions
        WHERE session_id = ANY($1)
        GROUP BY session_id
        "#,
    )
    .bind(session_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn question_stats(
    pool: &PgPool,
    category: Option<&str>,
    difficulty_level: Option<i32>,
    limit: i64,
) -> Result<Vec<QuestionStats>> {
    let rows = sqlx::query_as::<_, QuestionStats>(
        r#"
        SELECT
            q.id AS question_id,
            q.question_text,
            q.difficulty_level,
            q.category,
            q.college_board_aligned,
            COUNT(pi.interaction_id) AS attempt_count,
            COUNT(*) FILTER (WHERE pi.is_correct) AS correct_count,
            AVG(pi.response_time_ms)::float8 AS avg_response_time_ms
        FROM question_pool q
        LEFT JOIN player_interactions pi ON pi.question_id = q.id
        WHERE ($1::text IS NULL OR q.category = $1)
          AND ($2::int IS NULL OR q.difficulty_level = $2)
        GROUP BY q.id
        ORDER BY COUNT(pi.interaction_id) DESC, q.id ASC
        LIMIT $3
        "#,
    )
    .bind(category)
    .bind(difficulty_level)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
