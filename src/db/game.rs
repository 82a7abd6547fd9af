use crate::domain::models::{GameSession, Npc, PlayerInteraction, Question};
use crate::domain::questions::{plan_next_question, QuestionPlan};
use anyhow::Result;
use sqlx::{PgConnection, PgExecutor};
use std::collections::HashSet;

const SESSION_COLUMNS: &str =
    "session_id, user_id, gas_holder_npc_id, start_time, end_time, is_completed, attempts_count";
const QUESTION_COLUMNS: &str =
    "id, question_text, difficulty_level, correct_answer, options, category, college_board_aligned";
const INTERACTION_COLUMNS: &str =
    "interaction_id, session_id, npc_id, question_id, user_answer, is_correct, timestamp, response_time_ms";

pub async fn list_npcs(exec: impl PgExecutor<'_>) -> Result<Vec<Npc>> {
    let npcs = sqlx::query_as::<_, Npc>(
        "SELECT id, name, description, is_gas_holder FROM npcs ORDER BY id ASC",
    )
    .fetch_all(exec)
    .await?;
    Ok(npcs)
}

pub async fn find_npc(exec: impl PgExecutor<'_>, id: i32) -> Result<Option<Npc>> {
    let npc = sqlx::query_as::<_, Npc>(
        "SELECT id, name, description, is_gas_holder FROM npcs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(npc)
}

pub async fn random_npc(exec: impl PgExecutor<'_>) -> Result<Option<Npc>> {
    let npc = sqlx::query_as::<_, Npc>(
        "SELECT id, name, description, is_gas_holder FROM npcs ORDER BY random() LIMIT 1",
    )
    .fetch_optional(exec)
    .await?;
    Ok(npc)
}

pub async fn find_session(exec: impl PgExecutor<'_>, session_id: &str) -> Result<Option<GameSession>> {
    let session = sqlx::query_as::<_, GameSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(exec)
    .await?;
    Ok(session)
}

/// Row-locks the session for the rest of the transaction.
pub async fn lock_session(conn: &mut PgConnection, session_id: &str) -> Result<Option<GameSession>> {
    let session = sqlx::query_as::<_, GameSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE session_id = $1 FOR UPDATE"
    ))
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(session)
}

/// Latest uncompleted session of a user, expired or not.
pub async fn latest_open_session(exec: impl PgExecutor<'_>, user_id: i64) -> Result<Option<GameSession>> {
    let session = sqlx::query_as::<_, GameSession>(&format!(
        r#"
        SELECT {SESSION_COLUMNS}
        FROM game_sessions
        WHERE user_id = $1 AND is_completed = FALSE
        ORDER BY start_time DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .fetch_optional(exec)
    .await?;
    Ok(session)
}

pub async fn insert_session(conn: &mut PgConnection, session: &GameSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO game_sessions
            (session_id, user_id, gas_holder_npc_id, start_time, end_time, is_completed, attempts_count)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&session.session_id)
    .bind(session.user_id)
    .bind(session.gas_holder_npc_id)
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.is_completed)
    .bind(session.attempts_count)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn save_session_progress(conn: &mut PgConnection, session: &GameSession) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE game_sessions
        SET is_completed = $2, end_time = $3, attempts_count = $4
        WHERE session_id = $1
        "#,
    )
    .bind(&session.session_id)
    .bind(session.is_completed)
    .bind(session.end_time)
    .bind(session.attempts_count)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn list_interactions(exec: impl PgExecutor<'_>, session_id: &str) -> Result<Vec<PlayerInteraction>> {
    let rows = sqlx::query_as::<_, PlayerInteraction>(&format!(
        r#"
        SELECT {INTERACTION_COLUMNS}
        FROM player_interactions
        WHERE session_id = $1
        ORDER BY timestamp ASC, interaction_id ASC
        "#
    ))
    .bind(session_id)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

pub async fn insert_interaction(
    conn: &mut PgConnection,
    session_id: &str,
    npc_id: i32,
    question_id: Option<i32>,
) -> Result<PlayerInteraction> {
    let row = sqlx::query_as::<_, PlayerInteraction>(&format!(
        r#"
        INSERT INTO player_interactions (session_id, npc_id, question_id)
        VALUES ($1, $2, $3)
        RETURNING {INTERACTION_COLUMNS}
        "#
    ))
    .bind(session_id)
    .bind(npc_id)
    .bind(question_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn record_interaction_answer(
    conn: &mut PgConnection,
    interaction_id: i64,
    user_answer: &str,
    is_correct: bool,
    response_time_ms: Option<i32>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE player_interactions
        SET user_answer = $2, is_correct = $3, response_time_ms = $4
        WHERE interaction_id = $1
        "#,
    )
    .bind(interaction_id)
    .bind(user_answer)
    .bind(is_correct)
    .bind(response_time_ms)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_question(exec: impl PgExecutor<'_>, id: i32) -> Result<Option<Question>> {
    let question = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM question_pool WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(question)
}

/// Hands out a question the session has not seen yet, cloning one into a
/// fresh row once the pool is exhausted. `None` only when the pool is empty.
pub async fn next_question_for_session(
    conn: &mut PgConnection,
    session_id: &str,
) -> Result<Option<Question>> {
    let pool: Vec<i32> = sqlx::query_scalar("SELECT id FROM question_pool ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    let seen: HashSet<i32> = sqlx::query_scalar(
        "SELECT question_id FROM player_interactions WHERE session_id = $1 AND question_id IS NOT NULL",
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let plan = plan_next_question(&pool, &seen, &mut rand::thread_rng());
    match plan {
        QuestionPlan::Ask(id) => find_question(&mut *conn, id).await,
        QuestionPlan::CloneFrom(source) => {
            let clone = clone_question(conn, source).await?;
            tracing::info!(session_id, source, question_id = clone.id, "Question pool exhausted, cloned question");
            Ok(Some(clone))
        }
        QuestionPlan::PoolEmpty => Ok(None),
    }
}

async fn clone_question(conn: &mut PgConnection, source_id: i32) -> Result<Question> {
    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO question_pool
            (question_text, difficulty_level, correct_answer, options, category, college_board_aligned)
        SELECT question_text, difficulty_level, correct_answer, options, category, college_board_aligned
        FROM question_pool
        WHERE id = $1
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(source_id)
    .fetch_one(conn)
    .await?;
    Ok(question)
}
