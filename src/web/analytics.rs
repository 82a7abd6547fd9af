use crate::db::{self, analytics};
use crate::domain::models::GameSession;
use crate::domain::stats::{self, round_to, SessionSummary};
use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use crate::web::github;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct QuestionQuery {
    limit: Option<i64>,
    category: Option<String>,
    difficulty_level: Option<i32>,
}

#[derive(Serialize)]
struct PlayerInfo {
    id: i64,
    uid: String,
    name: String,
}

#[derive(Serialize)]
struct PlayerSummary {
    total_sessions: usize,
    completed_sessions: usize,
    completion_rate: f64,
    avg_completion_time_s: Option<f64>,
    avg_attempts: f64,
}

#[derive(Serialize)]
struct SessionRow {
    session_id: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    is_completed: bool,
    attempts_count: i32,
    duration_s: Option<f64>,
    interaction_count: i64,
    questions_seen: i64,
    correct_count: i64,
    avg_response_time_ms: Option<f64>,
}

#[derive(Serialize)]
struct PlayerAnalytics {
    user: PlayerInfo,
    summary: PlayerSummary,
    recent_sessions: Vec<SessionRow>,
}

#[derive(Serialize)]
struct QuestionRow {
    question_id: i32,
    question_text: String,
    difficulty_level: Option<i32>,
    category: Option<String>,
    college_board_aligned: bool,
    attempt_count: i64,
    correct_count: i64,
    correct_rate: Option<f64>,
    avg_response_time_ms: Option<f64>,
}

#[derive(Serialize)]
struct QuestionAnalytics {
    count: usize,
    results: Vec<QuestionRow>,
}

#[derive(Serialize)]
struct SessionAnalytics {
    summary: SessionSummary,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/player/:user_id", get(player_analytics))
        .route("/questions", get(question_analytics))
        .route("/sessions", get(session_analytics))
        .with_state(state.clone())
        .merge(github::router(state))
}

fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

async fn player_analytics(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<PlayerAnalytics>> {
    let user = db::find_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found_by("User", "user_id", user_id))?;

    let limit = clamp_limit(query.limit, 25, 200);
    let sessions = analytics::sessions_for_user(&state.pool, user_id, limit).await?;
    let ids: Vec<String> = sessions.iter().map(|s| s.session_id.clone()).collect();
    let by_session: HashMap<String, analytics::SessionInteractionStats> =
        analytics::interaction_stats(&state.pool, &ids)
            .await?
            .into_iter()
            .map(|row| (row.session_id.clone(), row))
            .collect();

    let summary = stats::summarize_sessions(&sessions);

    let recent_sessions = sessions
        .into_iter()
        .map(|s| {
            let stats = by_session.get(&s.session_id);
            session_row(s, stats)
        })
        .collect();

    Ok(Json(PlayerAnalytics {
        user: PlayerInfo {
            id: user.id,
            uid: user.uid,
            name: user.name,
        },
        summary: PlayerSummary {
            total_sessions: summary.total_sessions,
            completed_sessions: summary.completed_sessions,
            completion_rate: summary.completion_rate,
            avg_completion_time_s: summary.avg_completion_time_s,
            avg_attempts: summary.avg_attempts,
        },
        recent_sessions,
    }))
}

fn session_row(s: GameSession, stats: Option<&analytics::SessionInteractionStats>) -> SessionRow {
    SessionRow {
        duration_s: s.duration_secs().map(|d| round_to(d, 2)),
        interaction_count: stats.map(|r| r.interaction_count).unwrap_or(0),
        questions_seen: stats.map(|r| r.questions_seen).unwrap_or(0),
        correct_count: stats.map(|r| r.correct_count).unwrap_or(0),
        avg_response_time_ms: stats
            .and_then(|r| r.avg_response_time_ms)
            .map(|v| round_to(v, 2)),
        session_id: s.session_id,
        start_time: s.start_time,
        end_time: s.end_time,
        is_completed: s.is_completed,
        attempts_count: s.attempts_count,
    }
}

async fn question_analytics(
    State(state): State<SharedState>,
    Query(query): Query<QuestionQuery>,
) -> AppResult<Json<QuestionAnalytics>> {
    let limit = clamp_limit(query.limit, 50, 500);
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let rows = analytics::question_stats(&state.pool, category, query.difficulty_level, limit).await?;

    let results: Vec<QuestionRow> = rows
        .into_iter()
        .map(|r| QuestionRow {
            correct_rate: (r.attempt_count > 0)
                .then(|| round_to(r.correct_count as f64 / r.attempt_count as f64, 4)),
            avg_response_time_ms: r.avg_response_time_ms.map(|v| round_to(v, 2)),
            question_id: r.question_id,
            question_text: r.question_text,
            difficulty_level: r.difficulty_level,
            category: r.category,
            college_board_aligned: r.college_board_aligned,
            attempt_count: r.attempt_count,
            correct_count: r.correct_count,
        })
        .collect();

    Ok(Json(QuestionAnalytics {
        count: results.len(),
        results,
    }))
}

async fn session_analytics(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<SessionAnalytics>> {
    let limit = clamp_limit(query.limit, 500, 5000);
    let sessions = analytics::recent_sessions(&state.pool, limit).await?;
    Ok(Json(SessionAnalytics {
        summary: stats::summarize_sessions(&sessions),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None, 25, 200), 25);
        assert_eq!(clamp_limit(Some(0), 25, 200), 1);
        assert_eq!(clamp_limit(Some(-4), 25, 200), 1);
        assert_eq!(clamp_limit(Some(999), 25, 200), 200);
        assert_eq!(clamp_limit(Some(40), 50, 500), 40);
    }

    #[test]
    fn session_row_carries_interaction_stats() {
        let start = Utc::now();
        let mut session = GameSession::new(3, Some(7), start);
        session.record_answer(true, start + chrono::Duration::seconds(90));

        let stats = analytics::SessionInteractionStats {
            session_id: session.session_id.clone(),
            interaction_count: 5,
            questions_seen: 2,
            correct_count: 1,
            avg_response_time_ms: Some(1234.567),
        };
        let row = session_row(session.clone(), Some(&stats));
        assert_eq!(row.interaction_count, 5);
        assert_eq!(row.questions_seen, 2);
        assert_eq!(row.avg_response_time_ms, Some(1234.57));
        assert_eq!(row.duration_s, Some(90.0));

        let empty = session_row(session, None);
        assert_eq!(empty.interaction_count, 0);
        assert_eq!(empty.avg_response_time_ms, None);
    }
}
