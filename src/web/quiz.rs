use crate::db::game;
use crate::domain::models::PublicQuestion;
use crate::domain::models::PlayerInteraction;
use crate::domain::session::{answers_match, latest_interaction_for, AnswerOutcome};
use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use crate::web::game::ensure_playable;
use crate::web::payload::Fields;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct AnswerResponse {
    is_correct: bool,
    session_completed: bool,
    attempts_count: i32,
    message: &'static str,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/answer", post(answer))
        .route("/questions/:id", get(get_question))
        .with_state(state)
}

async fn get_question(
    State(state): State<SharedState>,
    Path(id): Path<i32>,
) -> AppResult<Json<PublicQuestion>> {
    let question = game::find_question(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found_by("Question", "question_id", id))?;
    Ok(Json(PublicQuestion::from(&question)))
}

/// The interaction that handed `question_id` out in this session.
fn answer_target(interactions: &[PlayerInteraction], question_id: i32) -> AppResult<&PlayerInteraction> {
    latest_interaction_for(interactions, question_id)
        .ok_or_else(|| AppError::bad_request("No interaction found for this question in session"))
}

async fn answer(
    State(state): State<SharedState>,
    body: Option<Json<Value>>,
) -> AppResult<Json<AnswerResponse>> {
    let fields = Fields::from_body(body);
    let (Some(session_id), true, Some(user_answer)) = (
        fields.string("session_id"),
        fields.has("question_id"),
        fields.text("user_answer"),
    ) else {
        return Err(AppError::bad_request("session_id, question_id, user_answer required"));
    };
    let question_id = fields
        .int32("question_id")?
        .ok_or_else(|| AppError::bad_request("question_id must be an integer"))?;
    let response_time_ms = fields.int32("response_time_ms")?;

    let mut tx = state.pool.begin().await?;
    let mut session = game::lock_session(&mut tx, &session_id)
        .await?
        .ok_or_else(|| AppError::not_found_by("Session", "session_id", session_id.clone()))?;

    let now = Utc::now();
    ensure_playable(&session, now)?;

    let question = game::find_question(&mut *tx, question_id)
        .await?
        .ok_or_else(|| AppError::not_found_by("Question", "question_id", question_id))?;

    let interactions = game::list_interactions(&mut *tx, &session_id).await?;
    let interaction = answer_target(&interactions, question_id)?;

    let is_correct = answers_match(&user_answer, &question.correct_answer);
    game::record_interaction_answer(
        &mut tx,
        interaction.interaction_id,
        &user_answer,
        is_correct,
        response_time_ms,
    )
    .await?;

    let outcome = session.record_answer(is_correct, now);
    game::save_session_progress(&mut tx, &session).await?;
    tx.commit().await?;

    tracing::info!(
        session_id = %session.session_id,
        question_id,
        is_correct,
        attempts = session.attempts_count,
        "Quiz answer recorded"
    );

    Ok(Json(AnswerResponse {
        is_correct,
        session_completed: session.is_completed,
        attempts_count: session.attempts_count,
        message: match outcome {
            AnswerOutcome::Completed => "Correct! You found the gas holder.",
            AnswerOutcome::Retry => "Incorrect. Try again.",
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn handed_out(id: i64, question_id: Option<i32>) -> PlayerInteraction {
        PlayerInteraction {
            interaction_id: id,
            session_id: "abc".into(),
            npc_id: 1,
            question_id,
            user_answer: None,
            is_correct: None,
            timestamp: Utc::now(),
            response_time_ms: None,
        }
    }

    #[test]
    fn unasked_question_is_rejected() {
        let rows = vec![handed_out(1, None), handed_out(2, Some(3))];
        let err = answer_target(&rows, 8).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No interaction found for this question in session");

        assert_eq!(answer_target(&rows, 3).unwrap().interaction_id, 2);
    }
}
