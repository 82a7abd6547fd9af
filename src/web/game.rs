use crate::db::{self, game};
use crate::domain::models::{GameSession, PlayerInteraction, PublicNpc};
use crate::domain::session::SessionState;
use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use crate::web::payload::Fields;
use crate::web::session::MaybeUserSession;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct StartResponse {
    session_id: String,
    npcs: Vec<PublicNpc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Serialize)]
struct SessionView {
    session: GameSession,
    state: SessionState,
    interacted_npc_ids: Vec<i32>,
    answered_questions: Vec<PlayerInteraction>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/start", post(start_game))
        .route("/session/:session_id", get(get_session))
        .with_state(state)
}

async fn start_game(
    State(state): State<SharedState>,
    MaybeUserSession(current): MaybeUserSession,
    body: Option<Json<Value>>,
) -> AppResult<(StatusCode, Json<StartResponse>)> {
    let fields = Fields::from_body(body);
    let user_id = match current {
        Some(user) => Some(user.id),
        None => fields.int("user_id")?,
    };

    if let Some(uid) = user_id {
        if db::find_user_by_id(&state.pool, uid).await?.is_none() {
            return Err(AppError::not_found_by("User", "user_id", uid));
        }
        if let Some(active) = game::latest_open_session(&state.pool, uid).await? {
            if active.state_at(Utc::now()) == SessionState::Active {
                let npcs = public_npcs(&state).await?;
                tracing::info!(session_id = %active.session_id, user_id = uid, "Resuming game session");
                return Ok((
                    StatusCode::OK,
                    Json(StartResponse {
                        session_id: active.session_id,
                        npcs,
                        start_time: Some(active.start_time),
                        message: Some("Resuming active session"),
                    }),
                ));
            }
        }
    }

    let mut tx = state.pool.begin().await?;
    let gas_holder = game::random_npc(&mut *tx)
        .await?
        .ok_or_else(|| AppError::bad_request("No NPCs available"))?;

    let session = GameSession::new(gas_holder.id, user_id, Utc::now());
    game::insert_session(&mut tx, &session).await?;
    tx.commit().await?;

    tracing::info!(session_id = %session.session_id, user_id = ?user_id, "Started game session");

    let npcs = public_npcs(&state).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartResponse {
            session_id: session.session_id,
            npcs,
            start_time: Some(session.start_time),
            message: None,
        }),
    ))
}

async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<SessionView>> {
    let session = game::find_session(&state.pool, &session_id)
        .await?
        .ok_or_else(|| AppError::not_found_by("Session", "session_id", session_id.clone()))?;

    let now = Utc::now();
    if session.is_expired_at(now) {
        return Err(AppError::SessionExpired(session_id));
    }

    let interactions = game::list_interactions(&state.pool, &session_id).await?;
    let mut interacted_npc_ids: Vec<i32> = interactions.iter().map(|i| i.npc_id).collect();
    interacted_npc_ids.sort_unstable();
    interacted_npc_ids.dedup();

    let answered_questions = interactions
        .into_iter()
        .filter(|i| i.question_id.is_some())
        .collect();

    Ok(Json(SessionView {
        state: session.state_at(now),
        session,
        interacted_npc_ids,
        answered_questions,
    }))
}

/// 409 for a completed session, 403 for an expired one.
pub(crate) fn ensure_playable(session: &GameSession, now: DateTime<Utc>) -> AppResult<()> {
    match session.ensure_playable(now) {
        Ok(()) => Ok(()),
        Err(SessionState::Completed) => Err(AppError::SessionCompleted(session.session_id.clone())),
        Err(_) => Err(AppError::SessionExpired(session.session_id.clone())),
    }
}

pub(crate) async fn public_npcs(state: &SharedState) -> AppResult<Vec<PublicNpc>> {
    let npcs = game::list_npcs(&state.pool).await?;
    Ok(npcs.iter().map(PublicNpc::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn gate_reports_completed_before_expired() {
        let start = Utc::now() - Duration::minutes(45);
        let mut session = GameSession::new(2, None, start);

        let err = ensure_playable(&session, Utc::now()).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        session.record_answer(true, start + Duration::minutes(3));
        let err = ensure_playable(&session, Utc::now()).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn gate_lets_active_sessions_through() {
        let session = GameSession::new(2, Some(1), Utc::now());
        assert!(ensure_playable(&session, Utc::now()).is_ok());
    }
}
