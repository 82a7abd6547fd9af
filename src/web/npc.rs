use crate::db::game;
use crate::domain::models::{PublicNpc, PublicQuestion};
use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use crate::web::game::{ensure_playable, public_npcs};
use crate::web::payload::Fields;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct InteractNpc {
    #[serde(flatten)]
    npc: PublicNpc,
    is_gas_holder: bool,
}

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
enum InteractResponse {
    Question {
        npc: InteractNpc,
        question: Option<PublicQuestion>,
        message: Option<&'static str>,
    },
    Success {
        npc: InteractNpc,
        message: &'static str,
    },
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_npcs))
        .route("/interact", post(interact))
        .with_state(state)
}

async fn list_npcs(State(state): State<SharedState>) -> AppResult<Json<Vec<PublicNpc>>> {
    Ok(Json(public_npcs(&state).await?))
}

async fn interact(
    State(state): State<SharedState>,
    body: Option<Json<Value>>,
) -> AppResult<Json<InteractResponse>> {
    let fields = Fields::from_body(body);
    let (Some(session_id), true) = (fields.string("session_id"), fields.has("npc_id")) else {
        return Err(AppError::bad_request("session_id and npc_id required"));
    };
    let npc_id = fields
        .int32("npc_id")?
        .ok_or_else(|| AppError::bad_request("npc_id must be an integer"))?;

    let npc = game::find_npc(&state.pool, npc_id)
        .await?
        .ok_or_else(|| AppError::not_found_by("NPC", "npc_id", npc_id))?;

    let mut tx = state.pool.begin().await?;
    let session = game::find_session(&mut *tx, &session_id)
        .await?
        .ok_or_else(|| AppError::not_found_by("Session", "session_id", session_id.clone()))?;

    ensure_playable(&session, Utc::now())?;

    let public = PublicNpc::from(&npc);

    if !session.is_gas_holder(npc.id) {
        game::insert_interaction(&mut tx, &session_id, npc.id, None).await?;
        tx.commit().await?;
        return Ok(Json(InteractResponse::Success {
            npc: InteractNpc { npc: public, is_gas_holder: false },
            message: "NPC interaction successful",
        }));
    }

    let question = game::next_question_for_session(&mut tx, &session_id).await?;
    game::insert_interaction(&mut tx, &session_id, npc.id, question.as_ref().map(|q| q.id)).await?;
    tx.commit().await?;

    tracing::info!(
        session_id = %session_id,
        npc_id = npc.id,
        question_id = ?question.as_ref().map(|q| q.id),
        "Gas holder found, question handed out"
    );

    Ok(Json(InteractResponse::Question {
        npc: InteractNpc { npc: public, is_gas_holder: true },
        message: if question.is_some() { None } else { Some("No questions available") },
        question: question.as_ref().map(PublicQuestion::from),
    }))
}
