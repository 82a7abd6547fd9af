use crate::error::{AppError, AppResult};
use crate::services::jokes::{Joke, JokeError, JokeStore, Reaction};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};

impl From<JokeError> for AppError {
    fn from(err: JokeError) -> Self {
        match err {
            JokeError::NotFound(id) => AppError::not_found_by("Joke", "id", id),
            other => AppError::Internal(other.into()),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/count", get(count))
        .route("/random", get(random))
        .route("/favorite", get(favorite))
        .route("/jeered", get(jeered))
        .route("/:id", get(get_one))
        .route("/:id/haha", put(haha))
        .route("/:id/boohoo", put(boohoo))
        .with_state(state)
}

/// File access blocks, so every store call runs on the blocking pool.
async fn with_store<T, F>(state: &SharedState, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&JokeStore) -> Result<T, JokeError> + Send + 'static,
{
    let store = state.jokes.clone();
    Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
}

fn present(joke: Option<Joke>) -> AppResult<Json<Joke>> {
    joke.map(Json).ok_or_else(|| AppError::not_found("Joke"))
}

async fn list(State(state): State<SharedState>) -> AppResult<Json<Vec<Joke>>> {
    Ok(Json(with_store(&state, |s| s.all()).await?))
}

async fn count(State(state): State<SharedState>) -> AppResult<Json<Value>> {
    let count = with_store(&state, |s| s.count()).await?;
    Ok(Json(json!({ "count": count })))
}

async fn random(State(state): State<SharedState>) -> AppResult<Json<Joke>> {
    present(with_store(&state, |s| s.random()).await?)
}

async fn favorite(State(state): State<SharedState>) -> AppResult<Json<Joke>> {
    present(with_store(&state, |s| s.favorite()).await?)
}

async fn jeered(State(state): State<SharedState>) -> AppResult<Json<Joke>> {
    present(with_store(&state, |s| s.jeered()).await?)
}

async fn get_one(State(state): State<SharedState>, Path(id): Path<usize>) -> AppResult<Json<Joke>> {
    Ok(Json(with_store(&state, move |s| s.get(id)).await?))
}

async fn haha(State(state): State<SharedState>, Path(id): Path<usize>) -> AppResult<Json<Value>> {
    vote(&state, id, Reaction::Haha).await
}

async fn boohoo(State(state): State<SharedState>, Path(id): Path<usize>) -> AppResult<Json<Value>> {
    vote(&state, id, Reaction::Boohoo).await
}

async fn vote(state: &SharedState, id: usize, reaction: Reaction) -> AppResult<Json<Value>> {
    let total = with_store(state, move |s| s.vote(id, reaction)).await?;
    tracing::debug!(joke_id = id, ?reaction, total, "Joke vote recorded");
    let field = match reaction {
        Reaction::Haha => "haha",
        Reaction::Boohoo => "boohoo",
    };
    Ok(Json(json!({ "id": id, field: total })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn missing_joke_maps_to_not_found() {
        let err: AppError = JokeError::NotFound(42).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn corrupt_file_is_internal() {
        let json_err = serde_json::from_str::<Vec<Joke>>("{").unwrap_err();
        let err: AppError = JokeError::Json(json_err).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
