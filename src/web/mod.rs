pub mod analytics;
pub mod candyland;
pub mod game;
pub mod github;
pub mod health;
pub mod jokes;
pub mod npc;
pub mod payload;
pub mod quiz;
pub mod session;

use crate::state::SharedState;
use axum::Router;

pub fn routes(state: SharedState) -> Router {
    let api = Router::new()
        .nest("/health", health::router(state.clone()))
        .nest("/game", game::router(state.clone()))
        .nest("/npc", npc::router(state.clone()))
        .nest("/quiz", quiz::router(state.clone()))
        .nest("/analytics", analytics::router(state.clone()))
        .nest("/candyland", candyland::router(state.clone()))
        .nest("/jokes", jokes::router(state));

    Router::new().nest("/api", api)
}
