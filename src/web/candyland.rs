use crate::db::{self, candyland};
use crate::domain::badge::BadgeGrant;
use crate::domain::models::{BadgeStats, CandylandScore, UserRole};
use crate::domain::rarity::badge_rarity;
use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use crate::web::session::{
    self, clear_session_cookie, require_admin, session_cookie, verify_password, UserSession,
};
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;

const DEFAULT_BADGE_ICON: &str = "🏅";

#[derive(Debug, Default, Deserialize)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CharacterPayload {
    character_type: Option<String>,
    character_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScorePayload {
    score_type: Option<String>,
    score_value: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct BadgePayload {
    badge_name: Option<String>,
    badge_icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AttemptPayload {
    game_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RarityQuery {
    badge_name: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    username: String,
    role: UserRole,
    token: String,
    character_type: Option<String>,
    character_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct BadgeView {
    name: String,
    icon: String,
    earned: i64,
    rarity: f64,
}

fn body<T: Default>(payload: Option<Json<T>>) -> T {
    payload.map(|Json(p)| p).unwrap_or_default()
}

fn message(text: impl Into<String>) -> Json<Value> {
    Json(json!({ "message": text.into() }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/save_character", post(save_character))
        .route("/save_score", post(save_score))
        .route("/get_scores", get(get_scores))
        .route("/save_badge", post(save_badge))
        .route("/get_badges", get(get_badges))
        .route("/record_attempt", post(record_attempt))
        .route("/badge_rarity", get(badge_rarity_view))
        .route("/clear_mock_data", post(clear_mock_data))
        .with_state(state)
}

async fn signup(
    State(state): State<SharedState>,
    payload: Option<Json<Credentials>>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let creds = body(payload);
    let password = creds.password.filter(|p| !p.is_empty());
    let (Some(username), Some(password)) = (non_empty(creds.username), password) else {
        return Err(AppError::bad_request("Username and password required"));
    };

    let hash = session::hash_password(&password)?;
    let created = db::create_user(&state.pool, &username, &username, &hash, UserRole::User).await?;
    if created.is_none() {
        return Err(AppError::bad_request("Username taken"));
    }

    tracing::info!(uid = %username, "Candyland user created");
    Ok((StatusCode::CREATED, message("User created")))
}

async fn login(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    payload: Option<Json<Credentials>>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    let ip = addr.ip().to_string();
    if let Err(wait) = state.login_limiter.check(&ip).await {
        tracing::warn!("Login rate limit exceeded for IP: {} (retry in {}s)", ip, wait.as_secs());
        return Err(AppError::RateLimited);
    }

    let creds = body(payload);
    let invalid = || AppError::Unauthorized("Invalid creds".into());
    let (Some(username), Some(password)) = (non_empty(creds.username), creds.password) else {
        return Err(invalid());
    };

    let user = db::find_user_by_uid(&state.pool, &username)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&password, &user.hash) {
        return Err(invalid());
    }

    let token = session::sign_session(user.id, &user.role, &state.session_key)
        .map_err(|e| AppError::Internal(e.into()))?;
    let character = candyland::find_character(&state.pool, user.id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie(&token, state.secure_cookies)?);

    tracing::info!(user_id = user.id, "User logged in");

    let (character_type, character_name) = character
        .map(|c| (c.character_type, c.character_name))
        .unwrap_or((None, None));

    Ok((
        headers,
        Json(LoginResponse {
            message: "Login successful",
            username: user.uid,
            role: user.role,
            token,
            character_type,
            character_name,
        }),
    ))
}

async fn logout(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
) -> AppResult<(HeaderMap, Json<Value>)> {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie(state.secure_cookies)?);
    tracing::info!(user_id = user.id, "User logged out");
    Ok((headers, message("Logged out")))
}

async fn save_character(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    payload: Option<Json<CharacterPayload>>,
) -> AppResult<Json<Value>> {
    let p = body(payload);
    candyland::upsert_character(
        &state.pool,
        user.id,
        p.character_type.as_deref(),
        p.character_name.as_deref(),
    )
    .await?;
    Ok(message("Character saved!"))
}

async fn save_score(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    payload: Option<Json<ScorePayload>>,
) -> AppResult<Json<Value>> {
    let p = body(payload);
    let (Some(score_type), Some(score_value)) = (non_empty(p.score_type), p.score_value) else {
        return Err(AppError::bad_request("Missing data"));
    };
    candyland::upsert_score(&state.pool, user.id, &score_type, score_value).await?;
    Ok(message("Score saved"))
}

async fn get_scores(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
) -> AppResult<Json<Vec<CandylandScore>>> {
    Ok(Json(candyland::list_scores(&state.pool, user.id).await?))
}

async fn save_badge(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    payload: Option<Json<BadgePayload>>,
) -> AppResult<Json<Value>> {
    let p = body(payload);
    let Some(badge_name) = non_empty(p.badge_name) else {
        return Err(AppError::bad_request("Badge name required"));
    };
    let icon = non_empty(p.badge_icon).unwrap_or_else(|| DEFAULT_BADGE_ICON.to_string());

    let mut tx = state.pool.begin().await?;
    let badge = candyland::ensure_badge(&mut tx, &badge_name, &icon).await?;
    let grant = candyland::grant_badge(&mut tx, user.id, badge.id).await?;
    tx.commit().await?;

    if grant == BadgeGrant::Awarded {
        tracing::info!(user_id = user.id, badge = %badge_name, "Badge awarded");
    }
    Ok(message(grant.message(&badge_name)))
}

async fn get_badges(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
) -> AppResult<Json<Vec<BadgeView>>> {
    let rows = candyland::user_badge_stats(&state.pool, user.id).await?;
    let total_users = db::count_users(&state.pool).await?;
    Ok(Json(rows.into_iter().map(|r| badge_view(r, total_users)).collect()))
}

async fn record_attempt(
    UserSession(_user): UserSession,
    State(state): State<SharedState>,
    payload: Option<Json<AttemptPayload>>,
) -> AppResult<Json<Value>> {
    let Some(game_name) = non_empty(body(payload).game_name) else {
        return Err(AppError::bad_request("game_name required"));
    };
    let attempts = candyland::record_attempt(&state.pool, &game_name).await?;
    Ok(Json(json!({ "game_name": game_name, "attempts": attempts })))
}

async fn badge_rarity_view(
    State(state): State<SharedState>,
    Query(query): Query<RarityQuery>,
) -> AppResult<Json<Value>> {
    let name = query.badge_name.as_deref().filter(|n| !n.is_empty());
    let rows = candyland::badge_stats(&state.pool, name).await?;
    let total_users = db::count_users(&state.pool).await?;

    match name {
        Some(n) => {
            let row = rows
                .into_iter()
                .next()
                .ok_or_else(|| AppError::not_found_by("Badge", "badge_name", n))?;
            Ok(Json(json!(badge_view(row, total_users))))
        }
        None => {
            let views: Vec<BadgeView> = rows.into_iter().map(|r| badge_view(r, total_users)).collect();
            Ok(Json(json!(views)))
        }
    }
}

async fn clear_mock_data(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
) -> AppResult<Json<Value>> {
    require_admin(&user)?;
    let removed = candyland::clear_attempt_counters(&state.pool).await?;
    tracing::warn!(user_id = user.id, removed, "Cleared badge attempt counters");
    Ok(Json(json!({
        "message": "Attempt counters cleared",
        "removed": removed,
    })))
}

fn badge_view(row: BadgeStats, total_users: i64) -> BadgeView {
    BadgeView {
        rarity: badge_rarity(row.earned, row.attempts.map(i64::from), total_users),
        earned: row.earned,
        name: row.badge_name,
        icon: row.badge_icon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(earned: i64, attempts: Option<i32>) -> BadgeStats {
        BadgeStats {
            id: 1,
            badge_name: "Perfect Morning".into(),
            badge_icon: "🏆".into(),
            earned,
            attempts,
        }
    }

    #[test]
    fn badge_view_uses_counter_then_users() {
        assert_eq!(badge_view(stats(2, Some(8)), 4).rarity, 25.0);
        assert_eq!(badge_view(stats(2, None), 4).rarity, 50.0);
        assert_eq!(badge_view(stats(2, None), 4).name, "Perfect Morning");
    }

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" Gumdrop ".into())).as_deref(), Some("Gumdrop"));
        assert_eq!(non_empty(None), None);
    }
}
