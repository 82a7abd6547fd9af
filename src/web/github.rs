use crate::db;
use crate::domain::trimester::{self, DateRange};
use crate::error::{AppError, AppResult};
use crate::services::github::{ActivityStats, ProfileLinks};
use crate::state::SharedState;
use crate::web::session::{require_admin, UserSession};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl RangeQuery {
    fn resolve(&self) -> DateRange {
        trimester::resolve_range(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            Local::now().date_naive(),
        )
    }
}

#[derive(Serialize)]
struct AdminCommits {
    uid: String,
    commits: ActivityStats,
}

#[derive(Serialize)]
struct AdminIssues {
    uid: String,
    issues: ActivityStats,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/github/user", get(github_user))
        .route("/github/user/profile_links", get(profile_links))
        .route("/github/user/commits", get(user_commits))
        .route("/github/user/prs", get(user_prs))
        .route("/github/user/issues", get(user_issues))
        .route("/github/user/issue_comments", get(user_issue_comments))
        .route("/github/user/received_issue_comments", get(user_received_issue_comments))
        .route("/github/org/:org_name/users", get(org_users))
        .route("/github/org/:org_name/repos", get(org_repos))
        .route("/commits/:uid", get(admin_user_commits))
        .route("/issues/:uid", get(admin_user_issues))
        .with_state(state)
}

async fn github_user(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
) -> AppResult<Json<Value>> {
    Ok(Json(state.github.user(&user.uid).await?))
}

async fn profile_links(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
) -> AppResult<Json<ProfileLinks>> {
    Ok(Json(state.github.profile_links(&user.uid).await?))
}

async fn user_commits(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<ActivityStats>> {
    Ok(Json(state.github.commit_stats(&user.uid, &range.resolve()).await?))
}

async fn user_prs(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<ActivityStats>> {
    Ok(Json(state.github.pr_stats(&user.uid, &range.resolve()).await?))
}

async fn user_issues(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<ActivityStats>> {
    Ok(Json(state.github.issue_stats(&user.uid, &range.resolve()).await?))
}

async fn user_issue_comments(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<ActivityStats>> {
    Ok(Json(state.github.issue_comment_stats(&user.uid, &range.resolve()).await?))
}

async fn user_received_issue_comments(
    UserSession(user): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<ActivityStats>> {
    Ok(Json(
        state
            .github
            .received_issue_comments(&user.uid, &range.resolve())
            .await?,
    ))
}

async fn org_users(
    State(state): State<SharedState>,
    Path(org_name): Path<String>,
) -> AppResult<Json<Value>> {
    Ok(Json(state.github.org_users(&org_name).await?))
}

async fn org_repos(
    State(state): State<SharedState>,
    Path(org_name): Path<String>,
) -> AppResult<Json<Value>> {
    Ok(Json(state.github.org_repos(&org_name).await?))
}

async fn admin_user_commits(
    UserSession(admin): UserSession,
    State(state): State<SharedState>,
    Path(uid): Path<String>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<AdminCommits>> {
    require_admin(&admin)?;
    let user = db::find_user_by_uid(&state.pool, &uid)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let commits = state.github.commit_stats(&user.uid, &range.resolve()).await?;
    Ok(Json(AdminCommits { uid: user.uid, commits }))
}

async fn admin_user_issues(
    UserSession(admin): UserSession,
    State(state): State<SharedState>,
    Path(uid): Path<String>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<AdminIssues>> {
    require_admin(&admin)?;
    let user = db::find_user_by_uid(&state.pool, &uid)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let issues = state.github.issue_stats(&user.uid, &range.resolve()).await?;
    Ok(Json(AdminIssues { uid: user.uid, issues }))
}
