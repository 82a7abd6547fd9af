use crate::domain::trimester::DateRange;
use crate::services::retry::{CappedRetry, MaybeRetry};
use chrono::Utc;
use futures_retry_policies::retry_policies::RetryPolicies;
use futures_retry_policies::tokio::RetryFutureExt;
use reqwest::{header, StatusCode};
use retry_policies::policies::ExponentialBackoff;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const MAX_ATTEMPTS: u32 = 3;
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const RETRY_BUDGET: Duration = Duration::from_secs(90);
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
const SEARCH_PAGE_SIZE: usize = 100;
/// GitHub search never returns more than 1000 results.
const SEARCH_RESULT_CAP: usize = 1000;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("github request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("github returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub uid: String,
    pub start_date: String,
    pub end_date: String,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileLinks {
    pub profile_url: Option<String>,
    pub repos_url: Option<String>,
    pub avatar_url: Option<String>,
    pub blog: Option<String>,
}

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    base_delay: Duration,
}

impl GithubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, GithubError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gasholder-backend/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            base_delay: Duration::from_secs(1),
        })
    }

    pub async fn user(&self, uid: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/users/{uid}"), &[]).await
    }

    pub async fn profile_links(&self, uid: &str) -> Result<ProfileLinks, GithubError> {
        let user = self.user(uid).await?;
        Ok(profile_links_from(&user))
    }

    pub async fn commit_stats(&self, uid: &str, range: &DateRange) -> Result<ActivityStats, GithubError> {
        let q = format!("author:{uid} committer-date:{}..{}", range.start_date, range.end_date);
        self.search_count("/search/commits", uid, range, q).await
    }

    pub async fn pr_stats(&self, uid: &str, range: &DateRange) -> Result<ActivityStats, GithubError> {
        let q = format!("author:{uid} type:pr created:{}..{}", range.start_date, range.end_date);
        self.search_count("/search/issues", uid, range, q).await
    }

    pub async fn issue_stats(&self, uid: &str, range: &DateRange) -> Result<ActivityStats, GithubError> {
        let q = format!("author:{uid} type:issue created:{}..{}", range.start_date, range.end_date);
        self.search_count("/search/issues", uid, range, q).await
    }

    pub async fn issue_comment_stats(&self, uid: &str, range: &DateRange) -> Result<ActivityStats, GithubError> {
        let q = format!("commenter:{uid} updated:{}..{}", range.start_date, range.end_date);
        self.search_count("/search/issues", uid, range, q).await
    }

    /// Comments left by anyone on issues the user opened within the range.
    /// Walks every search page up to GitHub's result cap.
    pub async fn received_issue_comments(&self, uid: &str, range: &DateRange) -> Result<ActivityStats, GithubError> {
        let q = format!("author:{uid} type:issue created:{}..{}", range.start_date, range.end_date);
        let mut total = 0;
        let mut page = 1;
        loop {
            let body = self
                .get_json(
                    "/search/issues",
                    &[
                        ("q", q.clone()),
                        ("per_page", SEARCH_PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            total += sum_comments(&body);
            if !has_next_page(&body, page) {
                break;
            }
            page += 1;
        }
        Ok(ActivityStats {
            uid: uid.to_string(),
            start_date: range.start_date.clone(),
            end_date: range.end_date.clone(),
            total_count: total,
        })
    }

    pub async fn org_users(&self, org: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/orgs/{org}/members"), &[("per_page", "100".into())])
            .await
    }

    pub async fn org_repos(&self, org: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/orgs/{org}/repos"), &[("per_page", "100".into())])
            .await
    }

    async fn search_count(
        &self,
        path: &str,
        uid: &str,
        range: &DateRange,
        q: String,
    ) -> Result<ActivityStats, GithubError> {
        let body = self.get_json(path, &[("q", q), ("per_page", "1".into())]).await?;
        Ok(ActivityStats {
            uid: uid.to_string(),
            start_date: range.start_date.clone(),
            end_date: range.end_date.clone(),
            total_count: body.get("total_count").and_then(Value::as_i64).unwrap_or(0),
        })
    }

    /// GET with retries: transport errors and 5xx back off exponentially, an
    /// exhausted rate limit waits for its reset. At most `MAX_ATTEMPTS` tries.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GithubError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff::builder()
            .retry_bounds(self.base_delay, MAX_BACKOFF)
            .build_with_total_retry_duration_and_max_retries(RETRY_BUDGET)
            .for_task_started_at(Utc::now());
        let policy = CappedRetry::new(RetryPolicies::new(backoff), MAX_ATTEMPTS, MAX_RATE_LIMIT_WAIT);

        let do_request = || self.try_get_json(&url, query);
        do_request.retry(policy).await.map_err(MaybeRetry::into_inner)
    }

    async fn try_get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, MaybeRetry<GithubError>> {
        let mut req = self
            .http
            .get(url)
            .query(query)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| MaybeRetry::MaybeRetry(GithubError::from(e)))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json()
                .await
                .map_err(|e| MaybeRetry::NoRetry(GithubError::from(e)));
        }

        let wait = rate_limit_wait(resp.headers(), unix_now());
        let message = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
        let err = GithubError::Status {
            status: status.as_u16(),
            message,
        };
        Err(classify(status, wait, err))
    }
}

/// Maps a failed response onto the retry policy's view of it.
fn classify<E>(status: StatusCode, rate_limit_wait: Option<Duration>, err: E) -> MaybeRetry<E> {
    let limited = status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS;
    match rate_limit_wait {
        Some(wait) if limited => MaybeRetry::WaitFor(err, wait),
        _ if status.is_server_error() => MaybeRetry::MaybeRetry(err),
        _ => MaybeRetry::NoRetry(err),
    }
}

/// Time left until the rate limit resets, when the remaining quota is zero.
pub fn rate_limit_wait(headers: &header::HeaderMap, now_secs: u64) -> Option<Duration> {
    let header_num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };
    if header_num("x-ratelimit-remaining")? != 0 {
        return None;
    }
    let reset = header_num("x-ratelimit-reset").unwrap_or(now_secs);
    Some(Duration::from_secs(reset.saturating_sub(now_secs) + 1))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn profile_links_from(user: &Value) -> ProfileLinks {
    let field = |key: &str| {
        user.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    ProfileLinks {
        profile_url: field("html_url"),
        repos_url: field("repos_url"),
        avatar_url: field("avatar_url"),
        blog: field("blog"),
    }
}

fn has_next_page(search: &Value, page: usize) -> bool {
    let total = search
        .get("total_count")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(0)
        .min(SEARCH_RESULT_CAP);
    let returned = search
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    returned == SEARCH_PAGE_SIZE && page * SEARCH_PAGE_SIZE < total
}

fn sum_comments(search: &Value) -> i64 {
    search
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.get("comments").and_then(Value::as_i64))
                .sum()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failures_are_classified_for_retry() {
        let wait = Some(Duration::from_secs(5));
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, None, "502"),
            MaybeRetry::MaybeRetry("502")
        );
        assert_eq!(
            classify(StatusCode::FORBIDDEN, wait, "403"),
            MaybeRetry::WaitFor("403", Duration::from_secs(5))
        );
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, wait, "429"),
            MaybeRetry::WaitFor("429", Duration::from_secs(5))
        );
        assert_eq!(classify(StatusCode::FORBIDDEN, None, "403"), MaybeRetry::NoRetry("403"));
        assert_eq!(classify(StatusCode::NOT_FOUND, wait, "404"), MaybeRetry::NoRetry("404"));
    }

    #[test]
    fn search_pages_until_results_run_out() {
        let full_page = |total: u64| {
            json!({"total_count": total, "items": vec![json!({"comments": 1}); SEARCH_PAGE_SIZE]})
        };
        assert!(has_next_page(&full_page(250), 1));
        assert!(has_next_page(&full_page(250), 2));
        assert!(!has_next_page(&full_page(200), 2));
        assert!(!has_next_page(&json!({"total_count": 250, "items": [{"comments": 1}]}), 3));
        assert!(!has_next_page(&full_page(5000), 10));
        assert!(!has_next_page(&json!({}), 1));
    }

    #[test]
    fn rate_limit_wait_only_when_exhausted() {
        let mut headers = header::HeaderMap::new();
        assert_eq!(rate_limit_wait(&headers, 1000), None);

        headers.insert("x-ratelimit-remaining", "12".parse().unwrap());
        assert_eq!(rate_limit_wait(&headers, 1000), None);

        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1030".parse().unwrap());
        assert_eq!(rate_limit_wait(&headers, 1000), Some(Duration::from_secs(31)));

        headers.insert("x-ratelimit-reset", "900".parse().unwrap());
        assert_eq!(rate_limit_wait(&headers, 1000), Some(Duration::from_secs(1)));
    }

    #[test]
    fn profile_links_skip_empty_fields() {
        let user = json!({
            "html_url": "https://github.com/octocat",
            "repos_url": "https://api.github.com/users/octocat/repos",
            "blog": ""
        });
        let links = profile_links_from(&user);
        assert_eq!(links.profile_url.as_deref(), Some("https://github.com/octocat"));
        assert!(links.avatar_url.is_none());
        assert!(links.blog.is_none());
    }

    #[test]
    fn received_comments_are_summed() {
        let body = json!({"total_count": 3, "items": [{"comments": 2}, {"comments": 0}, {"comments": 5}]});
        assert_eq!(sum_comments(&body), 7);
        assert_eq!(sum_comments(&json!({})), 0);
    }

    #[test]
    fn client_trims_base_url() {
        let client = GithubClient::new("https://api.github.com/", None).unwrap();
        assert_eq!(client.base_url, "https://api.github.com");
    }
}
