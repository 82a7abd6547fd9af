use crate::services::github::GithubError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{entity} not found")]
    NotFound {
        entity: &'static str,
        key: Option<(&'static str, Value)>,
    },

    #[error("Session expired")]
    SessionExpired(String),

    #[error("Session already completed")]
    SessionCompleted(String),

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        AppError::NotFound { entity, key: None }
    }

    pub fn not_found_by(entity: &'static str, key: &'static str, value: impl Into<Value>) -> Self {
        AppError::NotFound {
            entity,
            key: Some((key, value.into())),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::SessionExpired(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::SessionCompleted(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), Value::String(self.to_string()));
        match self {
            AppError::NotFound { key: Some((k, v)), .. } => {
                body.insert((*k).into(), v.clone());
            }
            AppError::SessionExpired(id) | AppError::SessionCompleted(id) => {
                body.insert("session_id".into(), json!(id));
            }
            AppError::Upstream { status, .. } => {
                body.insert("upstream_status".into(), json!(status));
            }
            _ => {}
        }
        Value::Object(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl From<GithubError> for AppError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Status { status, message } => AppError::Upstream { status, message },
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
        }
        (status, Json(self.body())).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("NPC").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::SessionExpired("s".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::SessionCompleted("s".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Upstream { status: 404, message: "Not Found".into() }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_body_keeps_github_status() {
        let body = AppError::Upstream { status: 422, message: "Validation Failed".into() }.body();
        assert_eq!(body, json!({"error": "Validation Failed", "upstream_status": 422}));
    }

    #[test]
    fn body_carries_lookup_key() {
        let body = AppError::not_found_by("Session", "session_id", "abc").body();
        assert_eq!(body, json!({"error": "Session not found", "session_id": "abc"}));

        let body = AppError::SessionCompleted("abc".into()).body();
        assert_eq!(body, json!({"error": "Session already completed", "session_id": "abc"}));
    }

    #[test]
    fn internal_error_exposes_message() {
        let body = AppError::Internal(anyhow::anyhow!("connection reset")).body();
        assert_eq!(body["error"], "connection reset");
    }
}
