use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::engine::coordinator::AssignmentError;
use crate::store::RepoError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            RepoError::Conflict(msg) => AppError::Conflict(msg),
            RepoError::Unavailable(msg) => AppError::Internal(msg),
        }
    }
}

fn repo_status(err: &RepoError) -> StatusCode {
    match err {
        RepoError::NotFound(_) => StatusCode::NOT_FOUND,
        RepoError::Conflict(_) => StatusCode::CONFLICT,
        RepoError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, step) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::Assignment(AssignmentError::Persistence { step, source }) => {
                (repo_status(source), self.to_string(), Some(step.to_string()))
            }
            AppError::Assignment(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None),
        };

        let body = match step {
            Some(step) => Json(json!({
                "error": message,
                "step": step
            })),
            None => Json(json!({
                "error": message
            })),
        };

        (status, body).into_response()
    }
}
