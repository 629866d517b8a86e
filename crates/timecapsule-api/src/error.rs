use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use timecapsule_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Admin access denied")]
    Forbidden,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Email provider error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the log.
        if let Self::Internal(detail) = &self {
            error!("request failed: {}", detail);
        }

        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            details: match self {
                Self::Validation(details) => details,
                _ => Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}
