use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Language model error: {0}")]
    LlmError(String),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Refinement failed: {0}")]
    RefinementError(String),

    #[error("Persistence failed: {0}")]
    PersistenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::LlmError(_) => StatusCode::BAD_GATEWAY,
            AppError::ExtractionError(_) => StatusCode::BAD_GATEWAY,
            AppError::RefinementError(_) => StatusCode::BAD_GATEWAY,
            AppError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Re-labels a model failure that happened while refining content.
    pub(crate) fn into_refinement(self) -> Self {
        match self {
            AppError::LlmError(msg) => AppError::RefinementError(msg),
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        response::error::<()>(self.status_code(), self.to_string()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::LlmError(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::PersistenceError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::PersistenceError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
