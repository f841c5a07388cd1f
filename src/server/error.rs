//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::ModelUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ServerError::ModelUnavailable => tracing::error!("Request rejected, no model loaded"),
            ServerError::InvalidInput(reason) => tracing::debug!(reason = %reason, "Invalid prediction input"),
            _ => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServerError::ModelUnavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ServerError::InvalidInput("bad".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_messages() {
        assert_eq!(ServerError::ModelUnavailable.to_string(), "Model not loaded");
        assert_eq!(
            ServerError::InvalidInput("Expected 64 features, got 3".into()).to_string(),
            "Expected 64 features, got 3"
        );
    }
}
