//! Error types for the inference service.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_backend::BackendError;
use parley_protocol::ErrorBody;
use std::time::Duration;
use thiserror::Error;

/// Request-level failures, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("model not loaded")]
    NotReady,
    #[error("messages must not be empty")]
    EmptyMessages,
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
    #[error("inference failed: {0}")]
    InferenceFailed(#[source] BackendError),
    #[error("deadline exceeded: generation did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::EmptyMessages => StatusCode::BAD_REQUEST,
            ServiceError::InvalidBody(rejection) => rejection.status(),
            ServiceError::InferenceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

/// Failures that stop the service from ever serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("model load failed: {0}")]
    Load(#[from] BackendError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
