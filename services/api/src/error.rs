//! services/api/src/error.rs
//!
//! Defines the error types for the API service: `ApiError` for startup
//! failures, `AppError` for failures a request handler reports to the client.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use companion_core::{
    ports::PortError, recommend::RecommendError, service::ServiceError, ValidationError,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for starting the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error building one of the outbound provider clients.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

/// An error returned from a request handler.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed.");
        }
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<PortError> for AppError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(msg) => Self::NotFound(msg),
            PortError::Timeout(_) | PortError::Unavailable(_) | PortError::Denied(_) => {
                Self::Unavailable(e.to_string())
            }
            PortError::Unexpected(msg) => Self::Internal(msg),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::UnknownUser(_) => {
                let detail = "User preferences not found. Please set preferences first.";
                Self::NotFound(detail.to_string())
            }
            ServiceError::NoContext(_) => {
                Self::NotFound("No context found for this user".to_string())
            }
            ServiceError::Validation(e) => e.into(),
            ServiceError::Port(e) => e.into(),
        }
    }
}

impl From<RecommendError> for AppError {
    fn from(e: RecommendError) -> Self {
        match e {
            RecommendError::Unavailable(_) => Self::Unavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::UnknownUser("u".into()), StatusCode::NOT_FOUND),
            (ServiceError::NoContext("u".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::Validation(ValidationError::Hour(25)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::Port(PortError::Unexpected("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
        assert_eq!(
            AppError::from(RecommendError::Unavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
