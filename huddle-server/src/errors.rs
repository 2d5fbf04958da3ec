use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use huddle_collab::{AiError, LifecycleError, StoreError};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    #[error("No transcript is available for this session")]
    NoTranscriptAvailable,
    #[error("A collaborator timed out")]
    CollaboratorTimeout,
    #[error("A collaborator failed: {0}")]
    CollaboratorFailed(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::NoTranscriptAvailable => StatusCode::NOT_FOUND,
            Self::CollaboratorTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::CollaboratorFailed(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}

impl From<AiError> for ServerError {
    fn from(value: AiError) -> Self {
        match value {
            AiError::Timeout => Self::CollaboratorTimeout,
            AiError::TranscriptionFailed(reason) => Self::CollaboratorFailed(reason),
            AiError::SummarizationFailed(reason) => Self::CollaboratorFailed(reason),
        }
    }
}

impl From<LifecycleError> for ServerError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::NoTranscriptAvailable => Self::NoTranscriptAvailable,
            LifecycleError::Ai(err) => err.into(),
            LifecycleError::Store(err) => err.into(),
        }
    }
}
