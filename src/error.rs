use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Reasons a seat could not be admitted into a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// No room is registered for the match.
    #[error("no room for match `{0}`")]
    NotFound(String),
    /// Both seats are already occupied.
    #[error("room is full")]
    RoomFull,
    /// The room started or finished and stopped admitting seats.
    #[error("room is locked")]
    RoomLocked,
    /// The room task is gone.
    #[error("room closed")]
    RoomClosed,
}

impl JoinError {
    /// Whether another attempt may succeed after a pause.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JoinError::NotFound(_) | JoinError::RoomClosed)
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The match already has two occupants.
    #[error("room with matchId: {0} is full")]
    RoomFull(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The room task stopped answering.
    #[error("room unavailable: {0}")]
    RoomUnavailable(String),
}

impl From<JoinError> for ServiceError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::NotFound(match_id) => {
                ServiceError::NotFound(format!("room for match `{match_id}`"))
            }
            JoinError::RoomFull | JoinError::RoomLocked => ServiceError::RoomFull(err.to_string()),
            JoinError::RoomClosed => ServiceError::RoomUnavailable(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::RoomFull(match_id) => {
                AppError::BadRequest(format!("Room with matchId: {match_id} is full"))
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::RoomUnavailable(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
