use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::quiz_match::MatchRuleError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// A concurrent writer changed the match first.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Caller could not be identified.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller is identified but may not access the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The player already takes part in a pending or active match.
    #[error("player already takes part in an open match")]
    AlreadyInMatch,
    /// The player has no active match to answer in.
    #[error("player has no active match")]
    NoActiveMatch,
    /// Every question of the match was already answered by the player.
    #[error("player has no question left to answer")]
    NoActiveQuestion,
    /// The grace window closed before the submission arrived.
    #[error("match timed out")]
    MatchTimedOut,
    /// The question bank cannot fill a match.
    #[error("not enough published questions: {available} available, {required} required")]
    InsufficientQuestions { available: usize, required: usize },
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } => ServiceError::Conflict(err.to_string()),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<MatchRuleError> for ServiceError {
    fn from(err: MatchRuleError) -> Self {
        match err {
            MatchRuleError::NotActive => ServiceError::NoActiveMatch,
            MatchRuleError::NoActiveQuestion => ServiceError::NoActiveQuestion,
            MatchRuleError::NotAParticipant(_) => ServiceError::Forbidden(err.to_string()),
            MatchRuleError::AlreadySeated(_) => ServiceError::AlreadyInMatch,
            MatchRuleError::WrongQuestionCount { expected, actual } => {
                ServiceError::InsufficientQuestions {
                    available: actual,
                    required: expected,
                }
            }
            MatchRuleError::Transition(invalid) => ServiceError::Conflict(invalid.to_string()),
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
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Operation refused for the authenticated caller.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            err @ (ServiceError::AlreadyInMatch
            | ServiceError::NoActiveMatch
            | ServiceError::NoActiveQuestion
            | ServiceError::MatchTimedOut) => AppError::Forbidden(err.to_string()),
            err @ ServiceError::InsufficientQuestions { .. } => AppError::Conflict(err.to_string()),
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
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn match_rule_errors_map_to_forbidden() {
        for err in [
            ServiceError::AlreadyInMatch,
            ServiceError::NoActiveMatch,
            ServiceError::NoActiveQuestion,
            ServiceError::MatchTimedOut,
            ServiceError::Forbidden("not yours".into()),
        ] {
            assert_eq!(status_of(err), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn remaining_errors_map_to_their_status() {
        assert_eq!(
            status_of(ServiceError::InsufficientQuestions {
                available: 2,
                required: 5
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::NotFound("match".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(ServiceError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Unauthorized("who".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn storage_conflict_is_not_reported_as_outage() {
        let err: ServiceError = StorageError::conflict(uuid::Uuid::new_v4(), 3).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
