use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::invitations::InvitationError;
use crate::services::registration::RegistrationError;

/// Generic denial shown for every failed redemption.
pub const INVALID_INVITATION_MESSAGE: &str = "Invalid or expired invitation code.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Redemption denied. The message is always the generic one.
    #[error("Invalid invitation")]
    InvalidInvitation,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::InvalidInvitation => (
                StatusCode::BAD_REQUEST,
                "invalid_invitation",
                INVALID_INVITATION_MESSAGE.into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// One message for a set of field errors: the message itself when there is
/// a single error, a count otherwise.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .collect();

    if messages.len() == 1 {
        messages.remove(0)
    } else {
        format!("{} validation errors", messages.len())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(validation_message(&errors))
    }
}

impl From<InvitationError> for ApiError {
    fn from(err: InvitationError) -> Self {
        match err {
            InvitationError::Unauthenticated => {
                ApiError::Unauthorized("Authentication required".into())
            }
            InvitationError::Forbidden => {
                ApiError::Forbidden("Only mentors can manage invitations".into())
            }
            InvitationError::Validation(msg) => ApiError::Validation(msg),
            InvitationError::DuplicateEmail => ApiError::Conflict(
                "An invitation for this email is already pending. Resend the existing invitation instead."
                    .into(),
            ),
            InvitationError::NotFound => ApiError::NotFound("Invitation not found".into()),
            InvitationError::InvalidState => {
                ApiError::Conflict("Invitation has already been used".into())
            }
            InvitationError::CodeGenerationExhausted(attempts) => ApiError::Internal(format!(
                "could not generate a unique invitation code after {} attempts",
                attempts
            )),
            InvitationError::Store(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::InvalidOrExpired => ApiError::InvalidInvitation,
            RegistrationError::Validation(msg) => ApiError::Validation(msg),
            RegistrationError::EmailTaken => {
                ApiError::Conflict("An account with this email already exists".into())
            }
            RegistrationError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
