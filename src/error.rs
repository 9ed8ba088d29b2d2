use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::store::StoreError;

/// JSON body used for every error (and several success) responses.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The error taxonomy of the HTTP API.
///
/// `InvalidCredentials` and `InvalidResetToken` are deliberately generic: an
/// unknown email and a wrong password produce the same response, and an
/// expired reset token is indistinguishable from one that never existed.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input. The message is safe to show the client.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("User already exists with this email")]
    DuplicateEmail,

    #[error("Email service not configured. Please contact support.")]
    EmailNotConfigured,

    #[error("Failed to send password reset email. Please try again later.")]
    EmailSendFailed,

    #[error("Route not found")]
    NotFound,

    /// Anything unexpected. The cause is logged server-side only.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidCredentials
            | ApiError::InvalidResetToken
            | ApiError::DuplicateEmail => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::EmailNotConfigured
            | ApiError::EmailSendFailed
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(cause) => {
                error!(error = %cause, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(MessageResponse { message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::NotFound => {
                ApiError::Internal(anyhow::anyhow!("store row vanished mid-operation"))
            }
            StoreError::Backend(cause) => ApiError::Internal(cause),
        }
    }
}
