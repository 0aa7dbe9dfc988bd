use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Typed failure taxonomy for the credential/token core.
///
/// The web layer maps these to transport responses in `IntoResponse`;
/// nothing in the core swallows a failure silently.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client input malformed. Always 400-class.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation on registration.
    #[error("{0}")]
    Conflict(String),

    /// Bad username or bad password. Deliberately uninformative about
    /// which check failed.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// No bearer token on a protected request.
    #[error("access token required")]
    MissingToken,

    /// Bad signature, malformed payload or elapsed expiry. The three
    /// causes are never distinguished to the caller.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The password hashing primitive itself failed (e.g. malformed
    /// stored hash). A wrong password is never this variant.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Token(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A store call exceeded its deadline. Transient; the caller may retry.
    #[error("user store timed out")]
    StoreTimeout,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::Hashing(_) | AppError::Token(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::StoreTimeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreTimeout)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal causes are logged here and never detailed to the caller.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));
        (status, body).into_response()
    }
}
