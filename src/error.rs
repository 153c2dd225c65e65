use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    /// The gateway answered and refused to open a session.
    #[error("Payment gateway rejected the session: {0}")]
    GatewayInitiationFailed(String),

    /// Network failure or timeout talking to the gateway.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The gateway's validation record disagrees with what we expected.
    #[error("Transaction validation mismatch: {0}")]
    ValidationMismatch(String),

    #[error("Email error: {0}")]
    Email(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, details) = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                ("Database error occurred".to_string(), None)
            }
            AppError::NotFound(msg) => (msg, None),
            AppError::Unauthorized => ("Unauthorized".to_string(), None),
            AppError::Forbidden => ("Forbidden".to_string(), None),
            AppError::Conflict(msg) => (msg, None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
            AppError::Validation(msg) => (msg, None),
            AppError::InvalidInput(errors) => (
                "Validation failed".to_string(),
                serde_json::to_value(&errors).ok(),
            ),
            AppError::GatewayInitiationFailed(msg) => (msg, None),
            AppError::GatewayUnavailable(ref msg) => {
                tracing::error!("Payment gateway unavailable: {}", msg);
                ("Payment gateway is unavailable".to_string(), None)
            }
            AppError::ValidationMismatch(msg) => (msg, None),
            AppError::Email(ref msg) => {
                tracing::error!("Email error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let mut body = json!({
            "success": false,
            "message": message,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::GatewayInitiationFailed(_)
            | AppError::ValidationMismatch(_) => StatusCode::BAD_REQUEST,
            AppError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) | AppError::Email(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
