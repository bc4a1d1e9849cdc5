use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced by the enhancement request path
///
/// Each variant maps to one HTTP status; the Display text is what the client
/// sees in `{"detail": ...}` and what gets written to the request log.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// Bad content type, bad filename or malformed form data
    #[error("{0}")]
    InvalidInput(String),
    #[error("File too large. Maximum {max_mb}MB allowed")]
    PayloadTooLarge { max_mb: u64 },
    /// Missing provider credentials
    #[error("{0}")]
    Configuration(String),
    /// Non-success response from the provider; 4xx and 5xx are passed
    /// through, anything else becomes 502
    #[error("{message}")]
    Service { status: u16, message: String },
    #[error("Enhancement timeout. File may be too large.")]
    Timeout,
    #[error("{0}")]
    NotFound(String),
    #[error("Enhancement failed: {0}")]
    Internal(String),
}

impl EnhanceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EnhanceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EnhanceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EnhanceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EnhanceError::Service { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            EnhanceError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            EnhanceError::NotFound(_) => StatusCode::NOT_FOUND,
            EnhanceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for EnhanceError {
    fn from(err: std::io::Error) -> Self {
        EnhanceError::Internal(err.to_string())
    }
}

impl IntoResponse for EnhanceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(serde_json::json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}
