use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// How a failed remote call is treated by the retry wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// No response, a 5xx response, or a timeout. Retried with backoff.
    ServerUnavailable,
    /// 400 or 401. Never retried.
    AuthRejected,
    /// Anything else. Never retried.
    Other,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("Request rejected ({status}): {message}")]
    AuthRejected { status: u16, message: String },

    #[error("Please log in to continue")]
    Unauthorized,

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Service is currently unavailable after {attempts} attempts, please try again later")]
    ServiceUnavailable { attempts: u32 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote store returned status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds the error for a non-success HTTP status from the remote store
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 401 => AppError::AuthRejected { status, message },
            404 => AppError::NotFound(message),
            409 => AppError::Conflict(message),
            s if s >= 500 => AppError::ServerUnavailable(format!("status {}: {}", s, message)),
            _ => AppError::Remote { status, message },
        }
    }

    /// Classifies the error for the retry wrapper
    pub fn failure_class(&self) -> FailureClass {
        match self {
            AppError::ServerUnavailable(_) => FailureClass::ServerUnavailable,
            AppError::AuthRejected { .. } => FailureClass::AuthRejected,
            AppError::HttpClient(e) => match e.status() {
                Some(status) if status.as_u16() == 400 || status.as_u16() == 401 => {
                    FailureClass::AuthRejected
                }
                Some(status) if status.is_server_error() => FailureClass::ServerUnavailable,
                Some(_) => FailureClass::Other,
                // No response at all (connect refused, reset, timed out)
                None if e.is_decode() || e.is_builder() => FailureClass::Other,
                None => FailureClass::ServerUnavailable,
            },
            _ => FailureClass::Other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized | AppError::AuthRejected { .. } => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ServerUnavailable(_) | AppError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Remote { .. } | AppError::Decode(_) | AppError::HttpClient(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Storage(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
