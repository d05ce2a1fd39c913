use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure classes the backend attaches to non-2xx
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    Unauthorized,
    ThreadNotFound,
    MessageRejected,
    RateLimited,
    Internal,
}

/// Error body of a failed REST call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A failed REST call together with its decoded body.
#[derive(Debug, Error)]
#[error("api error {status} ({code:?}): {message}")]
pub struct ApiException {
    pub status: u16,
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiException {
    pub fn new(status: u16, body: ApiError) -> Self {
        Self {
            status,
            code: body.code,
            message: body.message,
        }
    }
}
