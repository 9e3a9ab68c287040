use shared::error::ErrorBody;
use thiserror::Error;

pub const CONNECT_MESSAGE: &str =
    "Cannot connect to the server. Please check that the API is running.";
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "File is too large. Please upload a smaller file.";
pub const UNSUPPORTED_MEDIA_MESSAGE: &str =
    "Unsupported file type. Please upload a supported format.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const UNAVAILABLE_MESSAGE: &str = "Service unavailable. The model may still be loading.";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("cannot connect to prediction api: {0}")]
    Connect(String),
    #[error("prediction request timed out")]
    Timeout,
    #[error("prediction api returned HTTP {status}")]
    Status {
        status: u16,
        body: Option<ErrorBody>,
    },
    #[error("failed to decode prediction response: {0}")]
    Decode(String),
    #[error("{0}")]
    Transport(String),
}

impl GatewayError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_connect() {
            GatewayError::Connect(err.to_string())
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether an automatic resubmission has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Connect(_) | GatewayError::Timeout => true,
            GatewayError::Status { status, .. } => *status >= 500,
            GatewayError::Decode(_) | GatewayError::Transport(_) => false,
        }
    }
}

/// Reduces any gateway failure to a single display string.
pub fn format_api_error(err: &GatewayError, default: &str) -> String {
    if let GatewayError::Status {
        body: Some(body), ..
    } = err
    {
        if let Some(message) = body.message() {
            return message;
        }
    }

    match err {
        GatewayError::Connect(_) => CONNECT_MESSAGE.to_string(),
        GatewayError::Timeout => TIMEOUT_MESSAGE.to_string(),
        GatewayError::Status { status, .. } => match status {
            413 => PAYLOAD_TOO_LARGE_MESSAGE.to_string(),
            415 => UNSUPPORTED_MEDIA_MESSAGE.to_string(),
            500 => SERVER_ERROR_MESSAGE.to_string(),
            503 => UNAVAILABLE_MESSAGE.to_string(),
            _ => default.to_string(),
        },
        GatewayError::Transport(message) if !message.trim().is_empty() => message.clone(),
        GatewayError::Transport(_) | GatewayError::Decode(_) => default.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
