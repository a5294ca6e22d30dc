use thiserror::Error;

/// Every failure the backend client can surface.
///
/// `Clone`: a failed coalesced request is handed to every waiting caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Builds a status error from a best-effort error payload.
    ///
    /// Uses the payload's `error` field when present, otherwise the generic
    /// `HTTP error! status: <code>` message.
    pub fn from_status(status: u16, payload: Option<&serde_json::Value>) -> Self {
        let message = payload
            .and_then(|p| p.get("error"))
            .and_then(|e| e.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));
        ApiError::Status { status, message }
    }

    /// Transient failures that a retry policy may try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Timeout(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_error_uses_server_message() {
        let payload = json!({"error": "Gemini API key missing"});
        let err = ApiError::from_status(500, Some(&payload));
        assert_eq!(err.to_string(), "Gemini API key missing");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_status_error_falls_back_to_code() {
        let err = ApiError::from_status(404, None);
        assert_eq!(err.to_string(), "HTTP error! status: 404");

        let payload = json!({"detail": "not here"});
        let err = ApiError::from_status(404, Some(&payload));
        assert_eq!(err.to_string(), "HTTP error! status: 404");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Transport("connection refused".into()).is_retryable());
        assert!(ApiError::Timeout(30).is_retryable());
        assert!(ApiError::from_status(503, None).is_retryable());
        assert!(ApiError::from_status(429, None).is_retryable());
        assert!(!ApiError::from_status(404, None).is_retryable());
        assert!(!ApiError::Decode("eof".into()).is_retryable());
    }
}
