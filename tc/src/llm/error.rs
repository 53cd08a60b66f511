//! Planner error types

use std::time::Duration;
use thiserror::Error;

/// Errors from a planner call
///
/// Every variant is fatal to the chat turn that made the call; the client
/// retries the transient ones before giving up.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Planner rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Planner API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid planner response: {0}")]
    InvalidResponse(String),

    #[error("Planner request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => matches!(status, 408 | 500 | 502 | 503 | 504),
            Self::InvalidResponse(_) | Self::MissingApiKey(_) | Self::Json(_) => false,
        }
    }

    /// Delay the server asked for before retrying, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> LlmError {
        LlmError::ApiError {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_transient_statuses_retry() {
        assert!(api(503).is_retryable());
        assert!(api(408).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::InvalidResponse("no choices".to_string()).is_retryable());
    }

    #[test]
    fn test_rate_limit_carries_delay() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(2),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(api(500).retry_after(), None);
    }

    #[test]
    fn test_missing_api_key_names_variable() {
        let msg = LlmError::MissingApiKey("OPENAI_API_KEY".to_string()).to_string();
        assert!(msg.contains("OPENAI_API_KEY"));
    }
}
