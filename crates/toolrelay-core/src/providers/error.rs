//! Provider error types

use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Rate limited
    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Create an API error
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify a backend failure from its rendered message.
    ///
    /// The backend client reports HTTP failures as text, so the status is
    /// recovered from well-known markers.
    pub fn from_backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("429") || lower.contains("rate limit") {
            Self::rate_limited(provider, message)
        } else if lower.contains("invalid_request_error")
            || lower.contains("status: 400")
            || lower.contains("400 bad request")
        {
            Self::api_error(provider, 400, message)
        } else if lower.contains("401") || lower.contains("unauthorized") {
            Self::api_error(provider, 401, message)
        } else {
            Self::api_error(provider, 500, message)
        }
    }

    /// The backend rejected the shape of the request it was sent
    pub fn is_input_format(&self) -> bool {
        matches!(self, Self::ApiError { status: 400, .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_classification() {
        let bad = ProviderError::from_backend(
            "openai",
            "Web call failed. Cause: {\"error\": {\"type\": \"invalid_request_error\"}}",
        );
        assert!(bad.is_input_format());

        let limited = ProviderError::from_backend("openai", "HTTP 429 Too Many Requests");
        assert!(matches!(limited, ProviderError::RateLimited { .. }));

        let other = ProviderError::from_backend("openai", "connection reset");
        assert!(matches!(other, ProviderError::ApiError { status: 500, .. }));
        assert!(!other.is_input_format());
    }

    #[test]
    fn test_display() {
        let err = ProviderError::api_error("anthropic", 400, "messages: field required");
        assert_eq!(
            err.to_string(),
            "anthropic API error (400): messages: field required"
        );
    }
}
