//! Remote API error taxonomy
//!
//! Authorization failures are recoverable: callers fall back to an
//! unauthorized request, a placeholder entity or a bounded retry. Anything
//! else is fatal to the operation that issued the call.

/// Error type for remote API operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request needs credentials the caller does not have
    Authorization(String),
    /// The request itself failed
    Request(String),
    /// The given URL does not identify a subscribable resource
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Whether a fallback path may recover from this error.
    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Authorization(_))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Authorization(detail) => write!(f, "Authorization failed: {}", detail),
            ApiError::Request(detail) => write!(f, "API request failed: {}", detail),
            ApiError::InvalidUrl { url, reason } => {
                write!(f, "Invalid subscription URL {}: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for ApiError {}
