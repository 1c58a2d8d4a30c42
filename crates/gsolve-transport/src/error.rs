//! Transport errors

use gsolve_schema::EncodeError;
use std::time::Duration;

/// Failure to obtain a success response from the solving service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Non-success HTTP status
    #[error("solve failed with status {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Connection or I/O failure
    #[error("network failure: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("request timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Request could not be rendered for this endpoint
    #[error("request encoding failed: {0}")]
    Encode(#[from] EncodeError),

    /// Transport misconfigured
    #[error("invalid transport configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Check if a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Encode(_) | Self::Config(_) => false,
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: timeout }
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
