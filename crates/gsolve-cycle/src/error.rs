//! Error types for the compute request cycle
//!
//! Every failure is terminal for the current cycle only:
//! - Transport failures (non-success status, network, timeout)
//! - Protocol failures (missing or malformed response structure)
//! - Decode failures (geometry decoder faults)
//! - Cancellation (viewer teardown)

use gsolve_schema::ProtocolError;
use gsolve_transport::TransportError;

/// Fault raised by the geometry-decoding collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DecodeFault {
    message: String,
}

impl DecodeFault {
    /// Create a fault
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Fault description
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main cycle error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CycleError {
    /// Solving service unreachable or answered with a failure status
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response lacks expected structure
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A geometry record could not be decoded
    #[error("decode error in record {index}: {fault}")]
    Decode {
        index: usize,
        #[source]
        fault: DecodeFault,
    },

    /// Viewer torn down while the cycle was in flight
    #[error("cycle cancelled")]
    Cancelled,
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `TransportError`
    Transport,
    /// `ProtocolError`
    Protocol,
    /// `DecodeError`
    Decode,
    /// Teardown
    Cancelled,
}

impl CycleError {
    /// Classify the error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Check if triggering another cycle could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Protocol(_) | Self::Decode { .. } | Self::Cancelled => false,
        }
    }
}

/// Export failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// No geometry has been displayed yet
    #[error("nothing displayed to export")]
    NothingDisplayed,

    /// Decoder could not serialize the displayed geometry
    #[error("serialization failed: {0}")]
    Serialize(#[source] DecodeFault),

    /// Sink could not store the artifact
    #[error("export sink failed: {0}")]
    Sink(String),
}
