//! Error types for the messaging layer.

use std::time::Duration;

use corelib::{TransportError, WireError};

/// Result type alias for the messaging layer.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Errors a caller of the messaging layer can observe.
///
/// Decode failures of *other* frames never show up here: the receive loop
/// logs and discards them.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// No matching reply arrived before the deadline. Recoverable: the
    /// caller may retry with a new correlation id.
    #[error("no reply to {correlation_id} within {after:?}")]
    Timeout {
        correlation_id: String,
        after: Duration,
    },

    /// A wait for this correlation id is already outstanding.
    #[error("correlation id {0:?} already has an outstanding wait")]
    DuplicateCorrelationId(String),

    /// The node holds no valid credential for this capability.
    #[error("node is not authorized to provide the messaging capability")]
    NotAuthorized,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid messaging configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl MessagingError {
    /// True for errors a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MessagingError::Timeout { .. } | MessagingError::Transport(TransportError::Closed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = MessagingError::Timeout {
            correlation_id: "abc".into(),
            after: Duration::from_millis(100),
        };
        assert_eq!(err.to_string(), "no reply to abc within 100ms");
        assert!(err.is_retryable());

        let err = MessagingError::DuplicateCorrelationId("abc".into());
        assert_eq!(
            err.to_string(),
            "correlation id \"abc\" already has an outstanding wait"
        );
        assert!(!err.is_retryable());
        assert!(!MessagingError::NotAuthorized.is_retryable());
    }

    #[test]
    fn test_wire_error_is_transparent() {
        let err: MessagingError = WireError::InvalidProcRef("x".into()).into();
        assert_eq!(err.to_string(), "invalid proc ref: x");
    }
}
