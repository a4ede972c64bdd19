//! Error types for the core library.

use crate::node::NodeId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while turning a frame into a message.
///
/// All of these are local to a single decode: they never affect other
/// in-flight requests, and the receive path discards the offending frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The frame ended before a field could be read, or a field is invalid
    /// (negative length, bad UTF-8).
    #[error("malformed message: {context}")]
    MalformedMessage {
        /// What was being read when the frame ran out.
        context: String,
    },

    /// The variant decoder finished but bytes remain.
    ///
    /// Usually a version mismatch between sender and receiver.
    #[error("trailing data: {remaining} unread bytes after {kind}")]
    TrailingData {
        /// Display name of the variant that was decoded.
        kind: &'static str,
        /// Number of unread bytes.
        remaining: usize,
    },

    /// The type tag is not one of the known message kinds.
    #[error("unknown message type {tag:?}")]
    UnknownMessageType {
        /// The tag as read from the frame (lossy UTF-8).
        tag: String,
    },

    /// A `"<uuid>[<version>]"` reference could not be parsed.
    #[error("invalid proc ref: {0}")]
    InvalidProcRef(String),
}

impl WireError {
    pub(crate) fn malformed(context: impl Into<String>) -> Self {
        WireError::MalformedMessage {
            context: context.into(),
        }
    }
}

/// Errors surfaced by a [`Transport`](crate::network::Transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No route to the destination node.
    #[error("unknown destination {0}")]
    UnknownDestination(NodeId),

    /// The transport has shut down.
    #[error("transport closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            WireError::malformed("envelope").to_string(),
            "malformed message: envelope"
        );
        assert_eq!(
            WireError::TrailingData {
                kind: "Progress",
                remaining: 4
            }
            .to_string(),
            "trailing data: 4 unread bytes after Progress"
        );
        assert_eq!(
            WireError::UnknownMessageType {
                tag: "ABCD".into()
            }
            .to_string(),
            "unknown message type \"ABCD\""
        );
        assert_eq!(
            TransportError::UnknownDestination(NodeId(0xff)).to_string(),
            "unknown destination 000000000000000000000000000000ff"
        );
    }
}
