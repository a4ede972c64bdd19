//! Core networking abstractions shared across the workspace.
//!
//! The messaging layer does not own sockets, framing over streams, or peer
//! discovery. It only needs a way to hand an encoded frame to "the stack"
//! for a given node; this trait is that seam.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::node::NodeId;

/// Fire-and-forget frame delivery to a node.
///
/// `send` returns once the stack has accepted the frame; it says nothing
/// about whether the peer received it. Implementations must be thread-safe,
/// as concurrent requests share one transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hand `frame` to the stack for delivery to `destination`.
    async fn send(&self, destination: NodeId, frame: Bytes) -> Result<(), TransportError>;

    /// Transport name (for logging/debugging).
    fn name(&self) -> &'static str;
}
