//! In-process transport connecting nodes through tokio channels.
//!
//! Stands in for the real stack in tests and in the diagnostic CLI. Each
//! registered node gets a bounded inbound queue of raw frames; sending is a
//! channel push.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use corelib::{NodeId, Transport, TransportError};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug)]
struct Inner {
    routes: RwLock<HashMap<NodeId, mpsc::Sender<Bytes>>>,
    capacity: usize,
    lossy: AtomicBool,
}

/// A set of nodes that can reach each other.
#[derive(Debug, Clone)]
pub struct LoopbackNetwork {
    inner: Arc<Inner>,
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl LoopbackNetwork {
    /// Create a network whose inbound queues hold `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                routes: RwLock::new(HashMap::new()),
                capacity: capacity.max(1),
                lossy: AtomicBool::new(false),
            }),
        }
    }

    /// Attach `node` and return its inbound frame queue.
    ///
    /// Registering a node again replaces its previous queue.
    pub fn register(&self, node: NodeId) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        self.inner.routes.write().insert(node, tx);
        rx
    }

    /// Detach `node`; later sends to it fail with `UnknownDestination`.
    pub fn unregister(&self, node: NodeId) -> bool {
        self.inner.routes.write().remove(&node).is_some()
    }

    /// When set, every frame is silently discarded.
    pub fn set_lossy(&self, lossy: bool) {
        self.inner.lossy.store(lossy, Ordering::Relaxed);
    }

    /// A transport handle sending into this network.
    pub fn transport(&self) -> Arc<LoopbackTransport> {
        Arc::new(LoopbackTransport {
            network: self.clone(),
        })
    }
}

/// [`Transport`] over a [`LoopbackNetwork`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    network: LoopbackNetwork,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, destination: NodeId, frame: Bytes) -> Result<(), TransportError> {
        let inner = &self.network.inner;
        if inner.lossy.load(Ordering::Relaxed) {
            trace!(%destination, len = frame.len(), "lossy link dropped frame");
            return Ok(());
        }
        let route = inner
            .routes
            .read()
            .get(&destination)
            .cloned()
            .ok_or(TransportError::UnknownDestination(destination))?;
        route.send(frame).await.map_err(|_| TransportError::Closed)
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_registered_node() {
        let network = LoopbackNetwork::new(4);
        let mut inbox = network.register(NodeId(1));
        let transport = network.transport();

        transport
            .send(NodeId(1), Bytes::from_static(b"frame"))
            .await
            .unwrap();
        assert_eq!(inbox.recv().await.unwrap(), Bytes::from_static(b"frame"));
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let network = LoopbackNetwork::default();
        let err = network
            .transport()
            .send(NodeId(9), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::UnknownDestination(NodeId(9)));
    }

    #[tokio::test]
    async fn test_closed_inbox() {
        let network = LoopbackNetwork::default();
        drop(network.register(NodeId(1)));
        let err = network
            .transport()
            .send(NodeId(1), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn test_lossy_drops_silently() {
        let network = LoopbackNetwork::default();
        let mut inbox = network.register(NodeId(1));
        network.set_lossy(true);
        network
            .transport()
            .send(NodeId(1), Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(inbox.try_recv().is_err());
    }

    #[test]
    fn test_unregister() {
        let network = LoopbackNetwork::default();
        let _inbox = network.register(NodeId(1));
        assert!(network.unregister(NodeId(1)));
        assert!(!network.unregister(NodeId(1)));
    }
}
