//! Wiring of one node: messenger, dispatcher and their shared registry.

use std::sync::Arc;

use corelib::{NodeId, Packet, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MessagingConfig;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::Result;
use crate::gate::IdentityGate;
use crate::messenger::Messenger;
use crate::registry::CorrelationRegistry;

/// A running node.
#[derive(Debug)]
pub struct NodeHandle {
    /// Outbound side; share it with any task that sends.
    pub messenger: Arc<Messenger>,
    /// Packets no pending wait claimed, i.e. requests from peers.
    pub requests: mpsc::Receiver<Packet>,
    /// The receive loop; finishes when the inbound channel closes.
    pub receive_loop: JoinHandle<DispatchStats>,
}

/// Start the messaging capability for `local`.
///
/// Checks the identity gate, then spawns the receive loop over `inbound`.
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// [`MessagingError::NotAuthorized`](crate::MessagingError::NotAuthorized)
/// if the gate refuses; nothing is spawned in that case.
pub fn start_node(
    local: NodeId,
    transport: Arc<dyn Transport>,
    inbound: mpsc::Receiver<bytes::Bytes>,
    gate: &dyn IdentityGate,
    config: &MessagingConfig,
) -> Result<NodeHandle> {
    let registry = CorrelationRegistry::new();
    let messenger = Messenger::with_registry(local, transport, gate, config, registry.clone())?;

    let (sink, requests) = mpsc::channel(config.inbound_capacity.max(1));
    let dispatcher = Dispatcher::new(local, registry).with_unsolicited(sink);
    let receive_loop = tokio::spawn(dispatcher.run(inbound));

    Ok(NodeHandle {
        messenger: Arc::new(messenger),
        requests,
        receive_loop,
    })
}
