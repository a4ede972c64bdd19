//! Send primitive and the blocking request/reply built on top of it.
//!
//! `send` hands one frame to the transport and returns; it never waits for
//! the peer. `send_and_wait` layers a call/return shape over that:
//!
//! 1. register a wait for the envelope's correlation id,
//! 2. send the frame,
//! 3. wait for the matching reply or the deadline,
//! 4. release the wait.
//!
//! Step 4 happens on every exit path, including a send failure and the
//! caller dropping the future, because the [`WaitHandle`] releases on drop.

use std::sync::Arc;
use std::time::Duration;

use corelib::{Envelope, Message, NodeId, Packet, Transport};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MessagingConfig;
use crate::error::{MessagingError, Result};
use crate::gate::IdentityGate;
use crate::registry::{CorrelationRegistry, WaitHandle};

/// One node's outbound side of the messaging capability.
pub struct Messenger {
    local: NodeId,
    transport: Arc<dyn Transport>,
    registry: CorrelationRegistry,
    default_timeout: Duration,
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("local", &self.local)
            .field("transport", &self.transport.name())
            .field("pending", &self.registry.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl Messenger {
    /// Build the capability for `local`.
    ///
    /// # Errors
    ///
    /// [`MessagingError::NotAuthorized`] if `gate` refuses. The check happens
    /// once, here; individual messages are not re-checked.
    pub fn new(
        local: NodeId,
        transport: Arc<dyn Transport>,
        gate: &dyn IdentityGate,
        config: &MessagingConfig,
    ) -> Result<Self> {
        Self::with_registry(local, transport, gate, config, CorrelationRegistry::new())
    }

    /// Like [`new`](Self::new), sharing an existing registry (usually the
    /// one the node's [`Dispatcher`](crate::Dispatcher) delivers into).
    pub fn with_registry(
        local: NodeId,
        transport: Arc<dyn Transport>,
        gate: &dyn IdentityGate,
        config: &MessagingConfig,
        registry: CorrelationRegistry,
    ) -> Result<Self> {
        if !gate.is_authorized() {
            warn!(node = %local, "identity gate refused; messaging capability not started");
            return Err(MessagingError::NotAuthorized);
        }
        info!(node = %local, transport = transport.name(), "messaging capability started");
        Ok(Self {
            local,
            transport,
            registry,
            default_timeout: config.default_timeout(),
        })
    }

    pub fn local_node(&self) -> NodeId {
        self.local
    }

    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Envelope from this node to `destination` with a fresh correlation id.
    pub fn envelope_to(&self, destination: NodeId) -> Envelope {
        Envelope::new(destination, self.local, Uuid::new_v4().to_string())
    }

    /// Swap source and destination so a reply returns to the requester.
    pub fn prepare_for_return_trip(envelope: &mut Envelope) {
        envelope.prepare_for_return_trip();
    }

    /// Ship one message. Does not wait for any acknowledgement.
    pub async fn send(&self, envelope: &Envelope, message: &Message) -> Result<()> {
        let frame = corelib::envelope::encode(envelope, message);
        debug!(
            destination = %envelope.destination,
            correlation_id = %envelope.correlation_id,
            kind = %message.kind(),
            len = frame.len(),
            "sending"
        );
        self.transport.send(envelope.destination, frame).await?;
        Ok(())
    }

    /// Send and block until the reply with the same correlation id arrives
    /// or `timeout` passes.
    ///
    /// # Errors
    ///
    /// - [`MessagingError::DuplicateCorrelationId`] if the id is already in flight
    /// - [`MessagingError::Transport`] if the send itself failed
    /// - [`MessagingError::Timeout`] if no reply arrived in time
    pub async fn send_and_wait(
        &self,
        envelope: &Envelope,
        message: &Message,
        timeout: Duration,
    ) -> Result<Packet> {
        let mut handle: WaitHandle = self
            .registry
            .create_wait(envelope.correlation_id.clone(), timeout)?;

        self.send(envelope, message).await?;
        let reply = handle.wait().await;
        self.registry.release(&handle);

        match &reply {
            Ok(packet) => debug!(
                correlation_id = %envelope.correlation_id,
                kind = %packet.kind(),
                "reply received"
            ),
            Err(err) => debug!(correlation_id = %envelope.correlation_id, %err, "no reply"),
        }
        reply
    }

    /// Request/reply to `destination` with a fresh correlation id and the
    /// configured default timeout.
    pub async fn request(&self, destination: NodeId, message: impl Into<Message>) -> Result<Packet> {
        self.request_with_timeout(destination, message, self.default_timeout)
            .await
    }

    pub async fn request_with_timeout(
        &self,
        destination: NodeId,
        message: impl Into<Message>,
        timeout: Duration,
    ) -> Result<Packet> {
        let envelope = self.envelope_to(destination);
        self.send_and_wait(&envelope, &message.into(), timeout).await
    }

    /// Answer `request` with `message`, addressed back to its sender under
    /// the same correlation id.
    pub async fn reply(&self, request: &Envelope, message: impl Into<Message>) -> Result<()> {
        let mut envelope = request.clone();
        Self::prepare_for_return_trip(&mut envelope);
        self.send(&envelope, &message.into()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StaticGate;
    use crate::loopback::LoopbackNetwork;
    use corelib::message::{NoOp, RequestConfig};

    fn messenger(network: &LoopbackNetwork, node: NodeId) -> Messenger {
        Messenger::new(
            node,
            network.transport(),
            &StaticGate::allow(),
            &MessagingConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_gate_refusal() {
        let network = LoopbackNetwork::default();
        let err = Messenger::new(
            NodeId(1),
            network.transport(),
            &StaticGate::deny(),
            &MessagingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MessagingError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_send_is_fire_and_forget() {
        let network = LoopbackNetwork::default();
        let mut inbox = network.register(NodeId(2));
        let a = messenger(&network, NodeId(1));

        let envelope = a.envelope_to(NodeId(2));
        a.send(&envelope, &NoOp::new("hello").into()).await.unwrap();
        assert!(a.registry().is_empty());

        let packet = Packet::decode(inbox.recv().await.unwrap()).unwrap();
        assert_eq!(packet.envelope, envelope);
        assert_eq!(packet.message, Message::from(NoOp::new("hello")));
    }

    #[tokio::test]
    async fn test_send_failure_releases_wait() {
        let network = LoopbackNetwork::default();
        let a = messenger(&network, NodeId(1));
        let envelope = a.envelope_to(NodeId(99));

        let err = a
            .send_and_wait(&envelope, &RequestConfig.into(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MessagingError::Transport(_)));
        assert!(a.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_wait() {
        let network = LoopbackNetwork::default();
        let _inbox = network.register(NodeId(2));
        let a = messenger(&network, NodeId(1));

        let err = a
            .request_with_timeout(NodeId(2), RequestConfig, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, MessagingError::Timeout { .. }));
        assert!(a.registry().is_empty());
    }

    #[tokio::test]
    async fn test_reply_is_addressed_back() {
        let network = LoopbackNetwork::default();
        let mut inbox_a = network.register(NodeId(1));
        let b = messenger(&network, NodeId(2));

        let request = Envelope::new(NodeId(2), NodeId(1), "corr-7");
        b.reply(&request, NoOp::new("pong")).await.unwrap();

        let packet = Packet::decode(inbox_a.recv().await.unwrap()).unwrap();
        assert_eq!(packet.envelope.destination, NodeId(1));
        assert_eq!(packet.envelope.source, NodeId(2));
        assert_eq!(packet.correlation_id(), "corr-7");
    }

    #[test]
    fn test_fresh_correlation_ids() {
        let network = LoopbackNetwork::default();
        let a = messenger(&network, NodeId(1));
        let x = a.envelope_to(NodeId(2));
        let y = a.envelope_to(NodeId(2));
        assert_ne!(x.correlation_id, y.correlation_id);
        assert_eq!(x.source, NodeId(1));
    }
}
