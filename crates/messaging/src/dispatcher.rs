//! Receive path: decode inbound frames and hand them to the registry.
//!
//! One bad frame never stops the loop. Decode errors are logged and the
//! frame is dropped; nothing reaches a waiting caller.

use bytes::Bytes;
use corelib::{NodeId, Packet, WireError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::CorrelationRegistry;

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Matched a pending wait.
    Delivered,
    /// No wait took it; forwarded to the unsolicited sink.
    Forwarded,
    /// Discarded.
    Dropped(DropReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The frame did not decode.
    Undecodable(WireError),
    /// Addressed to some other node.
    Misaddressed(NodeId),
    /// A wait exists for the id but no longer accepts packets.
    Late,
    /// No wait matched and there is no sink (or it is full or closed).
    Unclaimed,
}

/// Counters returned when the receive loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub forwarded: u64,
    pub dropped: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: &Dispatch) {
        match outcome {
            Dispatch::Delivered => self.delivered += 1,
            Dispatch::Forwarded => self.forwarded += 1,
            Dispatch::Dropped(_) => self.dropped += 1,
        }
    }
}

/// Inbound side of one node.
#[derive(Debug)]
pub struct Dispatcher {
    local: NodeId,
    registry: CorrelationRegistry,
    unsolicited: Option<mpsc::Sender<Packet>>,
}

impl Dispatcher {
    pub fn new(local: NodeId, registry: CorrelationRegistry) -> Self {
        Self {
            local,
            registry,
            unsolicited: None,
        }
    }

    /// Forward packets no wait claims (typically requests) to `sink`.
    pub fn with_unsolicited(mut self, sink: mpsc::Sender<Packet>) -> Self {
        self.unsolicited = Some(sink);
        self
    }

    /// Decode one frame and route it.
    pub fn handle_frame(&self, frame: Bytes) -> Dispatch {
        let packet = match Packet::decode(frame) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(node = %self.local, %err, "dropping undecodable frame");
                return Dispatch::Dropped(DropReason::Undecodable(err));
            }
        };

        if packet.envelope.destination != self.local {
            debug!(
                node = %self.local,
                destination = %packet.envelope.destination,
                "dropping frame addressed elsewhere"
            );
            return Dispatch::Dropped(DropReason::Misaddressed(packet.envelope.destination));
        }

        if self.registry.contains(packet.correlation_id()) {
            return if self.registry.deliver(packet) {
                Dispatch::Delivered
            } else {
                Dispatch::Dropped(DropReason::Late)
            };
        }

        match &self.unsolicited {
            Some(sink) => match sink.try_send(packet) {
                Ok(()) => Dispatch::Forwarded,
                Err(err) => {
                    warn!(node = %self.local, %err, "unsolicited sink unavailable, dropping packet");
                    Dispatch::Dropped(DropReason::Unclaimed)
                }
            },
            None => {
                debug!(
                    node = %self.local,
                    correlation_id = packet.correlation_id(),
                    kind = %packet.kind(),
                    "no wait for packet, dropping"
                );
                Dispatch::Dropped(DropReason::Unclaimed)
            }
        }
    }

    /// Receive loop. Runs until `inbound` closes.
    pub async fn run(self, mut inbound: mpsc::Receiver<Bytes>) -> DispatchStats {
        info!(node = %self.local, "receive loop started");
        let mut stats = DispatchStats::default();
        while let Some(frame) = inbound.recv().await {
            let outcome = self.handle_frame(frame);
            stats.record(&outcome);
        }
        info!(
            node = %self.local,
            delivered = stats.delivered,
            forwarded = stats.forwarded,
            dropped = stats.dropped,
            "receive loop stopped"
        );
        stats
    }
}
