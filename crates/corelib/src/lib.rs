//! Core library for the peer messaging layer.
//!
//! This crate provides the pieces every node shares:
//! - Node identity
//! - The flat field stream used as the wire form
//! - The envelope common to every message
//! - The closed set of message kinds and their payload codecs
//! - The transport seam the messaging layer sends through

pub mod envelope;
pub mod error;
pub mod message;
pub mod network;
pub mod node;
pub mod proc_ref;
pub mod wire;

pub use envelope::{Envelope, Header, Packet};
pub use error::{Result, TransportError, WireError};
pub use message::{Message, MessageKind, Payload};
pub use network::Transport;
pub use node::NodeId;
pub use proc_ref::ProcRef;
