//! Request/reply messaging over an asynchronous, possibly lossy transport.
//!
//! This crate provides:
//! - The correlation registry matching replies to outstanding requests
//! - The send primitive and blocking request/reply on top of it
//! - The receive loop that decodes inbound frames and delivers them
//! - The service identity gate checked before the capability starts
//! - An in-process loopback transport for tests and diagnostics

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod loopback;
pub mod messenger;
pub mod node;
pub mod registry;
pub mod responder;

pub use config::MessagingConfig;
pub use dispatcher::{Dispatch, DispatchStats, Dispatcher, DropReason};
pub use error::{MessagingError, Result};
pub use gate::{CredentialFileGate, IdentityGate, StaticGate};
pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use messenger::Messenger;
pub use node::{start_node, NodeHandle};
pub use registry::{CorrelationRegistry, WaitHandle, WaitState};
pub use responder::serve_requests;
