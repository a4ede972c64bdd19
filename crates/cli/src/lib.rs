//! `peerctl`: request/reply diagnostics for content-distribution nodes.
//!
//! Provides commands for:
//! - Round-tripping no-op messages
//! - Querying a peer's configuration and data-source catalog
//! - Publishing a dataset version

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
