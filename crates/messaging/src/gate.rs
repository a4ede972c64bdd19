//! Service identity gate.
//!
//! A node must hold a valid credential, issued out of band, before it may
//! offer the messaging capability. The credential itself is opaque here:
//! all the messaging layer asks is a yes/no answer, once, at construction
//! time (see [`Messenger::new`](crate::Messenger::new)).

use std::path::{Path, PathBuf};

use tracing::debug;

/// Startup-time authorization check.
pub trait IdentityGate: Send + Sync {
    /// True if this node may advertise the capability.
    fn is_authorized(&self) -> bool;
}

/// Gate with a fixed answer. Useful for tests and trusted deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticGate(pub bool);

impl StaticGate {
    pub fn allow() -> Self {
        StaticGate(true)
    }

    pub fn deny() -> Self {
        StaticGate(false)
    }
}

impl IdentityGate for StaticGate {
    fn is_authorized(&self) -> bool {
        self.0
    }
}

/// Authorized when a non-empty credential file is present.
#[derive(Debug, Clone)]
pub struct CredentialFileGate {
    path: PathBuf,
}

impl CredentialFileGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityGate for CredentialFileGate {
    fn is_authorized(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(err) => {
                debug!(path = %self.path.display(), %err, "credential not readable");
                false
            }
        }
    }
}
