//! Messaging configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::gate::{CredentialFileGate, IdentityGate, StaticGate};

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_inbound_capacity() -> usize {
    1024
}

/// Tunables for one node's messaging layer.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessagingConfig {
    /// Timeout applied by [`Messenger::request`](crate::Messenger::request).
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Depth of inbound frame and unsolicited packet channels.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,

    /// Credential checked by the identity gate. `None` trusts the node.
    #[serde(default)]
    pub credential_path: Option<PathBuf>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            inbound_capacity: default_inbound_capacity(),
            credential_path: None,
        }
    }
}

impl MessagingConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// The gate implied by `credential_path`.
    pub fn identity_gate(&self) -> Box<dyn IdentityGate> {
        match &self.credential_path {
            Some(path) => Box::new(CredentialFileGate::new(path)),
            None => Box::new(StaticGate::allow()),
        }
    }
}
