//! Node identity.
//!
//! Nodes are addressable peers on the transport. The messaging core treats
//! their identifiers as opaque routing keys: cheap to copy, compare and hash.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compact identifier for a node on the network.
///
/// Newtype over `u128` so comparisons and hashing are very fast while giving
/// plenty of space for uniqueness. Written to the wire as 16 little-endian
/// bytes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u128);

impl NodeId {
    /// Size of a node id on the wire.
    pub const WIRE_LEN: usize = 16;

    /// Generate a random node id.
    pub fn random() -> Self {
        NodeId(rand::random())
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        NodeId(u128::from_le_bytes(bytes))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Error returned when a node id string is not 1–32 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid node id {0:?}")]
pub struct ParseNodeIdError(pub String);

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 32 {
            return Err(ParseNodeIdError(s.to_string()));
        }
        u128::from_str_radix(s, 16)
            .map(NodeId)
            .map_err(|_| ParseNodeIdError(s.to_string()))
    }
}
