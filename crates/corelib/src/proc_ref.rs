//! Dataset version references of the form `"<uuid>[<version>]"`.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::WireError;

/// One version of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcRef {
    pub dataset_id: Uuid,
    pub version: i32,
}

impl ProcRef {
    pub fn new(dataset_id: Uuid, version: i32) -> Self {
        Self {
            dataset_id,
            version,
        }
    }
}

impl fmt::Display for ProcRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.dataset_id, self.version)
    }
}

impl FromStr for ProcRef {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WireError::InvalidProcRef(s.to_string());

        let (id, rest) = s.split_once('[').ok_or_else(invalid)?;
        let version = rest.strip_suffix(']').ok_or_else(invalid)?;
        let dataset_id = Uuid::parse_str(id.trim()).map_err(|_| invalid())?;
        let version = version.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(dataset_id, version))
    }
}
