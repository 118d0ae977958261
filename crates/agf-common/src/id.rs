//! Batch identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one batch of aggregate records, unique within a fetch.
///
/// Format produced by coordinators: `batch_<n>_<nanos>`.
/// Any non-empty token is accepted from external producers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Create a batch id from a sequence number and a nanosecond stamp.
    pub fn from_sequence(sequence: u64, nanos: u128) -> Self {
        BatchId(format!("batch_{}_{}", sequence, nanos))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        BatchId(id.to_string())
    }
}

impl From<String> for BatchId {
    fn from(id: String) -> Self {
        BatchId(id)
    }
}
