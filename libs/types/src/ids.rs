//! Unique identifier types for exchange entities
//!
//! Order ids use UUID v7 for time-sortable ordering: within a single
//! engine tick they break FIFO ties in the order the ids were minted.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an order
///
/// A 16-byte opaque value on the wire. UUID v7 keeps ids sortable by
/// creation time, which is what level FIFO tie-breaking relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Mint a new OrderId with the current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Reconstruct an id from its 16 raw wire bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// The 16 raw bytes carried on the wire
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Get inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
