//! Opaque node identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node (an autonomous system) in the simulated network.
///
/// Identifiers are totally ordered: the order is the final tie-break of
/// route selection, so two runs over the same topology always pick the
/// same neighbor.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a NodeId from its numeric value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the numeric value.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
