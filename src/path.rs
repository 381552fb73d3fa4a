//! AS-PATH
//!
//! The ordered sequence of nodes a route has traversed. The first element
//! is the node closest to the destination and the last element is the most
//! recent exporter. Paths are immutable: appending copies.

use crate::NodeId;
use std::fmt;

/// An immutable sequence of nodes.
///
/// Nodes may repeat. A repeated node is exactly what loop detection looks
/// for, so `append` never deduplicates.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<NodeId>);

impl Path {
    /// A path with no nodes.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// A path containing the given nodes in the given order.
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }

    /// Return a new path with `node` appended. The receiver is unchanged.
    pub fn append(&self, node: NodeId) -> Path {
        let mut nodes = Vec::with_capacity(self.0.len() + 1);
        nodes.extend_from_slice(&self.0);
        nodes.push(node);
        Path(nodes)
    }

    /// Check if `node` occurs anywhere in the path.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.0.iter().any(|id| id == node)
    }

    /// Number of nodes in the path.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The nodes in order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    /// The nodes preceding the first occurrence of `node`.
    ///
    /// Returns `None` if `node` is not in the path.
    pub fn prefix_before(&self, node: &NodeId) -> Option<&[NodeId]> {
        self.0
            .iter()
            .position(|id| id == node)
            .map(|index| &self.0[..index])
    }
}

impl FromIterator<NodeId> for Path {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl AsRef<[NodeId]> for Path {
    fn as_ref(&self) -> &[NodeId] {
        &self.0
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "]")
    }
}
