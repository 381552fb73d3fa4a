//! Network topology
//!
//! Nodes, directed links and the policy each link applies. A topology is
//! validated once when it is built and then hands out one [`Protocol`]
//! instance per node, wired with that node's in-neighbors and out-links.

use crate::config::{LinkConfig, TopologyConfig};
use crate::extender::{Extender, LinkExtender, LinkPolicy};
use crate::protocol::{DetectionConfig, LoopStrategy, OutLink, Protocol, ProtocolKind};
use crate::NodeId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors found while validating a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("destination {0} does not appear in any link")]
    UnknownDestination(NodeId),

    #[error("link from {0} to itself")]
    SelfLink(NodeId),

    #[error("duplicate link from {from} to {to}")]
    DuplicateLink { from: NodeId, to: NodeId },
}

/// A validated topology.
#[derive(Debug, Clone)]
pub struct Topology {
    destination: NodeId,
    nodes: BTreeSet<NodeId>,
    links: BTreeMap<(NodeId, NodeId), LinkPolicy>,
}

impl Topology {
    /// Build and validate a topology.
    pub fn new(destination: NodeId, links: Vec<LinkConfig>) -> Result<Self, TopologyError> {
        let mut nodes = BTreeSet::new();
        let mut by_endpoints = BTreeMap::new();

        for link in links {
            if link.from == link.to {
                return Err(TopologyError::SelfLink(link.from));
            }
            if by_endpoints.contains_key(&(link.from, link.to)) {
                return Err(TopologyError::DuplicateLink {
                    from: link.from,
                    to: link.to,
                });
            }
            nodes.insert(link.from);
            nodes.insert(link.to);
            by_endpoints.insert((link.from, link.to), link.policy);
        }

        if !nodes.contains(&destination) {
            return Err(TopologyError::UnknownDestination(destination));
        }

        Ok(Self {
            destination,
            nodes,
            links: by_endpoints,
        })
    }

    /// Build a topology from its configuration section.
    pub fn from_config(config: &TopologyConfig) -> Result<Self, TopologyError> {
        Self::new(config.destination, config.links.clone())
    }

    /// The destination node.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// All nodes, in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Policy of the link from `from` to `to`, if it exists.
    pub fn link_policy(&self, from: NodeId, to: NodeId) -> Option<&LinkPolicy> {
        self.links.get(&(from, to))
    }

    /// Nodes that export to `node`.
    pub fn in_neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .keys()
            .filter(move |(_, to)| *to == node)
            .map(|(from, _)| *from)
    }

    /// Nodes `node` exports to.
    pub fn out_neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .range((node, NodeId::new(0))..=(node, NodeId::new(u32::MAX)))
            .map(|((_, to), _)| *to)
    }

    /// One protocol instance per node, keyed by node.
    pub fn build_protocols(
        &self,
        kind: ProtocolKind,
        detection: &DetectionConfig,
    ) -> BTreeMap<NodeId, Protocol> {
        self.nodes()
            .map(|node| {
                let out_links = self.out_neighbors(node).filter_map(|neighbor| {
                    self.link_policy(node, neighbor).map(|policy| {
                        let extender: Arc<dyn Extender> =
                            Arc::new(LinkExtender::new(node, policy.clone()));
                        OutLink::new(neighbor, extender)
                    })
                });
                let protocol = Protocol::new(
                    node,
                    self.in_neighbors(node),
                    out_links,
                    LoopStrategy::new(kind, detection.clone()),
                )
                .with_origin(node == self.destination);
                (node, protocol)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn link(from: u32, to: u32) -> LinkConfig {
        LinkConfig {
            from: node(from),
            to: node(to),
            policy: LinkPolicy::default(),
        }
    }

    #[test]
    fn test_neighbors() {
        let topology = Topology::new(node(0), vec![link(0, 1), link(0, 2), link(2, 1)]).unwrap();

        assert_eq!(topology.node_count(), 3);
        assert_eq!(topology.link_count(), 3);
        assert_eq!(topology.in_neighbors(node(1)).collect::<Vec<_>>(), vec![node(0), node(2)]);
        assert_eq!(topology.out_neighbors(node(0)).collect::<Vec<_>>(), vec![node(1), node(2)]);
        assert_eq!(topology.out_neighbors(node(1)).count(), 0);
    }

    #[test]
    fn test_self_link_rejected() {
        let result = Topology::new(node(0), vec![link(0, 1), link(1, 1)]);
        assert!(matches!(result, Err(TopologyError::SelfLink(id)) if id == node(1)));
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let result = Topology::new(node(0), vec![link(0, 1), link(0, 1)]);
        assert!(matches!(result, Err(TopologyError::DuplicateLink { .. })));
    }

    #[test]
    fn test_unknown_destination_rejected() {
        let result = Topology::new(node(9), vec![link(0, 1)]);
        assert!(matches!(result, Err(TopologyError::UnknownDestination(id)) if id == node(9)));
    }

    #[test]
    fn test_build_protocols() {
        let topology = Topology::new(node(0), vec![link(0, 1), link(1, 2)]).unwrap();
        let protocols = topology.build_protocols(ProtocolKind::SsBgp, &DetectionConfig::default());

        assert_eq!(protocols.len(), 3);
        assert!(protocols[&node(0)].is_origin());
        assert!(!protocols[&node(1)].is_origin());
        assert_eq!(protocols[&node(2)].kind(), ProtocolKind::SsBgp);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
destination: 0
links:
  - { from: 0, to: 1, policy: { type: fixed, local_pref: 10 } }
  - { from: 1, to: 2 }
"#;
        let config: TopologyConfig = serde_yaml::from_str(yaml).unwrap();
        let topology = Topology::from_config(&config).unwrap();

        assert_eq!(
            topology.link_policy(node(0), node(1)),
            Some(&LinkPolicy::Fixed { local_pref: 10 })
        );
        assert_eq!(
            topology.link_policy(node(1), node(2)),
            Some(&LinkPolicy::ShortestPath { cost: 1 })
        );
    }
}
