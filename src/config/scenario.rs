//! Scenario sections: protocol, simulation and topology.

use crate::extender::LinkPolicy;
use crate::protocol::{DetectionConfig, ProtocolKind};
use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Protocol section (`protocol.*`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol variant (`protocol.kind`): `bgp`, `ssbgp` or `issbgp`.
    #[serde(default)]
    pub kind: ProtocolKind,
    /// Loop detection tunables (`protocol.detection.*`). Ignored by `bgp`.
    #[serde(default)]
    pub detection: DetectionConfig,
}

/// Simulation section (`simulation.*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed of the delay generator (`simulation.seed`).
    #[serde(default)]
    pub seed: u64,
    /// Minimum link delay in ticks (`simulation.min_delay`).
    #[serde(default = "SimulationConfig::default_delay")]
    pub min_delay: u64,
    /// Maximum link delay in ticks (`simulation.max_delay`).
    #[serde(default = "SimulationConfig::default_delay")]
    pub max_delay: u64,
    /// Messages delivered before the run is declared non-convergent
    /// (`simulation.max_messages`).
    #[serde(default = "SimulationConfig::default_max_messages")]
    pub max_messages: u64,
    /// Simulated time after which the run stops (`simulation.max_time`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            min_delay: 1,
            max_delay: 1,
            max_messages: 100_000,
            max_time: None,
        }
    }
}

impl SimulationConfig {
    fn default_delay() -> u64 {
        1
    }

    fn default_max_messages() -> u64 {
        100_000
    }
}

/// A directed link: routes flow from `from` (exporter) to `to` (importer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Exporting node.
    pub from: NodeId,
    /// Importing node.
    pub to: NodeId,
    /// Policy applied to routes crossing the link.
    #[serde(default)]
    pub policy: LinkPolicy,
}

/// Topology section (`topology.*`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Node originating the destination route (`topology.destination`).
    pub destination: NodeId,
    /// Directed links (`topology.links`).
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}
