//! Deterministic simulation runner.
//!
//! Delivers routing messages between the protocol instances of a topology
//! in simulated time. Given the same configuration and seed, every run
//! produces identical results.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Simulator                         │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Event Queue (BTreeMap<EventKey, Message>)        │ │
//! │  │   Ordered by: time, receiver, sequence             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   nodes: BTreeMap<NodeId, Protocol>                │ │
//! │  │   Each processes one message at a time             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Exports → scheduled with a seeded link delay     │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_queue;
#[cfg(test)]
mod tests;

use crate::config::{Config, SimulationConfig};
use crate::protocol::{
    DetectionConfig, Message, ProcessOutcome, Protocol, ProtocolError, ProtocolKind,
};
use crate::topology::{Topology, TopologyError};
use crate::{NodeId, Route};
use event_queue::EventKey;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, trace, warn};

/// Errors that abort a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid delay range: min {min} > max {max}")]
    InvalidDelay { min: u64, max: u64 },

    #[error("message addressed to unknown node {0}")]
    UnknownNode(NodeId),

    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Final state of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    /// Neighbor of the selected route (the node itself for the destination).
    pub selected_neighbor: Option<NodeId>,
    /// Selected route, invalid if the node has none.
    pub selected_route: Route,
    /// Neighbors disabled by the loop response.
    pub disabled: Vec<NodeId>,
}

/// Summary of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    /// Protocol variant that ran.
    pub protocol: ProtocolKind,
    /// True if the run ended because no messages were left in flight.
    pub converged: bool,
    /// Messages delivered (dropped messages included).
    pub messages: u64,
    /// Simulated time of the last delivery.
    pub final_time: u64,
    /// Messages whose route was rejected as a loop.
    pub loops_detected: u64,
    /// Per-node final state.
    pub nodes: BTreeMap<NodeId, NodeReport>,
}

impl SimulationReport {
    /// Total number of disabled neighbor relations.
    pub fn disabled_count(&self) -> usize {
        self.nodes.values().map(|node| node.disabled.len()).sum()
    }
}

/// Discrete-event simulator driving one protocol instance per node.
pub struct Simulator {
    config: SimulationConfig,
    kind: ProtocolKind,
    nodes: BTreeMap<NodeId, Protocol>,
    queue: BTreeMap<EventKey, Message>,
    /// Latest scheduled delivery per link, to keep links FIFO.
    link_clock: BTreeMap<(NodeId, NodeId), u64>,
    rng: ChaCha8Rng,
    sequence: u64,
    now: u64,
}

impl Simulator {
    /// Create a simulator over `topology`.
    pub fn new(
        topology: &Topology,
        kind: ProtocolKind,
        detection: &DetectionConfig,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        if config.min_delay > config.max_delay {
            return Err(SimulationError::InvalidDelay {
                min: config.min_delay,
                max: config.max_delay,
            });
        }

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            nodes: topology.build_protocols(kind, detection),
            kind,
            config,
            queue: BTreeMap::new(),
            link_clock: BTreeMap::new(),
            sequence: 0,
            now: 0,
        })
    }

    /// Create a simulator from a scenario.
    pub fn from_config(config: &Config) -> Result<Self, SimulationError> {
        let topology = Topology::from_config(&config.topology)?;
        Self::new(
            &topology,
            config.protocol.kind,
            &config.protocol.detection,
            config.simulation.clone(),
        )
    }

    /// Protocol instance of `node`.
    pub fn node(&self, node: &NodeId) -> Option<&Protocol> {
        self.nodes.get(node)
    }

    /// Number of messages waiting for delivery.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Return every node and the delivery machinery to the initial state.
    pub fn reset(&mut self) {
        for protocol in self.nodes.values_mut() {
            protocol.reset();
        }
        self.queue.clear();
        self.link_clock.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.sequence = 0;
        self.now = 0;
    }

    /// Run one execution from the initial state until no message is in
    /// flight or a budget is exhausted.
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        self.reset();

        info!(
            protocol = %self.kind,
            nodes = self.nodes.len(),
            seed = self.config.seed,
            "Simulation starting"
        );

        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            if let Some(protocol) = self.nodes.get_mut(&id) {
                let outcome = protocol.start();
                self.schedule(outcome.exports);
            }
        }

        let mut messages = 0u64;
        let mut loops_detected = 0u64;

        let converged = loop {
            let Some((key, message)) = self.queue.pop_first() else {
                break true;
            };

            if self.config.max_time.is_some_and(|max_time| key.time > max_time) {
                warn!(time = key.time, "Simulation time budget exhausted");
                self.queue.insert(key, message);
                break false;
            }
            if messages >= self.config.max_messages {
                warn!(messages, "Simulation message budget exhausted");
                self.queue.insert(key, message);
                break false;
            }

            self.now = key.time;
            let outcome = self.deliver(&message)?;
            messages += 1;

            trace!(
                time = self.now,
                sender = %message.sender,
                receiver = %message.receiver,
                update = ?message.update,
                "Delivered message"
            );

            if outcome.loop_detected {
                loops_detected += 1;
            }
            self.schedule(outcome.exports);
        };

        let report = SimulationReport {
            protocol: self.kind,
            converged,
            messages,
            final_time: self.now,
            loops_detected,
            nodes: self
                .nodes
                .iter()
                .map(|(id, protocol)| {
                    let table = protocol.routing_table();
                    let node = NodeReport {
                        selected_neighbor: table.selected_neighbor(),
                        selected_route: table.selected_route().clone(),
                        disabled: protocol.disabled_neighbors().iter().copied().collect(),
                    };
                    (*id, node)
                })
                .collect(),
        };

        info!(
            protocol = %report.protocol,
            converged = report.converged,
            messages = report.messages,
            time = report.final_time,
            loops = report.loops_detected,
            disabled = report.disabled_count(),
            "Simulation finished"
        );

        Ok(report)
    }

    /// Hand one message to its receiver.
    fn deliver(&mut self, message: &Message) -> Result<ProcessOutcome, SimulationError> {
        let protocol = self
            .nodes
            .get_mut(&message.receiver)
            .ok_or(SimulationError::UnknownNode(message.receiver))?;
        Ok(protocol.process(message)?)
    }

    /// Queue outbound messages, each with a link delay drawn from the
    /// configured range. A message never overtakes an earlier one on the
    /// same link. Delivery times saturate at `u64::MAX`.
    fn schedule(&mut self, messages: Vec<Message>) {
        for message in messages {
            let delay = if self.config.min_delay == self.config.max_delay {
                self.config.min_delay
            } else {
                self.rng
                    .gen_range(self.config.min_delay..=self.config.max_delay)
            };

            let link = (message.sender, message.receiver);
            let earliest = self.now.saturating_add(delay);
            let time = self
                .link_clock
                .get(&link)
                .map_or(earliest, |&last| last.max(earliest));
            self.link_clock.insert(link, time);

            let key = EventKey {
                time,
                receiver: message.receiver,
                sequence: self.sequence,
            };
            self.sequence += 1;
            self.queue.insert(key, message);
        }
    }
}
