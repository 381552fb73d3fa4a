//! SS-BGP: path-vector routing with Sender-Side loop suppression
//!
//! A protocol engine for single-destination path-vector routing (a BGP
//! abstraction) and a deterministic simulator to run it over a topology.
//! Besides plain BGP, the engine implements the two Sender-Side BGP
//! variants that detect recurring routing loops and disable the neighbor
//! that keeps sending them.

pub mod config;
pub mod extender;
pub mod node_id;
pub mod path;
pub mod protocol;
pub mod route;
pub mod routing_table;
pub mod simulation;
pub mod topology;

// Re-export core routing types
pub use node_id::NodeId;
pub use path::Path;
pub use route::{LocalPref, Route};
pub use routing_table::RoutingTable;

// Re-export link types
pub use extender::{Extender, LinkExtender, LinkPolicy};

// Re-export protocol types
pub use protocol::{
    DetectionConfig, LoopStrategy, LoopVerdict, Message, OutLink, PreferenceCondition,
    ProcessOutcome, Protocol, ProtocolError, ProtocolKind, ReferenceRoute, Update,
};

// Re-export topology types
pub use topology::{Topology, TopologyError};

// Re-export config types
pub use config::{Config, ConfigError, LinkConfig, ProtocolConfig, SimulationConfig, TopologyConfig};

// Re-export simulation types
pub use simulation::{NodeReport, SimulationError, SimulationReport, Simulator};
