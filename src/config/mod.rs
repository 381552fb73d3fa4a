//! Scenario Configuration
//!
//! A scenario is a YAML file with three sections:
//!
//! ```yaml
//! protocol:
//!   kind: ssbgp            # bgp | ssbgp | issbgp
//!   detection:
//!     preference: at-least # higher | at-least | equal
//!     reference: selected  # selected | alternative
//!     min_occurrences: 1
//! simulation:
//!   seed: 42
//!   min_delay: 1
//!   max_delay: 5
//!   max_messages: 100000
//! topology:
//!   destination: 0
//!   links:
//!     - { from: 0, to: 1, policy: { type: fixed, local_pref: 10 } }
//!     - { from: 2, to: 1, policy: { type: shortest-path, cost: 1 } }
//! ```
//!
//! Every field except `topology` has a default.

mod scenario;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use scenario::{LinkConfig, ProtocolConfig, SimulationConfig, TopologyConfig};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Protocol variant and loop detection (`protocol.*`).
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Simulated message delivery (`simulation.*`).
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Nodes and links (`topology.*`).
    pub topology: TopologyConfig,
}

impl Config {
    /// Load configuration from a single file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Serialize this configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
