//! Loop-response strategies.
//!
//! When a node rejects a route because its own identifier is already in the
//! AS-PATH, the strategy decides whether that loop is transient or a symptom
//! of a recurring routing dispute. Plain BGP never decides anything. The two
//! SS-BGP variants keep a per-neighbor history and apply the WEAK or STRONG
//! recurrence condition.

use crate::route::LocalPref;
use crate::{NodeId, Route};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Protocol variant, distinguished only by its loop response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolKind {
    /// BGP: loops are rejected and nothing else happens.
    #[default]
    #[serde(rename = "bgp", alias = "plain")]
    Bgp,
    /// SS-BGP with the WEAK detection condition.
    #[serde(rename = "ssbgp", alias = "weak")]
    SsBgp,
    /// SS-BGP with the STRONG detection condition.
    #[serde(rename = "issbgp", alias = "strong")]
    IsSsBgp,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::Bgp => "bgp",
            ProtocolKind::SsBgp => "ssbgp",
            ProtocolKind::IsSsBgp => "issbgp",
        };
        write!(f, "{name}")
    }
}

/// Unrecognized protocol name.
#[derive(Debug, Error)]
#[error("unknown protocol '{0}' (expected bgp, ssbgp or issbgp)")]
pub struct UnknownProtocol(pub String);

impl FromStr for ProtocolKind {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bgp" | "plain" => Ok(ProtocolKind::Bgp),
            "ssbgp" | "weak" => Ok(ProtocolKind::SsBgp),
            "issbgp" | "strong" => Ok(ProtocolKind::IsSsBgp),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

/// Relation required between the looped route's local preference and the
/// reference route's local preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreferenceCondition {
    /// Looped route strictly more preferred.
    Higher,
    /// Looped route at least as preferred.
    #[default]
    AtLeast,
    /// Same preference class.
    Equal,
}

impl PreferenceCondition {
    /// Check the condition for a looped and a reference local preference.
    pub fn holds(&self, looped: LocalPref, reference: LocalPref) -> bool {
        match self {
            PreferenceCondition::Higher => looped > reference,
            PreferenceCondition::AtLeast => looped >= reference,
            PreferenceCondition::Equal => looped == reference,
        }
    }
}

/// Which of the node's routes the looped route is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceRoute {
    /// The route selected before the loop was detected.
    #[default]
    Selected,
    /// The best route not learned from the sender of the looped route.
    Alternative,
}

/// Tunables of the WEAK and STRONG conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Local preference relation (`protocol.detection.preference`).
    #[serde(default)]
    pub preference: PreferenceCondition,
    /// Reference route (`protocol.detection.reference`).
    #[serde(default)]
    pub reference: ReferenceRoute,
    /// Matching loop events from one neighbor before it is disabled
    /// (`protocol.detection.min_occurrences`). Zero behaves like one.
    #[serde(default = "DetectionConfig::default_min_occurrences")]
    pub min_occurrences: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            preference: PreferenceCondition::default(),
            reference: ReferenceRoute::default(),
            min_occurrences: 1,
        }
    }
}

impl DetectionConfig {
    fn default_min_occurrences() -> u32 {
        1
    }
}

/// Everything a strategy may look at when a loop is detected.
#[derive(Debug, Clone, Copy)]
pub struct LoopContext<'a> {
    /// The node that detected the loop.
    pub node: NodeId,
    /// Neighbor that sent the looped route.
    pub sender: NodeId,
    /// The imported route whose AS-PATH contains `node`.
    pub route: &'a Route,
    /// Route selected by `node` before this message.
    pub selected: &'a Route,
    /// Best route of `node` not learned from `sender`.
    pub alternative: &'a Route,
}

/// Outcome of a loop-response decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopVerdict {
    /// One-off loop: reject the route, keep the neighbor.
    Transient,
    /// Recurring loop: disable the sender.
    Recurrent,
}

/// Loop events observed from one neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopRecord {
    /// Loop events from this neighbor.
    pub occurrences: u32,
    /// Events that met the recurrence condition.
    pub matching: u32,
    /// The most recent looped route.
    pub last_route: Route,
}

/// WEAK/STRONG detector state: configuration plus per-neighbor history.
#[derive(Debug, Clone, Default)]
pub struct LoopDetector {
    config: DetectionConfig,
    history: BTreeMap<NodeId, LoopRecord>,
}

impl LoopDetector {
    /// Create a detector with an empty history.
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            history: BTreeMap::new(),
        }
    }

    /// The detector's configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// History record for `neighbor`, if it ever sent a looped route.
    pub fn record(&self, neighbor: &NodeId) -> Option<&LoopRecord> {
        self.history.get(neighbor)
    }

    /// Check if no loop has been recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    fn reference<'a>(&self, ctx: &LoopContext<'a>) -> &'a Route {
        match self.config.reference {
            ReferenceRoute::Selected => ctx.selected,
            ReferenceRoute::Alternative => ctx.alternative,
        }
    }

    /// WEAK condition: the looped route is in the required preference
    /// relation with the reference route.
    fn weak_condition(&self, ctx: &LoopContext<'_>) -> bool {
        let reference = self.reference(ctx);
        reference.is_valid()
            && self
                .config
                .preference
                .holds(ctx.route.local_pref(), reference.local_pref())
    }

    /// STRONG condition: WEAK, and the part of the looped AS-PATH before
    /// this node is exactly the reference route's AS-PATH.
    fn strong_condition(&self, ctx: &LoopContext<'_>) -> bool {
        let reference = self.reference(ctx);
        self.weak_condition(ctx)
            && ctx
                .route
                .as_path()
                .prefix_before(&ctx.node)
                .is_some_and(|prefix| prefix == reference.as_path().nodes())
    }

    /// Record the event and decide recurrence given the condition outcome.
    fn observe(&mut self, ctx: &LoopContext<'_>, condition: bool) -> LoopVerdict {
        let record = self
            .history
            .entry(ctx.sender)
            .or_insert_with(|| LoopRecord {
                occurrences: 0,
                matching: 0,
                last_route: Route::invalid(),
            });

        record.occurrences += 1;
        record.last_route = ctx.route.clone();
        if condition {
            record.matching += 1;
        }

        if condition && record.matching >= self.config.min_occurrences.max(1) {
            LoopVerdict::Recurrent
        } else {
            LoopVerdict::Transient
        }
    }

    fn clear(&mut self) {
        self.history.clear();
    }
}

/// Closed set of loop responses.
#[derive(Debug, Clone, Default)]
pub enum LoopStrategy {
    /// Ignore loops beyond rejecting the route.
    #[default]
    Plain,
    /// Disable the sender when the WEAK condition holds.
    Weak(LoopDetector),
    /// Disable the sender when the STRONG condition holds.
    Strong(LoopDetector),
}

impl LoopStrategy {
    /// Strategy for a protocol variant.
    pub fn new(kind: ProtocolKind, config: DetectionConfig) -> Self {
        match kind {
            ProtocolKind::Bgp => LoopStrategy::Plain,
            ProtocolKind::SsBgp => LoopStrategy::Weak(LoopDetector::new(config)),
            ProtocolKind::IsSsBgp => LoopStrategy::Strong(LoopDetector::new(config)),
        }
    }

    /// The protocol variant this strategy implements.
    pub fn kind(&self) -> ProtocolKind {
        match self {
            LoopStrategy::Plain => ProtocolKind::Bgp,
            LoopStrategy::Weak(_) => ProtocolKind::SsBgp,
            LoopStrategy::Strong(_) => ProtocolKind::IsSsBgp,
        }
    }

    /// Detector state, if this strategy keeps any.
    pub fn detector(&self) -> Option<&LoopDetector> {
        match self {
            LoopStrategy::Plain => None,
            LoopStrategy::Weak(detector) | LoopStrategy::Strong(detector) => Some(detector),
        }
    }

    /// Decide whether a detected loop is recurrent.
    pub fn on_loop_detected(&mut self, ctx: &LoopContext<'_>) -> LoopVerdict {
        let verdict = match self {
            LoopStrategy::Plain => LoopVerdict::Transient,
            LoopStrategy::Weak(detector) => {
                let condition = detector.weak_condition(ctx);
                detector.observe(ctx, condition)
            }
            LoopStrategy::Strong(detector) => {
                let condition = detector.strong_condition(ctx);
                detector.observe(ctx, condition)
            }
        };

        debug!(
            node = %ctx.node,
            sender = %ctx.sender,
            route = %ctx.route,
            selected = %ctx.selected,
            protocol = %self.kind(),
            ?verdict,
            "Loop detected"
        );

        verdict
    }

    /// Forget all loop history.
    pub fn reset(&mut self) {
        match self {
            LoopStrategy::Plain => {}
            LoopStrategy::Weak(detector) | LoopStrategy::Strong(detector) => detector.clear(),
        }
    }
}
