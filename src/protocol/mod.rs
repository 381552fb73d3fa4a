//! Path-vector protocol engine
//!
//! One [`Protocol`] instance runs on behalf of one node. It reacts to the
//! routing messages delivered to that node: the route is imported through
//! the link's extender, checked for loops, stored in the routing table, and
//! if the selection changes the new selection is exported to every enabled
//! out-neighbor.
//!
//! The engine is synchronous and performs no I/O. Outbound messages are
//! returned to the caller in [`ProcessOutcome::exports`], and delivering
//! them is the caller's job.

mod detection;

use crate::extender::Extender;
use crate::{NodeId, Route, RoutingTable};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

pub use detection::{
    DetectionConfig, LoopContext, LoopDetector, LoopRecord, LoopStrategy, LoopVerdict,
    PreferenceCondition, ProtocolKind, ReferenceRoute, UnknownProtocol,
};

/// Errors raised when a message violates the delivery contract.
///
/// The message is rejected as a whole and no protocol state changes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("node {node} received a message from {sender}, which is not an in-neighbor")]
    UnknownNeighbor { node: NodeId, sender: NodeId },

    #[error("node {node} received a message addressed to {receiver}")]
    MisaddressedMessage { node: NodeId, receiver: NodeId },
}

/// Content of a routing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// The sender's selected route.
    Advertise(Route),
    /// The sender no longer has a valid route.
    Withdraw,
}

impl Update {
    /// The route carried by this update. A withdrawal carries the invalid route.
    pub fn route(&self) -> Route {
        match self {
            Update::Advertise(route) => route.clone(),
            Update::Withdraw => Route::invalid(),
        }
    }

    /// Check if this is a withdrawal.
    pub fn is_withdraw(&self) -> bool {
        matches!(self, Update::Withdraw)
    }
}

/// A routing message travelling over one link.
#[derive(Clone)]
pub struct Message {
    /// Exporting node.
    pub sender: NodeId,
    /// Importing node.
    pub receiver: NodeId,
    /// Advertisement or withdrawal.
    pub update: Update,
    /// Extender of the link from `sender` to `receiver`.
    pub extender: Arc<dyn Extender>,
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("update", &self.update)
            .finish()
    }
}

/// Outbound link of a node: the neighbor it exports to and the extender
/// routes undergo on the way.
#[derive(Debug, Clone)]
pub struct OutLink {
    /// The importing neighbor.
    pub neighbor: NodeId,
    /// Transform applied by the link.
    pub extender: Arc<dyn Extender>,
}

impl OutLink {
    /// Create an out-link.
    pub fn new(neighbor: NodeId, extender: Arc<dyn Extender>) -> Self {
        Self { neighbor, extender }
    }
}

/// Result of handling one message (or starting the protocol).
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    /// The selected route or neighbor changed.
    pub selection_changed: bool,
    /// The imported route contained this node.
    pub loop_detected: bool,
    /// Neighbor disabled while handling this message.
    pub disabled: Option<NodeId>,
    /// The message came from a disabled neighbor and was ignored.
    pub dropped: bool,
    /// Messages to deliver, one per enabled out-neighbor.
    pub exports: Vec<Message>,
}

impl ProcessOutcome {
    fn dropped() -> Self {
        Self {
            dropped: true,
            ..Default::default()
        }
    }
}

/// Protocol state of a single node.
pub struct Protocol {
    /// The node running this instance.
    node: NodeId,
    /// Whether this node originates the destination route.
    origin: bool,
    /// Neighbors allowed to send messages to this node.
    in_neighbors: BTreeSet<NodeId>,
    /// Neighbors this node exports to, keyed by neighbor.
    out_links: BTreeMap<NodeId, OutLink>,
    /// Routes learned per neighbor and the current selection.
    table: RoutingTable,
    /// Loop response.
    strategy: LoopStrategy,
    /// Neighbors suppressed by the loop response.
    disabled: BTreeSet<NodeId>,
    /// Whether the last `process` call changed the selection.
    selection_updated: bool,
}

impl Protocol {
    /// Create a protocol instance for `node`.
    pub fn new(
        node: NodeId,
        in_neighbors: impl IntoIterator<Item = NodeId>,
        out_links: impl IntoIterator<Item = OutLink>,
        strategy: LoopStrategy,
    ) -> Self {
        Self {
            node,
            origin: false,
            in_neighbors: in_neighbors.into_iter().collect(),
            out_links: out_links
                .into_iter()
                .map(|link| (link.neighbor, link))
                .collect(),
            table: RoutingTable::new(),
            strategy,
            disabled: BTreeSet::new(),
            selection_updated: false,
        }
    }

    /// Mark this node as the destination: `start` will originate its route.
    pub fn with_origin(mut self, origin: bool) -> Self {
        self.origin = origin;
        self
    }

    /// The node running this instance.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Check if this node originates the destination route.
    pub fn is_origin(&self) -> bool {
        self.origin
    }

    /// Protocol variant.
    pub fn kind(&self) -> ProtocolKind {
        self.strategy.kind()
    }

    /// Routing table (read-only).
    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    /// Loop response and its history.
    pub fn strategy(&self) -> &LoopStrategy {
        &self.strategy
    }

    /// Neighbors disabled by the loop response.
    pub fn disabled_neighbors(&self) -> &BTreeSet<NodeId> {
        &self.disabled
    }

    /// Check if `neighbor` has been disabled.
    pub fn is_disabled(&self, neighbor: &NodeId) -> bool {
        self.disabled.contains(neighbor)
    }

    /// Whether the last call to `process` changed the selected route.
    pub fn was_selected_route_updated(&self) -> bool {
        self.selection_updated
    }

    /// Start the protocol.
    ///
    /// The destination installs its self route and exports it. Other nodes
    /// wait for messages.
    pub fn start(&mut self) -> ProcessOutcome {
        if !self.origin {
            return ProcessOutcome::default();
        }

        let changed = self.table.update(self.node, Route::self_route());
        debug!(node = %self.node, "Originating destination route");

        ProcessOutcome {
            selection_changed: changed,
            exports: if changed { self.export_selected() } else { Vec::new() },
            ..Default::default()
        }
    }

    /// Handle one routing message delivered to this node.
    ///
    /// Fails without touching any state if the message does not come from
    /// an in-neighbor or is addressed to another node.
    pub fn process(&mut self, message: &Message) -> Result<ProcessOutcome, ProtocolError> {
        self.selection_updated = false;

        if message.receiver != self.node {
            return Err(ProtocolError::MisaddressedMessage {
                node: self.node,
                receiver: message.receiver,
            });
        }
        let sender = message.sender;
        if !self.in_neighbors.contains(&sender) {
            return Err(ProtocolError::UnknownNeighbor {
                node: self.node,
                sender,
            });
        }

        if self.disabled.contains(&sender) {
            trace!(node = %self.node, sender = %sender, "Dropping message from disabled neighbor");
            return Ok(ProcessOutcome::dropped());
        }

        let imported = self.import(&message.update.route(), message.extender.as_ref());
        let learned = self.learn(sender, imported.clone());

        let mut outcome = ProcessOutcome {
            loop_detected: imported.is_valid() && !learned.is_valid(),
            disabled: self.disabled.contains(&sender).then_some(sender),
            ..Default::default()
        };

        outcome.selection_changed = self.table.update(sender, learned);
        self.selection_updated = outcome.selection_changed;

        if outcome.selection_changed {
            debug!(
                node = %self.node,
                neighbor = ?self.table.selected_neighbor(),
                route = %self.table.selected_route(),
                "Selected route changed"
            );
            outcome.exports = self.export_selected();
        }

        Ok(outcome)
    }

    /// Apply the link's extender to a received route.
    pub fn import(&self, route: &Route, extender: &dyn Extender) -> Route {
        extender.extend(route)
    }

    /// Accept `route` unless its AS-PATH already contains this node.
    ///
    /// A looped route is handed to the loop response before the invalid
    /// route is returned. A recurrent verdict disables `sender`. The
    /// destination rejects looped routes without consulting the loop
    /// response.
    pub fn learn(&mut self, sender: NodeId, route: Route) -> Route {
        if !route.is_valid() || !route.as_path().contains(&self.node) {
            return route;
        }

        // The destination's own id heads every path it gets back, and it
        // cannot take part in a dispute.
        if self.origin {
            trace!(node = %self.node, sender = %sender, "Destination rejected returning route");
            return Route::invalid();
        }

        let alternative = self.table.best_excluding(&sender);
        let ctx = LoopContext {
            node: self.node,
            sender,
            route: &route,
            selected: self.table.selected_route(),
            alternative: &alternative,
        };

        if self.strategy.on_loop_detected(&ctx) == LoopVerdict::Recurrent
            && self.disabled.insert(sender)
        {
            info!(node = %self.node, neighbor = %sender, "Disabled neighbor after recurrent loop");
        }

        Route::invalid()
    }

    /// Build one message carrying `route` per enabled out-neighbor.
    ///
    /// An invalid route is sent as a withdrawal.
    pub fn export(&self, route: &Route) -> Vec<Message> {
        let update = if route.is_valid() {
            Update::Advertise(route.clone())
        } else {
            Update::Withdraw
        };

        self.out_links
            .values()
            .filter(|link| !self.disabled.contains(&link.neighbor))
            .map(|link| Message {
                sender: self.node,
                receiver: link.neighbor,
                update: update.clone(),
                extender: Arc::clone(&link.extender),
            })
            .collect()
    }

    /// Return to the initial state: empty table, no disabled neighbors,
    /// no loop history.
    pub fn reset(&mut self) {
        self.table.clear();
        self.disabled.clear();
        self.strategy.reset();
        self.selection_updated = false;
    }

    fn export_selected(&self) -> Vec<Message> {
        self.export(self.table.selected_route())
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("node", &self.node)
            .field("kind", &self.kind())
            .field("origin", &self.origin)
            .field("in_neighbors", &self.in_neighbors.len())
            .field("out_links", &self.out_links.len())
            .field("table", &self.table)
            .field("disabled", &self.disabled)
            .finish()
    }
}
