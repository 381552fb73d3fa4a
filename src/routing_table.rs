//! Per-node routing table.
//!
//! Stores the last route learned from each neighbor and the route the node
//! currently selects. Selection is rerun on every update, so the selected
//! route is always the best entry.

use crate::{NodeId, Route};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Routes learned from each neighbor plus the current selection.
///
/// Entries are kept in a `BTreeMap` so scans visit neighbors in identifier
/// order, which makes selection reproducible.
#[derive(Clone, Default)]
pub struct RoutingTable {
    /// Last route learned from each neighbor.
    routes: BTreeMap<NodeId, Route>,
    /// Currently selected route (invalid when nothing is selected).
    selected_route: Route,
    /// Neighbor the selected route was learned from.
    selected_neighbor: Option<NodeId>,
}

impl RoutingTable {
    /// Create an empty routing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route last learned from `neighbor`, if any.
    pub fn get(&self, neighbor: &NodeId) -> Option<&Route> {
        self.routes.get(neighbor)
    }

    /// The selected route. Invalid if no valid route is known.
    pub fn selected_route(&self) -> &Route {
        &self.selected_route
    }

    /// The neighbor the selected route was learned from.
    pub fn selected_neighbor(&self) -> Option<NodeId> {
        self.selected_neighbor
    }

    /// Number of neighbors with an entry.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate over entries in neighbor order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Route)> {
        self.routes.iter()
    }

    /// Store `route` as the latest route from `neighbor` and rerun selection.
    ///
    /// Returns true if the selected route or neighbor changed.
    pub fn update(&mut self, neighbor: NodeId, route: Route) -> bool {
        self.routes.insert(neighbor, route);
        self.select()
    }

    /// Best route among all entries except the one from `excluded`.
    ///
    /// Returns the invalid route if no other valid entry exists.
    pub fn best_excluding(&self, excluded: &NodeId) -> Route {
        self.best(Some(excluded))
            .map(|(_, route)| route.clone())
            .unwrap_or_else(Route::invalid)
    }

    /// Drop every entry and the selection.
    pub fn clear(&mut self) {
        self.routes.clear();
        self.selected_route = Route::invalid();
        self.selected_neighbor = None;
    }

    /// Rescan all entries and update the selection.
    fn select(&mut self) -> bool {
        let (neighbor, route) = match self.best(None) {
            Some((neighbor, route)) => (Some(neighbor), route.clone()),
            None => (None, Route::invalid()),
        };

        if neighbor == self.selected_neighbor && route == self.selected_route {
            return false;
        }

        self.selected_neighbor = neighbor;
        self.selected_route = route;
        true
    }

    /// Best valid entry, optionally skipping one neighbor.
    ///
    /// Preference order is validity, local preference, AS-PATH length,
    /// then lowest neighbor identifier.
    fn best(&self, excluded: Option<&NodeId>) -> Option<(NodeId, &Route)> {
        let mut best: Option<(NodeId, &Route)> = None;

        for (neighbor, route) in &self.routes {
            if !route.is_valid() || excluded == Some(neighbor) {
                continue;
            }

            let dominated = match &best {
                None => true,
                Some((best_id, best_route)) => match route.preference_cmp(best_route) {
                    Ordering::Greater => true,
                    Ordering::Equal => neighbor < best_id,
                    Ordering::Less => false,
                },
            };

            if dominated {
                best = Some((*neighbor, route));
            }
        }

        best
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("entries", &self.routes.len())
            .field("selected_neighbor", &self.selected_neighbor)
            .field("selected_route", &self.selected_route)
            .finish()
    }
}
