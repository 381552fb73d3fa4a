//! Link extenders
//!
//! An extender is the attribute transform a route undergoes when it
//! crosses a link. The protocol engine only depends on the [`Extender`]
//! trait. [`LinkExtender`] is the implementation topologies attach to
//! their links: it applies a [`LinkPolicy`] to the local preference and
//! appends the exporting node to the AS-PATH.

use crate::route::LocalPref;
use crate::{NodeId, Route};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Transform applied to a route traversing one link.
///
/// Implementations must map invalid routes to invalid routes.
pub trait Extender: fmt::Debug {
    /// Return the route as seen at the far end of the link.
    fn extend(&self, route: &Route) -> Route;
}

/// How a link rewrites the local preference of the routes crossing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LinkPolicy {
    /// Every route gets the same local preference.
    Fixed { local_pref: LocalPref },

    /// Local preference decreases by the link cost, so shorter
    /// (cheaper) routes are preferred.
    ShortestPath { cost: LocalPref },

    /// Local preference is looked up from the incoming local preference.
    /// Routes with no matching rule take `otherwise`, or are filtered
    /// (become invalid) when it is absent.
    Map {
        rules: BTreeMap<LocalPref, LocalPref>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<LocalPref>,
    },
}

impl LinkPolicy {
    /// Local preference for a route arriving with `local_pref`, or `None`
    /// if the link filters it.
    pub fn apply(&self, local_pref: LocalPref) -> Option<LocalPref> {
        match self {
            LinkPolicy::Fixed { local_pref: fixed } => Some(*fixed),
            LinkPolicy::ShortestPath { cost } => Some(local_pref.saturating_sub(*cost)),
            LinkPolicy::Map { rules, otherwise } => {
                rules.get(&local_pref).copied().or(*otherwise)
            }
        }
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        LinkPolicy::ShortestPath { cost: 1 }
    }
}

/// Extender of the link from `exporter` to some importing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkExtender {
    exporter: NodeId,
    policy: LinkPolicy,
}

impl LinkExtender {
    /// Create the extender for a link whose tail is `exporter`.
    pub fn new(exporter: NodeId, policy: LinkPolicy) -> Self {
        Self { exporter, policy }
    }

    /// The node at the exporting end of the link.
    pub fn exporter(&self) -> NodeId {
        self.exporter
    }

    /// The link's policy.
    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }
}

impl Extender for LinkExtender {
    fn extend(&self, route: &Route) -> Route {
        if !route.is_valid() {
            return Route::invalid();
        }
        match self.policy.apply(route.local_pref()) {
            Some(local_pref) => route.extended(local_pref, self.exporter),
            None => Route::invalid(),
        }
    }
}
