//! Routes and the route preference order.

use crate::{NodeId, Path};
use std::cmp::Ordering;
use std::fmt;

/// Local preference attribute. Higher is preferred.
pub type LocalPref = i32;

/// A candidate path to the destination.
///
/// An invalid route is a sentinel meaning "no usable path". Its local
/// preference and AS-PATH carry no meaning: all invalid routes compare
/// equal, and any valid route is preferred over them.
#[derive(Clone)]
pub struct Route {
    valid: bool,
    local_pref: LocalPref,
    as_path: Path,
}

impl Route {
    /// Create a valid route.
    pub fn new(local_pref: LocalPref, as_path: Path) -> Self {
        Self {
            valid: true,
            local_pref,
            as_path,
        }
    }

    /// The invalid route.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            local_pref: LocalPref::MIN,
            as_path: Path::empty(),
        }
    }

    /// The route a destination originates for itself: maximum local
    /// preference and an empty AS-PATH.
    pub fn self_route() -> Self {
        Self::new(LocalPref::MAX, Path::empty())
    }

    /// Check if this route is usable.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Local preference (meaningless for invalid routes).
    pub fn local_pref(&self) -> LocalPref {
        self.local_pref
    }

    /// AS-PATH (meaningless for invalid routes).
    pub fn as_path(&self) -> &Path {
        &self.as_path
    }

    /// Derive a route with a new local preference and `node` appended to
    /// the AS-PATH. Invalid routes stay invalid.
    pub fn extended(&self, local_pref: LocalPref, node: NodeId) -> Route {
        if !self.valid {
            return Route::invalid();
        }
        Route::new(local_pref, self.as_path.append(node))
    }

    /// Compare by preference: validity, then local preference, then
    /// AS-PATH length.
    ///
    /// `Ordering::Greater` means `self` is preferred. Ties are broken by the
    /// caller using the exporting neighbor.
    pub fn preference_cmp(&self, other: &Route) -> Ordering {
        match (self.valid, other.valid) {
            (false, false) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (true, true) => self
                .local_pref
                .cmp(&other.local_pref)
                .then_with(|| other.as_path.len().cmp(&self.as_path.len())),
        }
    }
}

impl Default for Route {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => self.local_pref == other.local_pref && self.as_path == other.as_path,
            _ => false,
        }
    }
}

impl Eq for Route {}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            f.debug_struct("Route")
                .field("local_pref", &self.local_pref)
                .field("as_path", &self.as_path)
                .finish()
        } else {
            write!(f, "Route(invalid)")
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "({}, {})", self.local_pref, self.as_path)
        } else {
            write!(f, "•")
        }
    }
}
