//! Event queue keys with deterministic ordering.

use crate::NodeId;
use std::cmp::Ordering;

/// Key for ordering message deliveries in the queue.
///
/// Deliveries are ordered by:
/// 1. Time (earlier first)
/// 2. Receiving node (deterministic ordering)
/// 3. Sequence number (FIFO for the same time and node)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// Simulated time of delivery.
    pub time: u64,
    /// Node the message is delivered to.
    pub receiver: NodeId,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.receiver.cmp(&other.receiver))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
