//! Tests for the simulation runner.

use super::*;
use crate::config::LinkConfig;
use crate::extender::{Extender, LinkExtender, LinkPolicy};
use crate::protocol::{ReferenceRoute, Update};
use crate::{LocalPref, Path};
use std::sync::Arc;

fn node(id: u32) -> NodeId {
    NodeId::new(id)
}

fn link(from: u32, to: u32, policy: LinkPolicy) -> LinkConfig {
    LinkConfig {
        from: node(from),
        to: node(to),
        policy,
    }
}

/// Three nodes around destination 0, each preferring the route through its
/// ring neighbor over the direct one. Plain BGP oscillates forever.
fn dispute_ring() -> Topology {
    let direct = LinkPolicy::Fixed { local_pref: 10 };
    let ring = LinkPolicy::Map {
        rules: [(10, 20), (20, 30), (30, 40)].into_iter().collect(),
        otherwise: None,
    };
    Topology::new(
        node(0),
        vec![
            link(0, 1, direct.clone()),
            link(0, 2, direct.clone()),
            link(0, 3, direct),
            link(2, 1, ring.clone()),
            link(3, 2, ring.clone()),
            link(1, 3, ring),
        ],
    )
    .unwrap()
}

fn line(length: u32) -> Topology {
    let links = (0..length)
        .map(|i| link(i, i + 1, LinkPolicy::default()))
        .collect();
    Topology::new(node(0), links).unwrap()
}

fn bounded() -> SimulationConfig {
    SimulationConfig {
        max_messages: 1_000,
        ..Default::default()
    }
}

fn run(topology: &Topology, kind: ProtocolKind, detection: DetectionConfig) -> SimulationReport {
    Simulator::new(topology, kind, &detection, bounded())
        .unwrap()
        .run()
        .unwrap()
}

fn message(sender: u32, receiver: u32) -> Message {
    let extender: Arc<dyn Extender> =
        Arc::new(LinkExtender::new(node(sender), LinkPolicy::default()));
    Message {
        sender: node(sender),
        receiver: node(receiver),
        update: Update::Withdraw,
        extender,
    }
}

// ===== Convergence =====

#[test]
fn test_line_converges_to_shortest_paths() {
    let report = run(&line(3), ProtocolKind::Bgp, DetectionConfig::default());

    assert!(report.converged);
    assert_eq!(report.loops_detected, 0);
    assert_eq!(report.messages, 3);
    assert_eq!(report.final_time, 3);

    let last = &report.nodes[&node(3)];
    assert_eq!(last.selected_neighbor, Some(node(2)));
    assert_eq!(
        last.selected_route,
        Route::new(LocalPref::MAX - 3, Path::new(vec![node(0), node(1), node(2)]))
    );
}

#[test]
fn test_destination_selects_itself() {
    let report = run(&line(1), ProtocolKind::Bgp, DetectionConfig::default());

    let destination = &report.nodes[&node(0)];
    assert_eq!(destination.selected_neighbor, Some(node(0)));
    assert_eq!(destination.selected_route, Route::self_route());
}

#[test]
fn test_equal_routes_prefer_lowest_neighbor() {
    let topology = Topology::new(
        node(0),
        vec![
            link(0, 2, LinkPolicy::default()),
            link(0, 1, LinkPolicy::default()),
            link(2, 3, LinkPolicy::default()),
            link(1, 3, LinkPolicy::default()),
        ],
    )
    .unwrap();

    let report = run(&topology, ProtocolKind::Bgp, DetectionConfig::default());

    assert!(report.converged);
    assert_eq!(report.nodes[&node(3)].selected_neighbor, Some(node(1)));
}

#[test]
fn test_unreachable_node_has_no_route() {
    let topology = Topology::new(
        node(0),
        vec![link(0, 1, LinkPolicy::default()), link(2, 1, LinkPolicy::default())],
    )
    .unwrap();

    let report = run(&topology, ProtocolKind::Bgp, DetectionConfig::default());

    let isolated = &report.nodes[&node(2)];
    assert!(report.converged);
    assert_eq!(isolated.selected_neighbor, None);
    assert!(!isolated.selected_route.is_valid());
}

// ===== Dispute ring =====

#[test]
fn test_plain_bgp_oscillates_on_dispute_ring() {
    let report = run(&dispute_ring(), ProtocolKind::Bgp, DetectionConfig::default());

    assert!(!report.converged);
    assert_eq!(report.messages, 1_000);
    assert!(report.loops_detected > 0);
    assert_eq!(report.disabled_count(), 0);
}

#[test]
fn test_ssbgp_breaks_dispute_ring() {
    let report = run(&dispute_ring(), ProtocolKind::SsBgp, DetectionConfig::default());

    assert!(report.converged);
    assert_eq!(report.messages, 15);
    assert_eq!(report.loops_detected, 3);

    for (id, disabled) in [(1, 2), (2, 3), (3, 1)] {
        let state = &report.nodes[&node(id)];
        assert_eq!(state.selected_neighbor, Some(node(0)));
        assert_eq!(state.selected_route, Route::new(10, Path::new(vec![node(0)])));
        assert_eq!(state.disabled, vec![node(disabled)]);
    }
}

#[test]
fn test_issbgp_with_selected_reference_keeps_oscillating() {
    let report = run(&dispute_ring(), ProtocolKind::IsSsBgp, DetectionConfig::default());

    assert!(!report.converged);
    assert_eq!(report.disabled_count(), 0);
}

#[test]
fn test_issbgp_with_alternative_reference_breaks_dispute_ring() {
    let detection = DetectionConfig {
        reference: ReferenceRoute::Alternative,
        ..Default::default()
    };
    let report = run(&dispute_ring(), ProtocolKind::IsSsBgp, detection);

    assert!(report.converged);
    assert_eq!(report.loops_detected, 3);
    assert_eq!(report.disabled_count(), 3);
    assert_eq!(report.nodes[&node(2)].disabled, vec![node(3)]);
}

// ===== Budgets =====

#[test]
fn test_time_budget_stops_run() {
    let config = SimulationConfig {
        max_time: Some(2),
        ..Default::default()
    };
    let mut simulator =
        Simulator::new(&line(5), ProtocolKind::Bgp, &DetectionConfig::default(), config).unwrap();

    let report = simulator.run().unwrap();

    assert!(!report.converged);
    assert_eq!(report.messages, 2);
    assert_eq!(report.final_time, 2);
    assert_eq!(simulator.pending(), 1);
}

// ===== Determinism =====

#[test]
fn test_same_seed_same_report() {
    let config = SimulationConfig {
        seed: 42,
        min_delay: 1,
        max_delay: 20,
        max_messages: 1_000,
        max_time: None,
    };
    let detection = DetectionConfig::default();

    let mut first =
        Simulator::new(&dispute_ring(), ProtocolKind::SsBgp, &detection, config.clone()).unwrap();
    let mut second =
        Simulator::new(&dispute_ring(), ProtocolKind::SsBgp, &detection, config).unwrap();

    let report = first.run().unwrap();
    assert_eq!(report, second.run().unwrap());
    assert_eq!(report, first.run().unwrap(), "Rerun after reset should match");
}

#[test]
fn test_reset_clears_nodes_and_queue() {
    let mut simulator = Simulator::new(
        &dispute_ring(),
        ProtocolKind::SsBgp,
        &DetectionConfig::default(),
        bounded(),
    )
    .unwrap();
    simulator.run().unwrap();
    assert!(!simulator.node(&node(1)).unwrap().disabled_neighbors().is_empty());

    simulator.reset();

    assert_eq!(simulator.pending(), 0);
    for id in 0..4 {
        let protocol = simulator.node(&node(id)).unwrap();
        assert!(protocol.routing_table().is_empty());
        assert!(protocol.disabled_neighbors().is_empty());
    }
}

// ===== Scheduling =====

#[test]
fn test_link_delivery_is_fifo() {
    let config = SimulationConfig {
        seed: 3,
        min_delay: 1,
        max_delay: 50,
        ..Default::default()
    };
    let mut simulator =
        Simulator::new(&line(2), ProtocolKind::Bgp, &DetectionConfig::default(), config).unwrap();

    simulator.schedule((0..20).map(|_| message(0, 1)).collect());

    let delivery_order: Vec<u64> = simulator.queue.keys().map(|key| key.sequence).collect();
    assert_eq!(delivery_order, (0..20).collect::<Vec<_>>(), "Link delivery reordered");
}

#[test]
fn test_delays_within_range() {
    let config = SimulationConfig {
        seed: 9,
        min_delay: 4,
        max_delay: 8,
        ..Default::default()
    };
    let mut simulator =
        Simulator::new(&line(3), ProtocolKind::Bgp, &DetectionConfig::default(), config).unwrap();

    simulator.schedule(vec![message(0, 1), message(1, 2), message(2, 3)]);

    for key in simulator.queue.keys() {
        assert!((4..=8).contains(&key.time));
    }
}

// ===== Errors =====

#[test]
fn test_saturating_delay_does_not_overflow() {
    let config = SimulationConfig {
        min_delay: u64::MAX,
        max_delay: u64::MAX,
        ..Default::default()
    };
    let mut simulator =
        Simulator::new(&line(2), ProtocolKind::Bgp, &DetectionConfig::default(), config).unwrap();

    let report = simulator.run().unwrap();

    assert!(report.converged);
    assert_eq!(report.messages, 2);
    assert_eq!(report.final_time, u64::MAX);
    assert_eq!(report.nodes[&node(2)].selected_neighbor, Some(node(1)));
}

#[test]
fn test_delivery_to_unknown_node() {
    let mut simulator =
        Simulator::new(&line(2), ProtocolKind::Bgp, &DetectionConfig::default(), bounded())
            .unwrap();

    let result = simulator.deliver(&message(0, 9));
    assert!(matches!(result, Err(SimulationError::UnknownNode(id)) if id == node(9)));
}

#[test]
fn test_delivery_from_non_neighbor_aborts() {
    let mut simulator =
        Simulator::new(&line(2), ProtocolKind::Bgp, &DetectionConfig::default(), bounded())
            .unwrap();

    let result = simulator.deliver(&message(2, 1));
    assert!(matches!(
        result,
        Err(SimulationError::Protocol(ProtocolError::UnknownNeighbor { .. }))
    ));
    assert!(simulator.node(&node(1)).unwrap().routing_table().is_empty());
}

#[test]
fn test_invalid_delay_range() {
    let config = SimulationConfig {
        min_delay: 5,
        max_delay: 2,
        ..Default::default()
    };
    let result = Simulator::new(&line(1), ProtocolKind::Bgp, &DetectionConfig::default(), config);

    assert!(matches!(
        result,
        Err(SimulationError::InvalidDelay { min: 5, max: 2 })
    ));
}

#[test]
fn test_from_config_reports_topology_error() {
    let yaml = "topology:\n  destination: 7\n  links:\n    - { from: 0, to: 1 }\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    let result = Simulator::from_config(&config);
    assert!(matches!(result, Err(SimulationError::Topology(_))));
}
