mod common;

use chp_net::chp::{Simulator, State, explore};
use chp_net::config::ChpConfig;
use chp_net::logic::Encoding;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn buffer_survives_reduction() {
    let mut buffer = common::buffer();
    buffer.graph.post_process(&ChpConfig::default()).unwrap();
    assert_eq!(buffer.graph.net.transitions.len(), 2);
    assert!(buffer.graph.net.transitions.contains(buffer.receive));
    assert!(buffer.graph.net.transitions.contains(buffer.forward));
}

#[test]
fn buffer_has_no_defects() {
    let buffer = common::buffer();
    let result = explore(&buffer.graph, &ChpConfig::default()).unwrap();
    assert!(result.ledger.is_empty(), "{}", result.ledger);
    assert!(result.deadlocks.is_empty());
    assert_eq!(result.stats().state_count, 2);
    assert_eq!(result.stats().edge_count, 2);
}

#[test]
fn random_walk_never_reports() {
    let buffer = common::buffer();
    let mut rng = StdRng::seed_from_u64(2024);
    let mut sim = Simulator::new(&buffer.graph, &buffer.graph.reset[0]);
    for _ in 0..200 {
        assert_eq!(sim.enabled(), 1);
        let fired = sim.fire_random(&mut rng).unwrap().unwrap();
        assert!(fired.stable);
        assert!(!fired.vacuous);
    }
    assert!(sim.deadlock().is_none());
    assert!(sim.ledger.is_empty());
}

#[test]
fn tokenless_buffer_deadlocks() {
    let buffer = common::buffer();
    let empty = State::new(Vec::new(), Encoding::new());
    let mut sim = Simulator::new(&buffer.graph, &empty);
    assert_eq!(sim.enabled(), 0);
    assert!(sim.deadlock().is_some());
    assert_eq!(sim.ledger.deadlock.len(), 1);
    assert!(!sim.ledger.has_hazards());
}
