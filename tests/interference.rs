mod common;

use chp_net::chp::{Interference, Simulator, TermIndex, explore};
use chp_net::config::ChpConfig;
use chp_net::logic::Value;

#[test]
fn concurrent_conflicting_writes_interfere_once() {
    let race = common::race();
    let mut sim = Simulator::new(&race.graph, &race.graph.reset[0]);
    assert_eq!(sim.enabled(), 2);
    let first = sim.fire(0).unwrap();
    assert_eq!(first.index.transition, race.set);
    assert_eq!(sim.enabled(), 1);
    sim.fire(0).unwrap();
    sim.enabled();

    assert_eq!(
        sim.ledger.interference,
        vec![Interference::new(
            TermIndex::new(race.set, 0),
            TermIndex::new(race.clear, 0)
        )]
    );
    assert!(sim.ledger.instability.is_empty());
    assert!(sim.ledger.mutex.is_empty());
    assert_eq!(sim.global().get(race.x), Value::Unstable);
}

#[test]
fn both_orders_report_the_same_pair() {
    let race = common::race();
    let result = explore(&race.graph, &ChpConfig::default()).unwrap();
    assert_eq!(result.ledger.interference.len(), 1);
    let record = result.ledger.interference[0];
    assert_eq!(record.first.transition, race.set);
    assert_eq!(record.second.transition, race.clear);
    assert!(!result.deadlocks.is_empty());
}
