mod common;

use chp_net::chp::{ChpGraph, Instability, Simulator, TermIndex, explore};
use chp_net::config::ChpConfig;
use chp_net::logic::{Encoding, Expression, Value};
use chp_net::net::{NetId, Transition, TransitionId};

struct Withdrawn {
    graph: ChpGraph,
    x: NetId,
    wait: TransitionId,
    write: TransitionId,
}

/// `[x] || x:=0` starting from `x = 1`
fn withdrawn() -> Withdrawn {
    let mut graph = ChpGraph::new("withdrawn");
    let x = graph.create_net("x").unwrap();
    let (p, p_done) = (common::place(&mut graph), common::place(&mut graph));
    let (r, r_done) = (common::place(&mut graph), common::place(&mut graph));
    let wait = common::step(&mut graph, p, Transition::guarded(Expression::net(x)), p_done);
    let write = common::step(&mut graph, r, Transition::acting(common::assign(x, false)), r_done);
    let mut encoding = Encoding::new();
    encoding.set(x, Value::One);
    graph.add_reset(&[p, r], encoding);
    Withdrawn { graph, x, wait, write }
}

#[test]
fn guard_withdrawn_before_firing_is_unstable() {
    chp_net::init_logger();
    let withdrawn = withdrawn();
    let mut sim = Simulator::new(&withdrawn.graph, &withdrawn.graph.reset[0]);
    assert_eq!(sim.enabled(), 2);
    assert!(sim.ready().iter().all(|entry| entry.stable));
    assert_eq!(sim.ready()[1].index.transition, withdrawn.write);
    sim.fire(1).unwrap();
    assert_eq!(sim.global().get(withdrawn.x), Value::Zero);

    // the guard no longer holds but the wait stays ready
    assert_eq!(sim.enabled(), 1);
    let stale = &sim.ready()[0];
    assert_eq!(stale.index.transition, withdrawn.wait);
    assert!(!stale.stable);
    sim.fire(0).unwrap();

    assert_eq!(
        sim.ledger.instability,
        vec![Instability {
            term: TermIndex::new(withdrawn.wait, 0),
            history: vec![TermIndex::new(withdrawn.write, 0)],
        }]
    );
    assert!(sim.ledger.interference.is_empty());
    assert!(sim.ledger.mutex.is_empty());
}

#[test]
fn firing_the_wait_first_is_clean() {
    let withdrawn = withdrawn();
    let mut sim = Simulator::new(&withdrawn.graph, &withdrawn.graph.reset[0]);
    assert_eq!(sim.enabled(), 2);
    sim.fire(0).unwrap();
    assert_eq!(sim.enabled(), 1);
    sim.fire(0).unwrap();
    assert!(!sim.ledger.has_hazards());
}

#[test]
fn exploration_finds_the_unstable_order() {
    let withdrawn = withdrawn();
    let result = explore(&withdrawn.graph, &ChpConfig::default()).unwrap();
    assert_eq!(result.ledger.instability.len(), 1);
    let record = &result.ledger.instability[0];
    assert_eq!(record.term.transition, withdrawn.wait);
    assert_eq!(record.history, vec![TermIndex::new(withdrawn.write, 0)]);
    assert!(result.ledger.interference.is_empty());
    assert!(!result.truncated);
}
