mod common;

use chp_net::chp::{BranchFlattener, ChpGraph, Simulator};
use chp_net::config::ChpConfig;
use chp_net::logic::{Expression, Value};
use chp_net::net::{Composition, Node, Place, Transition};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn choice_merge_is_associative_and_commutative() {
    let mut graph = ChpGraph::new("algebra");
    let nets: Vec<_> = ["a", "b", "c"].iter().map(|n| graph.create_net(n).unwrap()).collect();
    let t: Vec<Transition> = nets
        .iter()
        .map(|net| Transition::new(Expression::net(*net), common::assign(*net, true)))
        .collect();
    let left = Transition::merge(
        Composition::Choice,
        &Transition::merge(Composition::Choice, &t[0], &t[1]),
        &t[2],
    );
    let right = Transition::merge(
        Composition::Choice,
        &t[0],
        &Transition::merge(Composition::Choice, &t[1], &t[2]),
    );
    let swapped = Transition::merge(Composition::Choice, &t[1], &t[0]);
    let mut l = left.action.terms.clone();
    let mut r = right.action.terms.clone();
    l.sort();
    r.sort();
    assert_eq!(l, r);
    let mut s = swapped.action.terms.clone();
    s.sort();
    let mut ab = Transition::merge(Composition::Choice, &t[0], &t[1]).action.terms;
    ab.sort();
    assert_eq!(s, ab);
}

#[test]
fn flattening_is_idempotent() {
    let mut decoder = common::decoder();
    let flattener = BranchFlattener::new(&ChpConfig::default());
    flattener.flatten(&mut decoder.graph).unwrap();
    let once = decoder.graph.to_string();
    let report = flattener.flatten(&mut decoder.graph).unwrap();
    assert_eq!(report.passes, 0);
    assert_eq!(report.rewrites, 0);
    assert_eq!(decoder.graph.to_string(), once);
}

#[test]
fn vacuous_fork_becomes_direct_arcs() {
    // start -> x:=1 -> fork -> skip -> {q0, q1, q2}, each qk -> [yk] -> end
    let mut graph = ChpGraph::new("fork");
    let x = graph.create_net("x").unwrap();
    let start = common::place(&mut graph);
    let fork = common::place(&mut graph);
    let set = common::step(&mut graph, start, Transition::acting(common::assign(x, true)), fork);
    let skip = graph.net.add_transition(Transition::default());
    graph.net.connect(fork, skip).unwrap();
    let mut successors = Vec::new();
    for k in 0..3 {
        let y = graph.create_net(&format!("y{k}")).unwrap();
        let q = graph.net.add_place(Place::new());
        let end = common::place(&mut graph);
        graph.net.connect(skip, q).unwrap();
        common::step(&mut graph, q, Transition::guarded(Expression::net(y)), end);
        successors.push(q);
    }
    graph.add_reset(&[start], Default::default());

    graph.post_process(&ChpConfig::default()).unwrap();
    assert!(graph.net.transitions.iter().all(|(_, t)| !t.is_vacuous()));
    assert_eq!(graph.net.output_places(set), successors);
    for q in &successors {
        assert_eq!(graph.net.producers(*q), vec![set]);
    }
    assert!(!graph.net.is_valid(Node::Transition(skip)));
}

#[test]
fn known_values_never_return_to_unknown() {
    for seed in 0..16u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        for graph in [common::decoder().graph, common::race().graph, common::buffer().graph] {
            let mut sim = Simulator::new(&graph, &graph.reset[0]);
            for _ in 0..rng.random_range(1..40) {
                let before = sim.global().clone();
                sim.enabled();
                if sim.fire_random(&mut rng).unwrap().is_none() {
                    break;
                }
                for (net, value) in before.iter() {
                    if value != Value::Unknown {
                        assert_ne!(sim.global().get(net), Value::Unknown, "{} lost its value", net);
                    }
                }
            }
        }
    }
}
