//! Hand-wired CHP graphs shared by the scenario tests.
#![allow(dead_code)]

use chp_net::chp::ChpGraph;
use chp_net::logic::{Assignment, Choice, Encoding, Expression};
use chp_net::net::{NetId, Node, Place, PlaceId, Transition, TransitionId};

pub fn send(channel: NetId) -> Choice {
    Choice::single(vec![Assignment::effect(Expression::call(
        "send",
        vec![Expression::net(channel)],
    ))])
}

pub fn assign(net: NetId, value: bool) -> Choice {
    Choice::single(vec![Assignment::new(net, value)])
}

pub fn place(graph: &mut ChpGraph) -> PlaceId {
    graph.net.add_place(Place::new())
}

/// `from -> t -> to`
pub fn step(graph: &mut ChpGraph, from: PlaceId, transition: Transition, to: PlaceId) -> TransitionId {
    let t = graph.net.add_transition(transition);
    graph
        .net
        .connect_sequence(&[Node::Place(from), Node::Transition(t), Node::Place(to)])
        .unwrap();
    t
}

pub struct Decoder {
    pub graph: ChpGraph,
    pub root: PlaceId,
    pub b0: NetId,
    pub b1: NetId,
    pub out: [NetId; 4],
}

/// `*[[b1 -> [b0 -> out3 [] ~b0 -> out2] [] ~b1 -> [b0 -> out1 [] ~b0 -> out0]]]`
pub fn decoder() -> Decoder {
    let mut graph = ChpGraph::new("decoder");
    let b0 = graph.create_net("b0").unwrap();
    let b1 = graph.create_net("b1").unwrap();
    let out = ["out0", "out1", "out2", "out3"].map(|name| graph.create_net(name).unwrap());

    let root = place(&mut graph);
    let high = place(&mut graph);
    let low = place(&mut graph);
    step(&mut graph, root, Transition::guarded(Expression::net(b1)), high);
    step(&mut graph, root, Transition::guarded(Expression::net(b1).negate()), low);
    for (split, hi, lo) in [(high, out[3], out[2]), (low, out[1], out[0])] {
        step(&mut graph, split, Transition::new(Expression::net(b0), send(hi)), root);
        step(&mut graph, split, Transition::new(Expression::net(b0).negate(), send(lo)), root);
    }
    graph.add_reset(&[root], Encoding::new());
    Decoder {
        graph,
        root,
        b0,
        b1,
        out,
    }
}

pub struct Buffer {
    pub graph: ChpGraph,
    pub root: PlaceId,
    pub receive: TransitionId,
    pub forward: TransitionId,
}

/// `*[L?x; R!x]`
pub fn buffer() -> Buffer {
    let mut graph = ChpGraph::new("buffer");
    let l = graph.create_net("L").unwrap();
    let r = graph.create_net("R").unwrap();
    let x = graph.create_net("x").unwrap();
    let root = place(&mut graph);
    let middle = place(&mut graph);
    let receive = step(
        &mut graph,
        root,
        Transition::acting(Choice::single(vec![Assignment::new(
            x,
            Expression::call("recv", vec![Expression::net(l)]),
        )])),
        middle,
    );
    let forward = step(
        &mut graph,
        middle,
        Transition::acting(Choice::single(vec![Assignment::effect(Expression::call(
            "send",
            vec![Expression::net(r), Expression::net(x)],
        ))])),
        root,
    );
    graph.add_reset(&[root], Encoding::new());
    Buffer {
        graph,
        root,
        receive,
        forward,
    }
}

pub struct Race {
    pub graph: ChpGraph,
    pub x: NetId,
    pub set: TransitionId,
    pub clear: TransitionId,
}

/// Two concurrent branches `x:=1` and `x:=0`.
pub fn race() -> Race {
    let mut graph = ChpGraph::new("race");
    let x = graph.create_net("x").unwrap();
    let (a, b) = (place(&mut graph), place(&mut graph));
    let (a_done, b_done) = (place(&mut graph), place(&mut graph));
    let set = step(&mut graph, a, Transition::acting(assign(x, true)), a_done);
    let clear = step(&mut graph, b, Transition::acting(assign(x, false)), b_done);
    graph.add_reset(&[a, b], Encoding::new());
    Race {
        graph,
        x,
        set,
        clear,
    }
}
