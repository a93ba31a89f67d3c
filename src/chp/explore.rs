//! 状态空间探索: 从每个初始状态出发对仿真器做广度优先分叉.
use std::collections::VecDeque;
use std::collections::hash_map::Entry;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::chp::defects::ErrorLedger;
use crate::chp::graph::ChpGraph;
use crate::chp::simulator::{SimError, Simulator};
use crate::chp::state::{State, TermIndex};
use crate::config::ChpConfig;

#[derive(Debug, Clone)]
pub struct ExploreStats {
    pub state_count: usize,
    pub edge_count: usize,
    pub deadlock_count: usize,
    pub truncated: bool,
}

#[derive(Debug)]
pub struct Exploration {
    /// Reached states; an edge is the term fired between them.
    pub graph: StableGraph<State, TermIndex>,
    pub initial: Vec<NodeIndex>,
    pub deadlocks: FxHashSet<NodeIndex>,
    pub ledger: ErrorLedger,
    pub truncated: bool,
    states: FxHashMap<State, NodeIndex>,
}

impl Exploration {
    pub fn stats(&self) -> ExploreStats {
        ExploreStats {
            state_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            deadlock_count: self.deadlocks.len(),
            truncated: self.truncated,
        }
    }

    pub fn contains(&self, state: &State) -> bool {
        self.states.contains_key(state)
    }
}

/// Explores every reset state of `graph`, firing each ready term in turn.
/// Stops adding states once `exploration_state_limit` is reached.
///
/// States are keyed on the marking and the local encoding only. A path that
/// reaches a known state adds an edge but is not expanded again, so hazards
/// that depend only on the ready set or firing history it carried (a stale
/// entry kept from an earlier marking, say) are reported only when the first
/// path to that state carried them too.
pub fn explore(graph: &ChpGraph, config: &ChpConfig) -> Result<Exploration, SimError> {
    let mut states_graph = StableGraph::new();
    let mut states: FxHashMap<State, NodeIndex> = FxHashMap::default();
    let mut queue: VecDeque<(NodeIndex, Simulator<'_>)> = VecDeque::new();
    let mut initial = Vec::new();
    let mut deadlocks = FxHashSet::default();
    let mut ledger = ErrorLedger::new();
    let mut truncated = false;

    for reset in &graph.reset {
        let mut sim = Simulator::new(graph, reset);
        sim.enabled();
        let index = match states.entry(sim.state()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = states_graph.add_node(entry.key().clone());
                entry.insert(index);
                queue.push_back((index, sim));
                index
            }
        };
        initial.push(index);
    }

    while let Some((source, mut sim)) = queue.pop_front() {
        if sim.ready().is_empty() {
            sim.deadlock();
            deadlocks.insert(source);
            ledger.merge(&sim.ledger);
            continue;
        }
        for choice in 0..sim.ready().len() {
            let mut fork = sim.clone();
            let fired = fork.fire(choice)?;
            fork.enabled();
            let target = match states.entry(fork.state()) {
                Entry::Occupied(entry) => {
                    ledger.merge(&fork.ledger);
                    *entry.get()
                }
                Entry::Vacant(entry) => {
                    if states_graph.node_count() >= config.exploration_state_limit {
                        truncated = true;
                        ledger.merge(&fork.ledger);
                        continue;
                    }
                    let index = states_graph.add_node(entry.key().clone());
                    entry.insert(index);
                    queue.push_back((index, fork));
                    index
                }
            };
            states_graph.add_edge(source, target, fired.index);
        }
        ledger.merge(&sim.ledger);
    }

    if truncated {
        log::warn!(
            "exploration of {} stopped at {} states",
            graph.name,
            config.exploration_state_limit
        );
    }
    Ok(Exploration {
        graph: states_graph,
        initial,
        deadlocks,
        ledger,
        truncated,
        states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Assignment, Choice, Encoding};
    use crate::net::{Place, Transition};
    use petgraph::Direction;
    use petgraph::visit::EdgeRef;

    fn counter() -> ChpGraph {
        // p0 -> a:=1 -> p1 -> b:=1 -> p2, a dead end
        let mut graph = ChpGraph::new("line");
        let a = graph.create_net("a").unwrap();
        let b = graph.create_net("b").unwrap();
        let places: Vec<_> = (0..3).map(|_| graph.net.add_place(Place::new())).collect();
        for (net, w) in [(a, 0), (b, 1)] {
            let t = graph
                .net
                .add_transition(Transition::acting(Choice::single(vec![Assignment::new(net, true)])));
            graph.net.connect(places[w], t).unwrap();
            graph.net.connect(t, places[w + 1]).unwrap();
        }
        graph.add_reset(&[places[0]], Encoding::new());
        graph
    }

    #[test]
    fn line_ends_in_one_deadlock() {
        let graph = counter();
        let result = explore(&graph, &ChpConfig::default()).unwrap();
        let stats = result.stats();
        assert_eq!(stats.state_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.deadlock_count, 1);
        assert_eq!(result.ledger.deadlock.len(), 1);
        assert!(!result.ledger.has_hazards());
        assert!(result.contains(&graph.reset[0]));
    }

    #[test]
    fn converging_paths_share_a_node() {
        // x:=1 || y:=1
        let mut graph = ChpGraph::new("diamond");
        let mut starts = Vec::new();
        for name in ["x", "y"] {
            let net = graph.create_net(name).unwrap();
            let from = graph.net.add_place(Place::new());
            let to = graph.net.add_place(Place::new());
            let t = graph
                .net
                .add_transition(Transition::acting(Choice::single(vec![Assignment::new(net, true)])));
            graph.net.connect(from, t).unwrap();
            graph.net.connect(t, to).unwrap();
            starts.push(from);
        }
        graph.add_reset(&starts, Encoding::new());

        let result = explore(&graph, &ChpConfig::default()).unwrap();
        let stats = result.stats();
        assert_eq!(stats.state_count, 4);
        assert_eq!(stats.edge_count, 4);
        assert_eq!(stats.deadlock_count, 1);
        let end = *result.deadlocks.iter().next().unwrap();
        let arrivals: Vec<TermIndex> = result
            .graph
            .edges_directed(end, Direction::Incoming)
            .map(|edge| *edge.weight())
            .collect();
        assert_eq!(arrivals.len(), 2);
        assert_ne!(arrivals[0], arrivals[1]);
        assert!(!result.ledger.has_hazards());
    }

    #[test]
    fn state_limit_truncates() {
        let graph = counter();
        let config = ChpConfig {
            exploration_state_limit: 2,
            ..ChpConfig::default()
        };
        let result = explore(&graph, &config).unwrap();
        assert!(result.truncated);
        assert_eq!(result.stats().state_count, 2);
        assert!(result.deadlocks.is_empty());
    }
}
