//! CHP 控制流图: 带守卫与多值动作的 Petri 网, 连同信号表与初始状态.
use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::chp::netspace::{NetNameError, NetSpace};
use crate::chp::state::{State, TermIndex, Token};
use crate::config::ChpConfig;
use crate::logic::{Encoding, Expression, Parallel};
use crate::net::reduce::{ReductionError, ReductionResult, Reducer};
use crate::net::{Composition, IndexVec, Net, NetError, NetId, Node, PlaceId, Transition, TransitionId};

#[derive(Debug, Clone, Default)]
pub struct ChpGraph {
    pub name: String,
    pub net: Net,
    pub nets: NetSpace,
    /// Alternative initial states.
    pub reset: Vec<State>,
}

impl ChpGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up `name'region`, creating the net when missing.
    pub fn create_net(&mut self, text: &str) -> Result<NetId, NetNameError> {
        match self.nets.resolve(text, true)? {
            Some(net) => Ok(net),
            None => Err(NetNameError::Empty),
        }
    }

    pub fn transition(&self, index: TermIndex) -> Option<&Transition> {
        self.net.transitions.get(index.transition)
    }

    pub fn term(&self, index: TermIndex) -> Option<&Parallel> {
        self.transition(index)?.action.terms.get(index.term)
    }

    /// Reset states reduced to their token places.
    pub fn reset_markings(&self) -> Vec<Vec<PlaceId>> {
        self.reset.iter().map(State::places).collect()
    }

    /// Adds a composed process. Nets are matched by name and region; new
    /// nets join the remote group of their same-named peers. Every reset
    /// state of `self` runs in parallel with every reset state of `other`.
    /// Returns the renaming applied to `other`'s nets.
    pub fn merge(&mut self, other: &ChpGraph) -> Result<IndexVec<NetId, NetId>, NetError> {
        let mut nets: IndexVec<NetId, NetId> = IndexVec::new();
        for (_, var) in other.nets.iter() {
            let id = match self.nets.find(&var.name, var.region) {
                Some(id) => id,
                None => self.nets.create(&var.name, var.region),
            };
            nets.push(id);
        }
        for (net, var) in other.nets.iter() {
            for peer in &var.remote {
                self.nets.connect_remote(nets[net], nets[*peer]);
            }
        }

        let mut nodes: FxHashMap<Node, Node> = FxHashMap::default();
        for (id, place) in other.net.places.iter() {
            let copy = self.net.add_place(place.clone());
            nodes.insert(Node::Place(id), Node::Place(copy));
        }
        for (id, transition) in other.net.transitions.iter() {
            let copy = self.net.add_transition(transition.apply(&nets));
            nodes.insert(Node::Transition(id), Node::Transition(copy));
        }
        for (_, arc) in other.net.arcs.iter() {
            if let (Some(from), Some(to)) = (nodes.get(&arc.from), nodes.get(&arc.to)) {
                self.net.connect(*from, *to)?;
            }
        }

        let moved: Vec<State> = other
            .reset
            .iter()
            .map(|state| {
                let converted = state.convert(&|place| {
                    nodes
                        .get(&Node::Place(place))
                        .and_then(|node| node.as_place())
                        .into_iter()
                        .collect()
                });
                State::new(converted.tokens, state.encoding.remap(&nets))
            })
            .collect();
        self.reset = match (self.reset.is_empty(), moved.is_empty()) {
            (_, true) => std::mem::take(&mut self.reset),
            (true, false) => moved,
            (false, false) => self
                .reset
                .iter()
                .flat_map(|a| moved.iter().map(move |b| State::merge(Composition::Parallel, a, b)))
                .collect(),
        };
        log::debug!("merged {} into {}: {} nets", other.name, self.name, nets.len());
        Ok(nets)
    }

    /// Structural clean-up: runs the Reducer to its fixed point and carries
    /// the reset states along with any places it moved or copied.
    pub fn post_process(&mut self, config: &ChpConfig) -> Result<ReductionResult, ReductionError> {
        let mut markings = self.reset_markings();
        let result = Reducer::new(config.reduction_options()).reduce(&mut self.net, &mut markings)?;
        for (state, places) in self.reset.iter_mut().zip(markings) {
            *state = State::marking(&places, std::mem::take(&mut state.encoding));
        }
        self.dedup_reset();
        log::debug!(
            "post-processed {}: {} steps in {} rounds",
            self.name,
            result.steps.len(),
            result.rounds
        );
        Ok(result)
    }

    pub(crate) fn dedup_reset(&mut self) {
        let mut unique: Vec<State> = Vec::with_capacity(self.reset.len());
        for state in self.reset.drain(..) {
            if !unique.contains(&state) {
                unique.push(state);
            }
        }
        self.reset = unique;
    }

    /// Choice splits with their branch heads, in place order.
    pub fn split_groups(&self) -> IndexMap<PlaceId, Vec<TransitionId>> {
        self.net.split_places().into_iter().collect()
    }

    /// At most one place chooses between transitions.
    pub fn is_flat(&self) -> bool {
        self.net.split_places().len() <= 1
    }

    /// Disjunction of the guards competing with `transition` at any split
    /// feeding it.
    pub fn exclusion(&self, transition: TransitionId) -> Expression {
        let mut result = Expression::falsity();
        for place in self.net.input_places(transition) {
            let siblings = self.net.consumers(place);
            if siblings.len() < 2 {
                continue;
            }
            for sibling in siblings.into_iter().filter(|t| *t != transition) {
                if let Some(other) = self.net.transitions.get(sibling) {
                    result = result.or(other.guard.clone());
                }
            }
        }
        result
    }

    pub fn net_name(&self, net: NetId) -> String {
        self.nets.name(net)
    }

    pub fn describe_expression(&self, expr: &Expression) -> String {
        expr.render(&|net| self.nets.name(net))
    }

    /// `T3.0 [guard] action`
    pub fn describe_term(&self, index: TermIndex) -> String {
        let name = |net: NetId| self.nets.name(net);
        match (self.transition(index), self.term(index)) {
            (Some(transition), Some(term)) => format!(
                "{} [{}] {}",
                index,
                transition.guard.render(&name),
                term.render(&name)
            ),
            (Some(transition), None) => format!("{} [{}]", index, transition.guard.render(&name)),
            _ => index.to_string(),
        }
    }

    pub fn describe_encoding(&self, encoding: &Encoding) -> String {
        let literals: Vec<String> = encoding
            .to_cube()
            .iter()
            .map(|(net, value)| format!("{}={}", self.nets.name(net), value))
            .collect();
        format!("[{}]", literals.join(", "))
    }

    /// A reset state with plain tokens on `places`.
    pub fn add_reset(&mut self, places: &[PlaceId], encoding: Encoding) {
        self.reset.push(State::new(places.iter().copied().map(Token::new).collect(), encoding));
    }
}

impl fmt::Display for ChpGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph {}", self.name)?;
        for (id, transition) in self.net.transitions.iter() {
            let inputs = self.net.input_places(id);
            let outputs = self.net.output_places(id);
            let action: Vec<String> = transition
                .action
                .terms
                .iter()
                .map(|term| term.render(&|net| self.nets.name(net)))
                .collect();
            writeln!(
                f,
                "  {:?} -> {} [{}] {} -> {:?}",
                inputs,
                id,
                self.describe_expression(&transition.guard),
                action.join(" [] "),
                outputs
            )?;
        }
        for state in &self.reset {
            writeln!(f, "  reset {}", state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Assignment, Choice, Value};
    use crate::net::Place;

    fn process(name: &str, net_name: &str) -> ChpGraph {
        let mut graph = ChpGraph::new(name);
        let x = graph.create_net(net_name).unwrap();
        let p = graph.net.add_place(Place::new());
        let t = graph
            .net
            .add_transition(Transition::acting(Choice::single(vec![Assignment::new(x, true)])));
        graph.net.connect(p, t).unwrap();
        graph.net.connect(t, p).unwrap();
        let mut encoding = Encoding::new();
        encoding.set(x, Value::Zero);
        graph.add_reset(&[p], encoding);
        graph
    }

    #[test]
    fn merge_shares_nets_and_composes_resets() {
        let mut left = process("left", "x");
        let right = process("right", "x'1");
        let mapping = left.merge(&right).unwrap();
        let x0 = left.nets.lookup("x").unwrap().unwrap();
        let x1 = left.nets.lookup("x'1").unwrap().unwrap();
        assert_eq!(mapping[NetId::new(0)], x1);
        assert_eq!(left.nets.remote(x0), &[x0, x1]);

        assert_eq!(left.net.transitions.len(), 2);
        assert_eq!(left.reset.len(), 1);
        assert_eq!(left.reset[0].tokens.len(), 2);
        assert_eq!(left.reset[0].encoding.get(x1), Value::Zero);

        let copied = left.net.transition_ids()[1];
        let term = left.term(TermIndex::new(copied, 0)).unwrap();
        assert_eq!(term.actions[0].target, Some(x1));
    }

    #[test]
    fn exclusion_collects_sibling_guards() {
        let mut graph = ChpGraph::new("split");
        let a = graph.create_net("a").unwrap();
        let b = graph.create_net("b").unwrap();
        let p = graph.net.add_place(Place::new());
        let ta = graph.net.add_transition(Transition::guarded(Expression::net(a)));
        let tb = graph.net.add_transition(Transition::guarded(Expression::net(b)));
        graph.net.connect(p, ta).unwrap();
        graph.net.connect(p, tb).unwrap();
        assert_eq!(graph.exclusion(ta), Expression::net(b));
        assert!(graph.is_flat());
        assert_eq!(graph.split_groups()[&p], vec![ta, tb]);
        assert_eq!(graph.describe_term(TermIndex::new(ta, 0)), format!("{}.0 [a] skip", ta));
    }
}
