//! What synthesis reads from a flattened graph: the dominating split, the
//! transitions of each branch, and which nets are channels.
use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use thiserror::Error;

use crate::chp::graph::ChpGraph;
use crate::config::ChpConfig;
use crate::logic::Expression;
use crate::net::{NetId, Node, PlaceId, TransitionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("graph is not flat, splits at {0:?}")]
    NotFlat(Vec<PlaceId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelKind {
    Receive,
    Send,
    Probe,
}

/// A call-shaped sub-expression acting on a channel net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOp<'e> {
    pub kind: ChannelKind,
    pub channel: NetId,
    /// The value sent, for sends that carry one.
    pub payload: Option<&'e Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NetRole {
    /// Received from or probed.
    Input,
    /// Sent on.
    Output,
    /// Written by an assignment.
    Register,
}

/// Recognises channel calls by the function names in [`ChpConfig`].
#[derive(Debug, Clone)]
pub struct ChannelClassifier {
    recv: Vec<String>,
    send: Vec<String>,
    probe: Vec<String>,
}

impl ChannelClassifier {
    pub fn new(config: &ChpConfig) -> Self {
        Self {
            recv: config.channel_recv.clone(),
            send: config.channel_send.clone(),
            probe: config.channel_probe.clone(),
        }
    }

    pub fn kind(&self, callee: &str) -> Option<ChannelKind> {
        let named = |names: &[String]| names.iter().any(|name| name == callee);
        if named(&self.recv) {
            Some(ChannelKind::Receive)
        } else if named(&self.send) {
            Some(ChannelKind::Send)
        } else if named(&self.probe) {
            Some(ChannelKind::Probe)
        } else {
            None
        }
    }

    /// `recv(ch)`, `send(ch, e)` or `probe(ch)` at the root of `expr`.
    pub fn classify<'e>(&self, expr: &'e Expression) -> Option<ChannelOp<'e>> {
        let Expression::Call(callee, args) = expr else {
            return None;
        };
        self.classify_call(callee, args)
    }

    fn classify_call<'e>(&self, callee: &str, args: &'e [Expression]) -> Option<ChannelOp<'e>> {
        let kind = self.kind(callee)?;
        let channel = args.first()?.as_net()?;
        let payload = match kind {
            ChannelKind::Send => args.get(1),
            _ => None,
        };
        Some(ChannelOp {
            kind,
            channel,
            payload,
        })
    }

    /// Every channel call anywhere in `expr`, outermost first.
    pub fn operations<'e>(&self, expr: &'e Expression) -> Vec<ChannelOp<'e>> {
        let mut ops = Vec::new();
        expr.visit_calls(&mut |callee, args| {
            if let Some(op) = self.classify_call(callee, args) {
                ops.push(op);
            }
        });
        ops
    }

    /// Channel calls in the guard and every action term of `transition`.
    pub fn transition_operations<'g>(
        &self,
        graph: &'g ChpGraph,
        transition: TransitionId,
    ) -> Vec<ChannelOp<'g>> {
        let Some(t) = graph.net.transitions.get(transition) else {
            return Vec::new();
        };
        let mut ops = self.operations(&t.guard);
        for term in &t.action.terms {
            for assignment in &term.actions {
                ops.extend(self.operations(&assignment.expr));
            }
        }
        ops
    }

    /// Role of every net the graph touches. Channel use wins over being an
    /// assignment target; a net both sent and received on is an output.
    pub fn net_roles(&self, graph: &ChpGraph) -> IndexMap<NetId, NetRole> {
        let mut roles: IndexMap<NetId, NetRole> = IndexMap::new();
        for transition in graph.net.transition_ids() {
            for op in self.transition_operations(graph, transition) {
                let role = match op.kind {
                    ChannelKind::Send => NetRole::Output,
                    ChannelKind::Receive | ChannelKind::Probe => NetRole::Input,
                };
                let slot = roles.entry(op.channel).or_insert(role);
                if *slot == NetRole::Register || role == NetRole::Output {
                    *slot = role;
                }
            }
            let Some(t) = graph.net.transitions.get(transition) else {
                continue;
            };
            for target in t.action.written_nets() {
                roles.entry(target).or_insert(NetRole::Register);
            }
        }
        roles.sort_keys();
        roles
    }
}

/// The single split of a flat graph, or `None` for a branch-free one.
pub fn dominator(graph: &ChpGraph) -> Result<Option<PlaceId>, ChannelError> {
    let splits: Vec<PlaceId> = graph.net.split_places().into_iter().map(|(p, _)| p).collect();
    match splits.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(ChannelError::NotFlat(splits)),
    }
}

/// Transitions reachable from `head` before control returns to
/// `dominator`, `head` included.
pub fn branch_transitions(
    graph: &ChpGraph,
    dominator: PlaceId,
    head: TransitionId,
) -> BTreeSet<TransitionId> {
    let mut found = BTreeSet::new();
    let mut queue = VecDeque::from([head]);
    while let Some(transition) = queue.pop_front() {
        if !graph.net.transitions.contains(transition) || !found.insert(transition) {
            continue;
        }
        for place in graph.net.output_places(transition) {
            if place == dominator {
                continue;
            }
            queue.extend(
                graph
                    .net
                    .next(Node::Place(place))
                    .into_iter()
                    .filter_map(Node::as_transition),
            );
        }
    }
    found
}
