//! 嵌套条件分支展平.
//!
//! 把 "选择中的选择" 改写为挂在单个支配分支库所下的扁平多路选择:
//!
//! 1. 对每个分支库所的每个分支头做广度优先遍历, 遇到下一个分支库所 (或无
//!    后继的库所) 即停止, 得到分支体与出口;
//! 2. 在分支库所之间建立投影图, 出度最大者 (编号最小者优先) 为支配者;
//! 3. 支配者每个出口恰为子分支库所的分支, 与该子库所的每个分支两两拼接:
//!    守卫取合取, 动作序列首尾相接, 拷贝后直接挂到支配者下;
//! 4. 原分支头与支配者断开, 不可达部分随后被剪除.
//!
//! 全部轮次结束后, 初始标识沿网前推至支配者, 最后重新运行 Reducer.
use std::collections::VecDeque;

use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::chp::graph::ChpGraph;
use crate::chp::state::{State, Token};
use crate::config::ChpConfig;
use crate::logic::Expression;
use crate::net::reduce::ReductionError;
use crate::net::{Composition, Net, NetError, Node, PlaceId, Transition, TransitionId};

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("branches still nested after {0} flattening passes")]
    PassLimit(usize),
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Reduction(#[from] ReductionError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenReport {
    pub passes: usize,
    /// Branches created under the dominator.
    pub rewrites: usize,
    pub dominator: Option<PlaceId>,
    /// Transitions fired while moving reset states onto the dominator.
    pub reset_steps: usize,
}

/// One branch of a split: its head, the nodes it runs through before the
/// next split, and the places where it leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub head: TransitionId,
    pub body: Vec<Node>,
    pub exits: Vec<PlaceId>,
}

impl Branch {
    /// Breadth-first walk from `head`, stopping at split places and at
    /// places nothing consumes.
    pub fn trail(net: &Net, head: TransitionId, splits: &FxHashSet<PlaceId>) -> Self {
        let mut body = Vec::new();
        let mut exits = Vec::new();
        let mut seen: FxHashSet<Node> = FxHashSet::default();
        seen.insert(Node::Transition(head));
        let mut queue: VecDeque<PlaceId> = net.output_places(head).into();
        while let Some(place) = queue.pop_front() {
            if !seen.insert(Node::Place(place)) {
                continue;
            }
            let consumers = net.consumers(place);
            if splits.contains(&place) || consumers.is_empty() {
                exits.push(place);
                continue;
            }
            body.push(Node::Place(place));
            for transition in consumers {
                if seen.insert(Node::Transition(transition)) {
                    body.push(Node::Transition(transition));
                    queue.extend(net.output_places(transition));
                }
            }
        }
        exits.sort();
        Self { head, body, exits }
    }
}

/// Split places as nodes, an edge wherever a branch of one split leaves
/// into another.
#[derive(Debug, Default)]
pub struct SplitProjection {
    pub graph: DiGraph<PlaceId, ()>,
    pub branches: FxHashMap<PlaceId, Vec<Branch>>,
    index: FxHashMap<PlaceId, NodeIndex>,
}

impl SplitProjection {
    pub fn build(net: &Net) -> Self {
        let splits = net.split_places();
        let split_set: FxHashSet<PlaceId> = splits.iter().map(|(place, _)| *place).collect();
        let mut projection = SplitProjection::default();
        for (place, _) in &splits {
            let node = projection.graph.add_node(*place);
            projection.index.insert(*place, node);
        }
        for (place, heads) in splits {
            let branches: Vec<Branch> = heads
                .into_iter()
                .map(|head| Branch::trail(net, head, &split_set))
                .collect();
            for exit in branches.iter().flat_map(|b| &b.exits) {
                if let Some(to) = projection.index.get(exit) {
                    projection.graph.update_edge(projection.index[&place], *to, ());
                }
            }
            projection.branches.insert(place, branches);
        }
        projection
    }

    /// The split with the most distinct successors, lowest place first.
    pub fn dominator(&self) -> Option<PlaceId> {
        self.graph
            .node_indices()
            .map(|node| (self.graph.neighbors(node).count(), self.graph[node]))
            .max_by(|(da, pa), (db, pb)| da.cmp(db).then(pb.cmp(pa)))
            .map(|(_, place)| place)
    }
}

pub struct BranchFlattener {
    config: ChpConfig,
}

impl BranchFlattener {
    pub fn new(config: &ChpConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn flatten(&self, graph: &mut ChpGraph) -> Result<FlattenReport, FlattenError> {
        let mut report = FlattenReport::default();
        while !graph.is_flat() {
            if report.passes >= self.config.flatten_max_passes {
                return Err(FlattenError::PassLimit(report.passes));
            }
            report.passes += 1;
            let rewrites = self.absorb_children(graph)?;
            if rewrites == 0 {
                log::warn!(
                    "{}: {} splits remain but none nests under the dominator",
                    graph.name,
                    graph.net.split_places().len()
                );
                break;
            }
            report.rewrites += rewrites;
        }

        report.dominator = SplitProjection::build(&graph.net).dominator();
        if let Some(dominator) = report.dominator {
            report.reset_steps = self.walk_reset(graph, dominator);
        }
        graph.post_process(&self.config)?;
        log::debug!(
            "flattened {} in {} passes, {} branches rewritten",
            graph.name,
            report.passes,
            report.rewrites
        );
        Ok(report)
    }

    /// One pass: every dominator branch that leads straight into a child
    /// split is replaced by one branch per child branch.
    fn absorb_children(&self, graph: &mut ChpGraph) -> Result<usize, FlattenError> {
        let projection = SplitProjection::build(&graph.net);
        let Some(dominator) = projection.dominator() else {
            return Ok(0);
        };
        let mut rewrites = 0;
        let parents = projection.branches.get(&dominator).cloned().unwrap_or_default();
        for parent in &parents {
            let &[child] = parent.exits.as_slice() else {
                continue;
            };
            if child == dominator {
                continue;
            }
            let Some(children) = projection.branches.get(&child) else {
                continue;
            };
            for branch in children {
                splice_pair(&mut graph.net, dominator, parent, branch, child)?;
                rewrites += 1;
            }
            for arc in graph.net.in_arcs(Node::Transition(parent.head)) {
                graph.net.disconnect(arc)?;
            }
            log::debug!("absorbed split {} into {} through {}", child, dominator, parent.head);
        }
        if rewrites > 0 {
            let mut roots: Vec<PlaceId> = graph.reset_markings().into_iter().flatten().collect();
            roots.push(dominator);
            roots.extend(
                graph
                    .net
                    .place_ids()
                    .into_iter()
                    .filter(|place| graph.net.producers(*place).is_empty()),
            );
            graph.net.prune_unreachable(&roots);
        }
        Ok(rewrites)
    }

    /// Moves every reset state forward until it holds the dominator, then
    /// folds the states that got there into one. Other processes keep their
    /// tokens.
    fn walk_reset(&self, graph: &mut ChpGraph, dominator: PlaceId) -> usize {
        let region = graph.net.reaching(dominator);
        let mut total = 0;
        let mut states = std::mem::take(&mut graph.reset);
        for state in &mut states {
            let (walked, steps) = self.walk_state(graph, state, dominator, &region);
            total += steps;
            *state = walked;
        }
        let (arrived, others): (Vec<State>, Vec<State>) =
            states.into_iter().partition(|state| state.contains(dominator));
        graph.reset = others;
        let mut arrived = arrived.iter().map(|state| settle(state, dominator, &region));
        if let Some(first) = arrived.next() {
            let merged = arrived.fold(first, |acc, state| State::merge(Composition::Choice, &acc, &state));
            graph.reset.insert(0, merged);
        }
        graph.dedup_reset();
        total
    }

    /// Moves the tokens of `state` that belong to the dominator's process
    /// until one of them sits on `dominator`. Tokens outside `region` stay put.
    fn walk_state(
        &self,
        graph: &ChpGraph,
        state: &State,
        dominator: PlaceId,
        region: &FxHashSet<Node>,
    ) -> (State, usize) {
        let mut places = state.places();
        let mut encoding = state.encoding.clone();
        let mut visited: FxHashSet<Vec<PlaceId>> = FxHashSet::default();
        let mut steps = 0;
        while !places.contains(&dominator) {
            if steps >= self.config.reset_walk_limit {
                log::warn!("reset walk gave up after {} steps", steps);
                return (state.clone(), 0);
            }
            if !visited.insert(places.clone()) {
                log::warn!("reset walk cycles without reaching {}", dominator);
                return (state.clone(), 0);
            }
            let Some(enabling) = graph.net.enabled(&places).into_iter().find(|e| {
                region.contains(&Node::Transition(e.transition))
                    && graph
                        .net
                        .transitions
                        .get(e.transition)
                        .is_some_and(|t| t.action.terms.len() <= 1)
            }) else {
                return (state.clone(), 0);
            };
            let transition = &graph.net.transitions[enabling.transition];
            if let Some(term) = transition.action.terms.first() {
                let local = term.evaluate(&encoding);
                encoding.assign(&graph.nets.project_remote(&local), true);
            }
            for index in enabling.tokens.iter().rev() {
                places.remove(*index);
            }
            places.extend(graph.net.output_places(enabling.transition));
            places.sort();
            places.dedup();
            steps += 1;
        }
        let tokens = state
            .tokens
            .iter()
            .filter(|token| !region.contains(&Node::Place(token.place)))
            .cloned()
            .chain(places.iter().copied().filter(|place| region.contains(&Node::Place(*place))).map(Token::new))
            .collect();
        (State::new(tokens, encoding), steps)
    }
}

/// Replaces the tokens of `state` inside `region` with a single token on
/// `dominator`.
fn settle(state: &State, dominator: PlaceId, region: &FxHashSet<Node>) -> State {
    let tokens = state
        .tokens
        .iter()
        .filter(|token| !region.contains(&Node::Place(token.place)))
        .cloned()
        .chain(std::iter::once(Token::new(dominator)))
        .collect();
    State::new(tokens, state.encoding.clone())
}

/// Adds one flattened branch under `dominator`: `parent` runs into
/// `split`, after which `child` runs.
fn splice_pair(
    net: &mut Net,
    dominator: PlaceId,
    parent: &Branch,
    child: &Branch,
    split: PlaceId,
) -> Result<(), NetError> {
    let first = net.transitions[parent.head].clone();
    let second = net.transitions[child.head].clone();
    let tail = if parent.body.is_empty() {
        let head = net.add_transition(Transition::merge(Composition::Sequence, &first, &second));
        net.connect(dominator, head)?;
        head
    } else {
        let guard = first.guard.clone().and(second.guard.clone());
        let head = net.add_transition(Transition::new(guard, first.action.clone()));
        net.connect(dominator, head)?;
        let junction = net.copy(Node::Place(split))?;
        copy_branch(net, parent, head, &|exit| if exit == split { junction } else { Node::Place(exit) })?;
        let tail = net.add_transition(Transition::new(Expression::truth(), second.action.clone()));
        net.connect(junction, tail)?;
        tail
    };
    copy_branch(net, child, tail, &Node::Place)
}

/// Copies the body of `branch` behind `head`; arcs that left the branch are
/// sent to `exit(place)`.
fn copy_branch(
    net: &mut Net,
    branch: &Branch,
    head: TransitionId,
    exit: &dyn Fn(PlaceId) -> Node,
) -> Result<(), NetError> {
    let copies = net.copy_sequence(&branch.body)?;
    let mapping: FxHashMap<Node, Node> = branch.body.iter().copied().zip(copies).collect();
    let target = |node: Node| match mapping.get(&node) {
        Some(copy) => Some(*copy),
        None => node.as_place().map(exit),
    };
    for next in net.next(Node::Transition(branch.head)) {
        if let Some(to) = target(next) {
            net.connect(head, to)?;
        }
    }
    for node in &branch.body {
        for next in net.next(*node) {
            if mapping.contains_key(&next) {
                continue;
            }
            if let Some(to) = target(next) {
                net.connect(mapping[node], to)?;
            }
        }
    }
    Ok(())
}
