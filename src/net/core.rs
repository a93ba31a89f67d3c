//! 运行时图结构: 节点的创建、连接、拷贝与可发生集.
use std::collections::VecDeque;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::index_vec::Arena;
use crate::net::structure::{Arc, Node, Place, Transition};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("node {0:?} does not exist")]
    InvalidNode(Node),
    #[error("arc {0:?} does not exist")]
    InvalidArc(ArcId),
    #[error("cannot connect {0:?} to {1:?}: arcs must join a place and a transition")]
    SameKind(Node, Node),
}

/// A transition whose every input place holds a token, together with the
/// positions of the tokens it would consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enabling {
    pub transition: TransitionId,
    pub tokens: Vec<usize>,
}

#[derive(Clone, Default)]
pub struct Net {
    pub places: Arena<PlaceId, Place>,
    pub transitions: Arena<TransitionId, Transition>,
    pub arcs: Arena<ArcId, Arc>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        self.places.insert(place)
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.insert(transition)
    }

    pub fn is_valid(&self, node: Node) -> bool {
        match node {
            Node::Place(place) => self.places.contains(place),
            Node::Transition(transition) => self.transitions.contains(transition),
        }
    }

    fn check(&self, node: Node) -> Result<(), NetError> {
        if self.is_valid(node) {
            Ok(())
        } else {
            Err(NetError::InvalidNode(node))
        }
    }

    /// 连接两个节点. 已存在的弧不会重复添加.
    pub fn connect(&mut self, from: impl Into<Node>, to: impl Into<Node>) -> Result<ArcId, NetError> {
        let (from, to) = (from.into(), to.into());
        self.check(from)?;
        self.check(to)?;
        if from.is_place() == to.is_place() {
            return Err(NetError::SameKind(from, to));
        }
        let arc = Arc::new(from, to);
        if let Some((id, _)) = self.arcs.iter().find(|(_, existing)| **existing == arc) {
            return Ok(id);
        }
        Ok(self.arcs.insert(arc))
    }

    /// Connects every source to every target.
    pub fn connect_all(&mut self, from: &[Node], to: &[Node]) -> Result<(), NetError> {
        for source in from {
            for target in to {
                self.connect(*source, *target)?;
            }
        }
        Ok(())
    }

    /// Chains consecutive nodes, which must alternate between places and
    /// transitions.
    pub fn connect_sequence(&mut self, nodes: &[Node]) -> Result<(), NetError> {
        for pair in nodes.windows(2) {
            self.connect(pair[0], pair[1])?;
        }
        Ok(())
    }

    pub fn disconnect(&mut self, arc: ArcId) -> Result<Arc, NetError> {
        self.arcs.remove(arc).ok_or(NetError::InvalidArc(arc))
    }

    /// Removes a node and every arc touching it.
    pub fn erase(&mut self, node: Node) -> Result<(), NetError> {
        self.check(node)?;
        let touching: Vec<ArcId> = self
            .arcs
            .iter()
            .filter(|(_, arc)| arc.from == node || arc.to == node)
            .map(|(id, _)| id)
            .collect();
        for arc in touching {
            self.arcs.remove(arc);
        }
        match node {
            Node::Place(place) => {
                self.places.remove(place);
            }
            Node::Transition(transition) => {
                self.transitions.remove(transition);
            }
        }
        Ok(())
    }

    /// Clones a node without any of its arcs.
    pub fn copy(&mut self, node: Node) -> Result<Node, NetError> {
        match node {
            Node::Place(place) => {
                let value = self.places.get(place).cloned().ok_or(NetError::InvalidNode(node))?;
                Ok(Node::Place(self.places.insert(value)))
            }
            Node::Transition(transition) => {
                let value = self
                    .transitions
                    .get(transition)
                    .cloned()
                    .ok_or(NetError::InvalidNode(node))?;
                Ok(Node::Transition(self.transitions.insert(value)))
            }
        }
    }

    /// Clones a set of nodes together with the arcs running between them.
    /// The copies are returned in the order of `nodes`.
    pub fn copy_sequence(&mut self, nodes: &[Node]) -> Result<Vec<Node>, NetError> {
        let mut mapping = FxHashMap::default();
        let mut copies = Vec::with_capacity(nodes.len());
        for node in nodes {
            let copy = self.copy(*node)?;
            mapping.insert(*node, copy);
            copies.push(copy);
        }
        let internal: Vec<Arc> = self
            .arcs
            .iter()
            .filter(|(_, arc)| mapping.contains_key(&arc.from) && mapping.contains_key(&arc.to))
            .map(|(_, arc)| *arc)
            .collect();
        for arc in internal {
            self.connect(mapping[&arc.from], mapping[&arc.to])?;
        }
        Ok(copies)
    }

    pub fn out_arcs(&self, node: Node) -> Vec<ArcId> {
        self.arcs
            .iter()
            .filter(|(_, arc)| arc.from == node)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn in_arcs(&self, node: Node) -> Vec<ArcId> {
        self.arcs
            .iter()
            .filter(|(_, arc)| arc.to == node)
            .map(|(id, _)| id)
            .collect()
    }

    /// 后继节点, 按编号升序且去重.
    pub fn next(&self, node: Node) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .arcs
            .iter()
            .filter(|(_, arc)| arc.from == node)
            .map(|(_, arc)| arc.to)
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    /// 前驱节点, 按编号升序且去重.
    pub fn prev(&self, node: Node) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .arcs
            .iter()
            .filter(|(_, arc)| arc.to == node)
            .map(|(_, arc)| arc.from)
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    pub fn output_places(&self, transition: TransitionId) -> Vec<PlaceId> {
        self.next(transition.into()).into_iter().filter_map(Node::as_place).collect()
    }

    pub fn input_places(&self, transition: TransitionId) -> Vec<PlaceId> {
        self.prev(transition.into()).into_iter().filter_map(Node::as_place).collect()
    }

    pub fn consumers(&self, place: PlaceId) -> Vec<TransitionId> {
        self.next(place.into()).into_iter().filter_map(Node::as_transition).collect()
    }

    pub fn producers(&self, place: PlaceId) -> Vec<TransitionId> {
        self.prev(place.into()).into_iter().filter_map(Node::as_transition).collect()
    }

    pub fn place_ids(&self) -> Vec<PlaceId> {
        self.places.ids().collect()
    }

    pub fn transition_ids(&self) -> Vec<TransitionId> {
        self.transitions.ids().collect()
    }

    /// Places with more than one outgoing transition, each listed with its
    /// branch heads.
    pub fn split_places(&self) -> Vec<(PlaceId, Vec<TransitionId>)> {
        self.places
            .ids()
            .map(|place| (place, self.consumers(place)))
            .filter(|(_, heads)| heads.len() > 1)
            .collect()
    }

    /// 可发生集: 每个输入库所都持有 token 的变迁. `marked[i]` 是第 i 个 token
    /// 所在的库所; 没有输入库所的变迁永远不可发生.
    pub fn enabled(&self, marked: &[PlaceId]) -> Vec<Enabling> {
        let mut result = Vec::new();
        for transition in self.transitions.ids() {
            let inputs = self.input_places(transition);
            if inputs.is_empty() {
                continue;
            }
            let tokens: Option<Vec<usize>> = inputs
                .iter()
                .map(|place| marked.iter().position(|p| p == place))
                .collect();
            if let Some(mut tokens) = tokens {
                tokens.sort_unstable();
                result.push(Enabling { transition, tokens });
            }
        }
        result
    }

    /// Nodes forward reachable from `roots`.
    pub fn reachable_from(&self, roots: &[PlaceId]) -> FxHashSet<Node> {
        let mut seen: FxHashSet<Node> = FxHashSet::default();
        let mut queue: VecDeque<Node> = roots
            .iter()
            .copied()
            .map(Node::Place)
            .filter(|node| self.is_valid(*node))
            .collect();
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            queue.extend(self.next(node));
        }
        seen
    }

    /// Nodes from which `target` can be reached, `target` included.
    pub fn reaching(&self, target: PlaceId) -> FxHashSet<Node> {
        let mut seen: FxHashSet<Node> = FxHashSet::default();
        let mut queue: VecDeque<Node> = VecDeque::new();
        if self.is_valid(Node::Place(target)) {
            queue.push_back(Node::Place(target));
        }
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            queue.extend(self.prev(node));
        }
        seen
    }

    /// Erases every node not forward reachable from `roots`; returns the
    /// erased nodes.
    pub fn prune_unreachable(&mut self, roots: &[PlaceId]) -> Vec<Node> {
        let seen = self.reachable_from(roots);
        let dead: Vec<Node> = self
            .places
            .ids()
            .map(Node::Place)
            .chain(self.transitions.ids().map(Node::Transition))
            .filter(|node| !seen.contains(node))
            .collect();
        for node in &dead {
            // 节点来自当前的 id 集合, 擦除不会失败
            let _ = self.erase(*node);
        }
        if !dead.is_empty() {
            log::debug!("pruned {} unreachable nodes", dead.len());
        }
        dead
    }
}
