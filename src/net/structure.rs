//! 图的静态结构元素：库所、变迁、弧，以及合并两个库所/变迁时使用的组合代数.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logic::action::Choice;
use crate::logic::expression::Expression;
use crate::net::ids::{NetId, PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;

/// 图中的一个节点: 库所或变迁.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Node {
    Place(PlaceId),
    Transition(TransitionId),
}

impl Node {
    pub fn is_place(self) -> bool {
        matches!(self, Node::Place(_))
    }

    pub fn is_transition(self) -> bool {
        matches!(self, Node::Transition(_))
    }

    pub fn as_place(self) -> Option<PlaceId> {
        match self {
            Node::Place(place) => Some(place),
            Node::Transition(_) => None,
        }
    }

    pub fn as_transition(self) -> Option<TransitionId> {
        match self {
            Node::Transition(transition) => Some(transition),
            Node::Place(_) => None,
        }
    }
}

impl From<PlaceId> for Node {
    fn from(place: PlaceId) -> Self {
        Node::Place(place)
    }
}

impl From<TransitionId> for Node {
    fn from(transition: TransitionId) -> Self {
        Node::Transition(transition)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Place(place) => write!(f, "{place}"),
            Node::Transition(transition) => write!(f, "{transition}"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 有向弧, 总是连接一个库所和一个变迁.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Arc {
    pub from: Node,
    pub to: Node,
}

impl Arc {
    pub fn new(from: Node, to: Node) -> Self {
        Self { from, to }
    }
}

/// How two control paths are combined when their nodes are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Composition {
    Parallel,
    Choice,
    Sequence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Place {
    /// The place may resolve a nondeterministic choice between its
    /// outgoing transitions.
    pub arbiter: bool,
}

impl Place {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arbiter() -> Self {
        Self { arbiter: true }
    }

    pub fn merge(_composition: Composition, a: &Place, b: &Place) -> Place {
        Place {
            arbiter: a.arbiter || b.arbiter,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub guard: Expression,
    pub action: Choice,
}

impl Transition {
    pub fn new(guard: Expression, action: Choice) -> Self {
        Self { guard, action }
    }

    /// A guard with a skip action.
    pub fn guarded(guard: Expression) -> Self {
        Self::new(guard, Choice::skip())
    }

    /// An unconditional action.
    pub fn acting(action: Choice) -> Self {
        Self::new(Expression::truth(), action)
    }

    /// Parallel and sequence compositions join every pair of action terms and
    /// conjoin guards; choice unions the terms and disjoins guards.
    pub fn merge(composition: Composition, a: &Transition, b: &Transition) -> Transition {
        match composition {
            Composition::Parallel | Composition::Sequence => Transition {
                guard: a.guard.clone().and(b.guard.clone()),
                action: a.action.cross(&b.action),
            },
            Composition::Choice => Transition {
                guard: a.guard.clone().or(b.guard.clone()),
                action: a.action.union(&b.action),
            },
        }
    }

    /// Guard compatibility is left to the caller.
    pub fn mergeable(_composition: Composition, _a: &Transition, _b: &Transition) -> bool {
        true
    }

    pub fn is_infeasible(&self) -> bool {
        self.guard.is_unsatisfiable() || self.action.is_infeasible()
    }

    pub fn is_vacuous(&self) -> bool {
        self.guard.is_tautology() && self.action.is_noop()
    }

    /// A passive transition only waits on its guard.
    pub fn is_passive(&self) -> bool {
        self.action.is_noop()
    }

    pub fn apply(&self, mapping: &IndexVec<NetId, NetId>) -> Transition {
        Transition {
            guard: self.guard.apply(mapping),
            action: self.action.apply(mapping),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.guard, self.action)
    }
}
