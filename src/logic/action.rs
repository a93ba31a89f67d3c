//! Multi-valued actions in disjunctive normal form: a [`Choice`] of
//! [`Parallel`] groups of [`Assignment`]s.
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::logic::encoding::{Cube, Encoding};
use crate::logic::expression::Expression;
use crate::logic::value::Value;
use crate::net::ids::NetId;
use crate::net::index_vec::IndexVec;

/// `target := expr`. A missing target is a pure environment effect such as
/// `send(R, x)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Option<NetId>,
    pub expr: Expression,
}

impl Assignment {
    pub fn new(target: NetId, expr: impl Into<Expression>) -> Self {
        Self {
            target: Some(target),
            expr: expr.into(),
        }
    }

    pub fn effect(expr: Expression) -> Self {
        Self { target: None, expr }
    }

    pub fn constant_value(&self) -> Option<Value> {
        match &self.expr {
            Expression::Constant(value) => Some(*value),
            _ => None,
        }
    }

    pub fn has_side_effect(&self) -> bool {
        self.expr.contains_call()
    }

    pub fn render(&self, name: &dyn Fn(NetId) -> String) -> String {
        match self.target {
            Some(net) => format!("{}:={}", name(net), self.expr.render(name)),
            None => self.expr.render(name),
        }
    }

    pub fn apply(&self, mapping: &IndexVec<NetId, NetId>) -> Assignment {
        Assignment {
            target: self
                .target
                .map(|net| mapping.get(net).copied().unwrap_or(net)),
            expr: self.expr.apply(mapping),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|net| net.to_string()))
    }
}

/// Assignments that happen together in one atomic step.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Parallel {
    pub actions: Vec<Assignment>,
}

impl Parallel {
    pub fn skip() -> Self {
        Self::default()
    }

    pub fn new(actions: Vec<Assignment>) -> Self {
        Self { actions }
    }

    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }

    /// Two assignments drive one net to different constants.
    pub fn is_infeasible(&self) -> bool {
        self.actions
            .iter()
            .filter_map(|a| Some((a.target?, a.constant_value()?)))
            .tuple_combinations()
            .any(|((n1, v1), (n2, v2))| n1 == n2 && v1.conflicts(v2))
    }

    pub fn has_side_effect(&self) -> bool {
        self.actions.iter().any(Assignment::has_side_effect)
    }

    /// Values this term writes when fired from `encoding`. Concurrent writes
    /// of different values to one net are unstable.
    pub fn evaluate(&self, encoding: &Encoding) -> Cube {
        let mut cube = Cube::new();
        for assignment in &self.actions {
            if let Some(target) = assignment.target {
                cube.insert_concurrent(target, assignment.expr.evaluate(encoding));
            }
        }
        cube
    }

    pub fn written_nets(&self) -> BTreeSet<NetId> {
        self.actions.iter().filter_map(|a| a.target).collect()
    }

    pub fn read_nets(&self) -> BTreeSet<NetId> {
        self.actions.iter().flat_map(|a| a.expr.nets()).collect()
    }

    /// Both terms' assignments in one step.
    pub fn join(&self, other: &Parallel) -> Parallel {
        let mut actions = self.actions.clone();
        actions.extend(other.actions.iter().cloned());
        Parallel { actions }
    }

    pub fn render(&self, name: &dyn Fn(NetId) -> String) -> String {
        if self.actions.is_empty() {
            return "skip".to_string();
        }
        self.actions.iter().map(|a| a.render(name)).join(",")
    }

    pub fn apply(&self, mapping: &IndexVec<NetId, NetId>) -> Parallel {
        Parallel {
            actions: self.actions.iter().map(|a| a.apply(mapping)).collect(),
        }
    }
}

impl fmt::Display for Parallel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|net| net.to_string()))
    }
}

/// Alternative atomic effects; firing performs exactly one term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub terms: Vec<Parallel>,
}

impl Default for Choice {
    fn default() -> Self {
        Self::skip()
    }
}

impl Choice {
    /// A single empty term.
    pub fn skip() -> Self {
        Self {
            terms: vec![Parallel::skip()],
        }
    }

    pub fn new(terms: Vec<Parallel>) -> Self {
        Self { terms }
    }

    pub fn single(actions: Vec<Assignment>) -> Self {
        Self::new(vec![Parallel::new(actions)])
    }

    pub fn is_noop(&self) -> bool {
        self.terms.iter().all(Parallel::is_noop)
    }

    pub fn is_infeasible(&self) -> bool {
        self.terms.iter().all(Parallel::is_infeasible)
    }

    pub fn has_side_effect(&self) -> bool {
        self.terms.iter().any(Parallel::has_side_effect)
    }

    pub fn written_nets(&self) -> BTreeSet<NetId> {
        self.terms.iter().flat_map(Parallel::written_nets).collect()
    }

    pub fn read_nets(&self) -> BTreeSet<NetId> {
        self.terms.iter().flat_map(Parallel::read_nets).collect()
    }

    /// Either side may fire.
    pub fn union(&self, other: &Choice) -> Choice {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Choice { terms }
    }

    /// Every term of `self` paired with every term of `other`.
    pub fn cross(&self, other: &Choice) -> Choice {
        Choice {
            terms: self
                .terms
                .iter()
                .cartesian_product(other.terms.iter())
                .map(|(a, b)| a.join(b))
                .collect(),
        }
    }

    pub fn apply(&self, mapping: &IndexVec<NetId, NetId>) -> Choice {
        Choice {
            terms: self.terms.iter().map(|t| t.apply(mapping)).collect(),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.terms.iter().join(" [] "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(net: u32, value: bool) -> Assignment {
        Assignment::new(NetId::new(net), value)
    }

    #[test]
    fn noop_and_infeasible() {
        assert!(Choice::skip().is_noop());
        assert!(!Choice::skip().is_infeasible());
        assert!(Choice::new(Vec::new()).is_infeasible());

        let clash = Parallel::new(vec![assign(0, true), assign(0, false)]);
        assert!(clash.is_infeasible());
        assert!(!Parallel::new(vec![assign(0, true), assign(1, false)]).is_infeasible());
        assert!(Choice::new(vec![clash.clone()]).is_infeasible());
        assert!(!Choice::new(vec![clash, Parallel::skip()]).is_infeasible());
    }

    #[test]
    fn cross_and_union() {
        let a = Choice::new(vec![
            Parallel::new(vec![assign(0, true)]),
            Parallel::new(vec![assign(0, false)]),
        ]);
        let b = Choice::single(vec![assign(1, true)]);
        assert_eq!(a.cross(&b).terms.len(), 2);
        assert_eq!(a.cross(&b).terms[1].actions, vec![assign(0, false), assign(1, true)]);
        assert_eq!(a.union(&b).terms.len(), 3);
        assert_eq!(Choice::skip().cross(&b), b);
    }

    #[test]
    fn concurrent_writes_are_unstable() {
        let term = Parallel::new(vec![
            assign(0, true),
            Assignment::new(NetId::new(0), Expression::net(NetId::new(1))),
            Assignment::effect(Expression::call("send", vec![Expression::net(NetId::new(2))])),
        ]);
        let mut encoding = Encoding::new();
        assert_eq!(term.evaluate(&encoding).get(NetId::new(0)), Value::One);
        encoding.set(NetId::new(1), Value::Zero);
        assert_eq!(term.evaluate(&encoding).get(NetId::new(0)), Value::Unstable);
        assert!(term.has_side_effect());
        assert_eq!(term.read_nets().into_iter().collect::<Vec<_>>(), vec![NetId::new(1), NetId::new(2)]);
    }
}
