//! Guard expressions over nets.
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logic::encoding::{Cube, Encoding};
use crate::logic::value::Value;
use crate::net::ids::NetId;
use crate::net::index_vec::IndexVec;

/// Expressions reading more nets than this are not enumerated exhaustively;
/// satisfiability answers for them are conservative.
pub const ENUMERATION_LIMIT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Expression {
    Constant(Value),
    Net(NetId),
    Not(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Xor(Box<Expression>, Box<Expression>),
    Eq(Box<Expression>, Box<Expression>),
    /// An environment interaction such as `recv(ch)`. Its value is never
    /// known ahead of time.
    Call(String, Vec<Expression>),
}

impl Default for Expression {
    fn default() -> Self {
        Expression::truth()
    }
}

impl Expression {
    pub const fn truth() -> Self {
        Expression::Constant(Value::One)
    }

    pub const fn falsity() -> Self {
        Expression::Constant(Value::Zero)
    }

    pub const fn constant(value: bool) -> Self {
        Expression::Constant(Value::from_bool(value))
    }

    pub const fn net(net: NetId) -> Self {
        Expression::Net(net)
    }

    /// `net` when `value` is true, `~net` otherwise.
    pub fn literal(net: NetId, value: bool) -> Self {
        if value {
            Expression::Net(net)
        } else {
            Expression::Net(net).negate()
        }
    }

    /// Conjunction of the known literals of `cube`.
    pub fn from_cube(cube: &Cube) -> Self {
        cube.iter()
            .filter_map(|(net, value)| Some(Expression::literal(net, value.as_bool()?)))
            .fold(Expression::truth(), Expression::and)
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call(name.into(), args)
    }

    pub fn negate(self) -> Self {
        match self {
            Expression::Constant(value) => Expression::Constant(value.not()),
            Expression::Not(inner) => *inner,
            other => Expression::Not(Box::new(other)),
        }
    }

    pub fn xor(self, other: Expression) -> Self {
        Expression::Xor(Box::new(self), Box::new(other))
    }

    pub fn equals(self, other: Expression) -> Self {
        Expression::Eq(Box::new(self), Box::new(other))
    }

    /// Conjunction with constant folding and flattening of nested `And`s.
    pub fn and(self, other: Expression) -> Self {
        let mut operands = Vec::new();
        for side in [self, other] {
            match side {
                Expression::Constant(Value::One) => {}
                Expression::Constant(Value::Zero) => return Expression::falsity(),
                Expression::And(inner) => inner.into_iter().for_each(|e| push_unique(&mut operands, e)),
                expr => push_unique(&mut operands, expr),
            }
        }
        match operands.len() {
            0 => Expression::truth(),
            1 => operands.remove(0),
            _ => Expression::And(operands),
        }
    }

    /// Disjunction with constant folding and flattening of nested `Or`s.
    pub fn or(self, other: Expression) -> Self {
        let mut operands = Vec::new();
        for side in [self, other] {
            match side {
                Expression::Constant(Value::Zero) => {}
                Expression::Constant(Value::One) => return Expression::truth(),
                Expression::Or(inner) => inner.into_iter().for_each(|e| push_unique(&mut operands, e)),
                expr => push_unique(&mut operands, expr),
            }
        }
        match operands.len() {
            0 => Expression::falsity(),
            1 => operands.remove(0),
            _ => Expression::Or(operands),
        }
    }

    pub fn is_constant(&self, value: bool) -> bool {
        *self == Expression::constant(value)
    }

    pub fn as_net(&self) -> Option<NetId> {
        match self {
            Expression::Net(net) => Some(*net),
            _ => None,
        }
    }

    /// Kleene evaluation against an encoding.
    pub fn evaluate(&self, encoding: &Encoding) -> Value {
        match self {
            Expression::Constant(value) => *value,
            Expression::Net(net) => encoding.get(*net),
            Expression::Not(inner) => inner.evaluate(encoding).not(),
            Expression::And(operands) => operands
                .iter()
                .fold(Value::One, |acc, expr| acc.kleene_and(expr.evaluate(encoding))),
            Expression::Or(operands) => operands
                .iter()
                .fold(Value::Zero, |acc, expr| acc.kleene_or(expr.evaluate(encoding))),
            Expression::Xor(lhs, rhs) => lhs.evaluate(encoding).kleene_xor(rhs.evaluate(encoding)),
            Expression::Eq(lhs, rhs) => lhs
                .evaluate(encoding)
                .kleene_xor(rhs.evaluate(encoding))
                .not(),
            Expression::Call(..) => Value::Unknown,
        }
    }

    /// Every net the expression reads, ascending.
    pub fn nets(&self) -> Vec<NetId> {
        let mut nets = BTreeSet::new();
        self.collect_nets(&mut nets);
        nets.into_iter().collect()
    }

    fn collect_nets(&self, nets: &mut BTreeSet<NetId>) {
        match self {
            Expression::Constant(_) => {}
            Expression::Net(net) => {
                nets.insert(*net);
            }
            Expression::Not(inner) => inner.collect_nets(nets),
            Expression::And(operands) | Expression::Or(operands) | Expression::Call(_, operands) => {
                for expr in operands {
                    expr.collect_nets(nets);
                }
            }
            Expression::Xor(lhs, rhs) | Expression::Eq(lhs, rhs) => {
                lhs.collect_nets(nets);
                rhs.collect_nets(nets);
            }
        }
    }

    pub fn contains_call(&self) -> bool {
        let mut found = false;
        self.visit_calls(&mut |_, _| found = true);
        found
    }

    /// Calls `visitor` for every call-shaped sub-expression, outermost first.
    pub fn visit_calls<'a>(&'a self, visitor: &mut impl FnMut(&'a str, &'a [Expression])) {
        match self {
            Expression::Constant(_) | Expression::Net(_) => {}
            Expression::Not(inner) => inner.visit_calls(visitor),
            Expression::And(operands) | Expression::Or(operands) => {
                for expr in operands {
                    expr.visit_calls(visitor);
                }
            }
            Expression::Xor(lhs, rhs) | Expression::Eq(lhs, rhs) => {
                lhs.visit_calls(visitor);
                rhs.visit_calls(visitor);
            }
            Expression::Call(name, args) => {
                visitor(name.as_str(), args.as_slice());
                for expr in args {
                    expr.visit_calls(visitor);
                }
            }
        }
    }

    /// Every boolean assignment of the nets read by the expression, or `None`
    /// when there are too many nets to enumerate.
    fn assignments(&self) -> Option<(Vec<NetId>, impl Iterator<Item = Encoding>)> {
        let nets = self.nets();
        if nets.len() > ENUMERATION_LIMIT {
            return None;
        }
        let support = nets.clone();
        let iter = (0u32..1 << support.len()).map(move |mask| {
            let mut encoding = Encoding::new();
            for (bit, net) in support.iter().enumerate() {
                encoding.set(*net, Value::from_bool(mask & (1 << bit) != 0));
            }
            encoding
        });
        Some((nets, iter))
    }

    /// True when no assignment can make the expression hold.
    pub fn is_unsatisfiable(&self) -> bool {
        if let Expression::Constant(value) = self {
            return *value == Value::Zero;
        }
        match self.assignments() {
            Some((_, mut all)) => all.all(|encoding| self.evaluate(&encoding) == Value::Zero),
            None => false,
        }
    }

    /// True when every assignment makes the expression hold.
    pub fn is_tautology(&self) -> bool {
        if let Expression::Constant(value) = self {
            return *value == Value::One;
        }
        match self.assignments() {
            Some((_, mut all)) => all.all(|encoding| self.evaluate(&encoding) == Value::One),
            None => false,
        }
    }

    /// The literals shared by every assignment that can satisfy the
    /// expression. For `a & ~b | a & c` this is `a=1`.
    pub fn implied_literals(&self) -> Cube {
        let Some((nets, all)) = self.assignments() else {
            return self.syntactic_literals();
        };
        let mut common: Option<Vec<Value>> = None;
        for encoding in all {
            if self.evaluate(&encoding) == Value::Zero {
                continue;
            }
            let values: Vec<Value> = nets.iter().map(|net| encoding.get(*net)).collect();
            common = Some(match common {
                None => values,
                Some(prev) => prev
                    .into_iter()
                    .zip(values)
                    .map(|(a, b)| if a == b { a } else { Value::Unknown })
                    .collect(),
            });
        }
        match common {
            Some(values) => nets
                .into_iter()
                .zip(values)
                .filter(|(_, value)| value.is_known())
                .collect(),
            None => Cube::new(),
        }
    }

    fn syntactic_literals(&self) -> Cube {
        match self {
            Expression::Net(net) => Cube::literal(*net, Value::One),
            Expression::Not(inner) => match inner.as_ref() {
                Expression::Net(net) => Cube::literal(*net, Value::Zero),
                _ => Cube::new(),
            },
            Expression::And(operands) => operands
                .iter()
                .fold(Cube::new(), |acc, expr| acc.and(&expr.syntactic_literals())),
            _ => Cube::new(),
        }
    }

    /// Renames every net through `mapping`; nets outside the table keep their id.
    pub fn apply(&self, mapping: &IndexVec<NetId, NetId>) -> Expression {
        let remap = |expr: &Expression| Box::new(expr.apply(mapping));
        match self {
            Expression::Constant(value) => Expression::Constant(*value),
            Expression::Net(net) => Expression::Net(mapping.get(*net).copied().unwrap_or(*net)),
            Expression::Not(inner) => Expression::Not(remap(inner)),
            Expression::And(operands) => {
                Expression::And(operands.iter().map(|expr| expr.apply(mapping)).collect())
            }
            Expression::Or(operands) => {
                Expression::Or(operands.iter().map(|expr| expr.apply(mapping)).collect())
            }
            Expression::Xor(lhs, rhs) => Expression::Xor(remap(lhs), remap(rhs)),
            Expression::Eq(lhs, rhs) => Expression::Eq(remap(lhs), remap(rhs)),
            Expression::Call(name, args) => Expression::Call(
                name.clone(),
                args.iter().map(|expr| expr.apply(mapping)).collect(),
            ),
        }
    }

    /// Renders the expression, naming nets with `name`.
    pub fn render(&self, name: &dyn Fn(NetId) -> String) -> String {
        let nested = |expr: &Expression| match expr {
            Expression::And(_) | Expression::Or(_) | Expression::Xor(..) | Expression::Eq(..) => {
                format!("({})", expr.render(name))
            }
            _ => expr.render(name),
        };
        match self {
            Expression::Constant(value) => value.to_string(),
            Expression::Net(net) => name(*net),
            Expression::Not(inner) => format!("~{}", nested(inner)),
            Expression::And(operands) => operands.iter().map(nested).collect::<Vec<_>>().join("&"),
            Expression::Or(operands) => operands.iter().map(nested).collect::<Vec<_>>().join("|"),
            Expression::Xor(lhs, rhs) => format!("{}^{}", nested(lhs), nested(rhs)),
            Expression::Eq(lhs, rhs) => format!("{}=={}", nested(lhs), nested(rhs)),
            Expression::Call(callee, args) => format!(
                "{}({})",
                callee,
                args.iter().map(|expr| expr.render(name)).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

fn push_unique(operands: &mut Vec<Expression>, expr: Expression) {
    if !operands.contains(&expr) {
        operands.push(expr);
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::constant(value)
    }
}

impl From<NetId> for Expression {
    fn from(net: NetId) -> Self {
        Expression::Net(net)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|net| net.to_string()))
    }
}
