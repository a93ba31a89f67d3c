//! Multi-valued state encodings and sparse literal cubes.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::logic::value::Value;
use crate::net::ids::NetId;
use crate::net::index_vec::IndexVec;

/// A sparse conjunction of `net = value` literals, kept sorted by net.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cube {
    literals: SmallVec<[(NetId, Value); 4]>,
}

impl Cube {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(net: NetId, value: Value) -> Self {
        let mut cube = Self::new();
        cube.insert(net, value);
        cube
    }

    /// Adds a literal; a literal on a net already present is combined with
    /// [`Value::and`].
    pub fn insert(&mut self, net: NetId, value: Value) {
        match self.literals.binary_search_by_key(&net, |(n, _)| *n) {
            Ok(pos) => self.literals[pos].1 = self.literals[pos].1.and(value),
            Err(pos) => self.literals.insert(pos, (net, value)),
        }
    }

    /// Like [`Cube::insert`] but combines with [`Value::interfere`].
    pub fn insert_concurrent(&mut self, net: NetId, value: Value) {
        match self.literals.binary_search_by_key(&net, |(n, _)| *n) {
            Ok(pos) => self.literals[pos].1 = self.literals[pos].1.interfere(value),
            Err(pos) => self.literals.insert(pos, (net, value)),
        }
    }

    pub fn get(&self, net: NetId) -> Value {
        self.literals
            .binary_search_by_key(&net, |(n, _)| *n)
            .map(|pos| self.literals[pos].1)
            .unwrap_or(Value::Unknown)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NetId, Value)> + '_ {
        self.literals.iter().copied()
    }

    pub fn nets(&self) -> impl Iterator<Item = NetId> + '_ {
        self.literals.iter().map(|(net, _)| *net)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn and(&self, other: &Cube) -> Cube {
        let mut result = self.clone();
        for (net, value) in other.iter() {
            result.insert(net, value);
        }
        result
    }

    /// True when the two cubes drive some net to different known values.
    pub fn conflicts_with(&self, other: &Cube) -> bool {
        self.iter()
            .any(|(net, value)| value.conflicts(other.get(net)))
    }

    /// Marks every net on which `other` disagrees with this cube as unstable.
    pub fn interfere(&self, other: &Cube) -> Cube {
        let mut result = self.clone();
        for (net, value) in result.literals.iter_mut() {
            *value = value.interfere(other.get(*net));
        }
        result
    }
}

impl FromIterator<(NetId, Value)> for Cube {
    fn from_iter<T: IntoIterator<Item = (NetId, Value)>>(iter: T) -> Self {
        let mut cube = Cube::new();
        for (net, value) in iter {
            cube.insert(net, value);
        }
        cube
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (net, value)) in self.iter().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", net, value)?;
        }
        write!(f, "]")
    }
}

/// The value currently known for every net, indexed by [`NetId`].
/// Nets beyond the stored length read as `Unknown`; trailing unknowns are
/// never stored so equal knowledge always compares equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Encoding {
    values: IndexVec<NetId, Value>,
}

impl Encoding {
    /// Every net unknown.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cube(cube: &Cube) -> Self {
        let mut encoding = Self::default();
        encoding.and_in(cube);
        encoding
    }

    pub fn get(&self, net: NetId) -> Value {
        self.values.get(net).copied().unwrap_or(Value::Unknown)
    }

    pub fn set(&mut self, net: NetId, value: Value) {
        if value == Value::Unknown {
            if let Some(slot) = self.values.get_mut(net) {
                *slot = value;
            }
            while self.values.as_slice().last() == Some(&Value::Unknown) {
                self.values.truncate(self.values.len() - 1);
            }
            return;
        }
        self.values.ensure(net, Value::Unknown);
        self.values[net] = value;
    }

    /// True when nothing is known about any net.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NetId, Value)> + '_ {
        self.values.iter_enumerated().map(|(net, value)| (net, *value))
    }

    /// Refines the encoding with a guard cube.
    pub fn and_in(&mut self, cube: &Cube) {
        for (net, value) in cube.iter() {
            let current = self.get(net);
            self.set(net, current.and(value));
        }
    }

    /// Applies an assignment cube. An unstable firing drives every written
    /// net to `Unstable` instead of its target value.
    pub fn assign(&mut self, cube: &Cube, stable: bool) {
        for (net, value) in cube.iter() {
            let current = self.get(net);
            let next = if stable { current.write(value) } else { Value::Unstable };
            self.set(net, next);
        }
    }

    /// Whether applying `cube` would alter this encoding.
    pub fn would_change(&self, cube: &Cube) -> bool {
        cube.iter()
            .any(|(net, value)| self.get(net).write(value) != self.get(net))
    }

    /// Brings a local view up to date with the global one. Only known or
    /// unstable global values are copied, so nothing regresses to `Unknown`.
    pub fn observe(&mut self, global: &Encoding) {
        for (net, value) in global.iter() {
            if value != Value::Unknown && self.get(net) != value {
                self.set(net, value);
            }
        }
    }

    /// Pointwise knowledge intersection of two encodings.
    pub fn and(&self, other: &Encoding) -> Encoding {
        let mut result = self.clone();
        for (net, value) in other.iter() {
            result.set(net, self.get(net).and(value));
        }
        result
    }

    /// What both encodings agree on; disagreeing nets become `Unknown`.
    pub fn widen(&self, other: &Encoding) -> Encoding {
        let mut result = Encoding::new();
        for (net, value) in self.iter() {
            if other.get(net) == value {
                result.set(net, value);
            }
        }
        result
    }

    /// Every net `other` knows carries the same value here.
    pub fn refines(&self, other: &Encoding) -> bool {
        other
            .iter()
            .all(|(net, value)| value == Value::Unknown || self.get(net) == value)
    }

    /// Renumbers nets, e.g. after two graphs were merged.
    pub fn remap(&self, mapping: &IndexVec<NetId, NetId>) -> Encoding {
        let mut result = Encoding::default();
        for (net, value) in self.iter() {
            let target = mapping.get(net).copied().unwrap_or(net);
            let current = result.get(target);
            result.set(target, current.and(value));
        }
        result
    }

    pub fn to_cube(&self) -> Cube {
        self.iter()
            .filter(|(_, value)| *value != Value::Unknown)
            .collect()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for (net, value) in self.iter() {
            if value == Value::Unknown {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", net, value)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: u32) -> NetId {
        NetId::new(raw)
    }

    #[test]
    fn cube_insert_merges_literals() {
        let mut cube = Cube::literal(v(2), Value::One);
        cube.insert(v(0), Value::Zero);
        cube.insert(v(2), Value::Zero);
        assert_eq!(cube.iter().collect::<Vec<_>>(), vec![(v(0), Value::Zero), (v(2), Value::Unstable)]);
    }

    #[test]
    fn conflicting_cubes_interfere() {
        let a = Cube::literal(v(1), Value::One);
        let b = Cube::literal(v(1), Value::Zero);
        let c = Cube::literal(v(3), Value::Zero);
        assert!(a.conflicts_with(&b));
        assert!(!a.conflicts_with(&c));
        assert_eq!(a.interfere(&b).get(v(1)), Value::Unstable);
        assert_eq!(a.interfere(&c), a);
    }

    #[test]
    fn encoding_assignment_is_monotone() {
        let mut encoding = Encoding::new();
        encoding.assign(&Cube::literal(v(0), Value::One), true);
        encoding.assign(&Cube::literal(v(0), Value::Unknown), true);
        assert_eq!(encoding.get(v(0)), Value::One);

        encoding.assign(&Cube::literal(v(1), Value::Zero), false);
        assert_eq!(encoding.get(v(1)), Value::Unstable);
        assert!(!encoding.would_change(&Cube::literal(v(0), Value::One)));
        assert!(encoding.would_change(&Cube::literal(v(0), Value::Zero)));
    }

    #[test]
    fn widen_keeps_common_knowledge() {
        let mut a = Encoding::new();
        a.set(v(0), Value::One);
        a.set(v(1), Value::Zero);
        let mut b = Encoding::new();
        b.set(v(0), Value::One);
        b.set(v(1), Value::One);
        let common = a.widen(&b);
        assert_eq!(common.get(v(0)), Value::One);
        assert_eq!(common.get(v(1)), Value::Unknown);
        assert!(a.refines(&common));
        assert!(!common.refines(&a));
        assert_eq!(a.and(&b).get(v(1)), Value::Zero.and(Value::One));
    }

    #[test]
    fn observe_copies_only_information() {
        let mut local = Encoding::new();
        local.set(v(0), Value::One);
        let mut global = Encoding::new();
        global.set(v(1), Value::Zero);
        local.observe(&global);
        assert_eq!(local.get(v(0)), Value::One);
        assert_eq!(local.get(v(1)), Value::Zero);
        assert_eq!(local.get(v(2)), Value::Unknown);
    }
}
