use std::fmt;

use serde::{Deserialize, Serialize};

/// What is known about a single net.
///
/// `Unknown` means "either 0 or 1, not yet determined"; `Unstable` means the
/// net was driven to both values concurrently (a glitch or a short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Zero,
    One,
    Unknown,
    Unstable,
}

impl Value {
    pub const fn from_bool(value: bool) -> Self {
        if value { Value::One } else { Value::Zero }
    }

    pub const fn is_known(self) -> bool {
        matches!(self, Value::Zero | Value::One)
    }

    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Value::Zero => Some(false),
            Value::One => Some(true),
            _ => None,
        }
    }

    /// Intersection of knowledge. `Unknown` is the identity and a
    /// contradiction collapses to `Unstable`.
    ///
    /// |         | 0 | 1 | - | X |
    /// |---------|---|---|---|---|
    /// | **0**   | 0 | X | 0 | X |
    /// | **1**   | X | 1 | 1 | X |
    /// | **-**   | 0 | 1 | - | X |
    /// | **X**   | X | X | X | X |
    pub const fn and(self, other: Value) -> Value {
        match (self, other) {
            (Value::Unstable, _) | (_, Value::Unstable) => Value::Unstable,
            (Value::Unknown, v) | (v, Value::Unknown) => v,
            (Value::Zero, Value::Zero) => Value::Zero,
            (Value::One, Value::One) => Value::One,
            _ => Value::Unstable,
        }
    }

    /// Result of assigning `new` to a net currently holding `self`.
    /// Writing `Unknown` carries no information and keeps the current value.
    pub const fn write(self, new: Value) -> Value {
        match new {
            Value::Unknown => self,
            v => v,
        }
    }

    /// Combines two concurrent writes to the same net.
    pub const fn interfere(self, other: Value) -> Value {
        match (self, other) {
            (Value::Unstable, _) | (_, Value::Unstable) => Value::Unstable,
            (Value::Unknown, v) | (v, Value::Unknown) => v,
            (a, b) if a as u8 == b as u8 => a,
            _ => Value::Unstable,
        }
    }

    /// True when both values are known and differ.
    pub const fn conflicts(self, other: Value) -> bool {
        self.is_known() && other.is_known() && self as u8 != other as u8
    }

    pub const fn not(self) -> Value {
        match self {
            Value::Zero => Value::One,
            Value::One => Value::Zero,
            v => v,
        }
    }

    /// Kleene conjunction used when evaluating expressions.
    pub const fn kleene_and(self, other: Value) -> Value {
        match (self, other) {
            (Value::Zero, _) | (_, Value::Zero) => Value::Zero,
            (Value::Unstable, _) | (_, Value::Unstable) => Value::Unstable,
            (Value::Unknown, _) | (_, Value::Unknown) => Value::Unknown,
            _ => Value::One,
        }
    }

    /// Kleene disjunction used when evaluating expressions.
    pub const fn kleene_or(self, other: Value) -> Value {
        match (self, other) {
            (Value::One, _) | (_, Value::One) => Value::One,
            (Value::Unstable, _) | (_, Value::Unstable) => Value::Unstable,
            (Value::Unknown, _) | (_, Value::Unknown) => Value::Unknown,
            _ => Value::Zero,
        }
    }

    pub const fn kleene_xor(self, other: Value) -> Value {
        match (self.as_bool(), other.as_bool()) {
            (Some(a), Some(b)) => Value::from_bool(a != b),
            _ => {
                if matches!(self, Value::Unstable) || matches!(other, Value::Unstable) {
                    Value::Unstable
                } else {
                    Value::Unknown
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::from_bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Value::Zero => "0",
            Value::One => "1",
            Value::Unknown => "-",
            Value::Unstable => "X",
        };
        f.write_str(symbol)
    }
}
