//! 缺陷账本: 不稳定、干扰、互斥与死锁四类记录, 各自有序且去重.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chp::graph::ChpGraph;
use crate::chp::state::{State, TermIndex};

/// A term that lost its enabling before it fired.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instability {
    pub term: TermIndex,
    /// Firings between the term becoming enabled and it firing.
    pub history: Vec<TermIndex>,
}

/// Two concurrent terms wrote conflicting values to one net. The pair is
/// stored in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interference {
    pub first: TermIndex,
    pub second: TermIndex,
}

impl Interference {
    pub fn new(a: TermIndex, b: TermIndex) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self { first, second }
    }
}

/// Two vacuous terms competing for a token on a non-arbiter place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mutex {
    pub first: TermIndex,
    pub second: TermIndex,
}

impl Mutex {
    pub fn new(a: TermIndex, b: TermIndex) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self { first, second }
    }
}

/// A reachable state with nothing enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deadlock {
    pub state: State,
}

impl PartialOrd for Deadlock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadlock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.state.tokens, &self.state.encoding).cmp(&(&other.state.tokens, &other.state.encoding))
    }
}

/// 有序插入; 已存在时不做任何事并返回 false.
fn insert_sorted<T: Ord>(records: &mut Vec<T>, record: T) -> bool {
    match records.binary_search(&record) {
        Ok(_) => false,
        Err(pos) => {
            records.insert(pos, record);
            true
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLedger {
    pub instability: Vec<Instability>,
    pub interference: Vec<Interference>,
    pub mutex: Vec<Mutex>,
    pub deadlock: Vec<Deadlock>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_instability(&mut self, record: Instability) -> bool {
        insert_sorted(&mut self.instability, record)
    }

    pub fn insert_interference(&mut self, record: Interference) -> bool {
        insert_sorted(&mut self.interference, record)
    }

    pub fn insert_mutex(&mut self, record: Mutex) -> bool {
        insert_sorted(&mut self.mutex, record)
    }

    pub fn insert_deadlock(&mut self, record: Deadlock) -> bool {
        insert_sorted(&mut self.deadlock, record)
    }

    /// Set union with another ledger. Nothing is logged again.
    pub fn merge(&mut self, other: &ErrorLedger) {
        for record in &other.instability {
            self.insert_instability(record.clone());
        }
        for record in &other.interference {
            self.insert_interference(*record);
        }
        for record in &other.mutex {
            self.insert_mutex(*record);
        }
        for record in &other.deadlock {
            self.insert_deadlock(record.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.instability.len() + self.interference.len() + self.mutex.len() + self.deadlock.len()
    }

    /// Defects other than deadlock.
    pub fn has_hazards(&self) -> bool {
        !(self.instability.is_empty() && self.interference.is_empty() && self.mutex.is_empty())
    }

    /// Human readable report, one line per record.
    pub fn describe(&self, graph: &ChpGraph) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len());
        lines.extend(self.instability.iter().map(|r| r.describe(graph)));
        lines.extend(self.interference.iter().map(|r| r.describe(graph)));
        lines.extend(self.mutex.iter().map(|r| r.describe(graph)));
        lines.extend(self.deadlock.iter().map(|r| r.describe(graph)));
        lines
    }
}

impl Instability {
    pub fn describe(&self, graph: &ChpGraph) -> String {
        let mut text = format!("unstable rule {}", graph.describe_term(self.term));
        for cause in &self.history {
            text.push_str(&format!("\n  after {}", graph.describe_term(*cause)));
        }
        text
    }
}

impl Interference {
    pub fn describe(&self, graph: &ChpGraph) -> String {
        format!(
            "interfering assignments {} and {}",
            graph.describe_term(self.first),
            graph.describe_term(self.second)
        )
    }
}

impl Mutex {
    pub fn describe(&self, graph: &ChpGraph) -> String {
        format!(
            "vacuous rules {} and {} are not mutually exclusive",
            graph.describe_term(self.first),
            graph.describe_term(self.second)
        )
    }
}

impl Deadlock {
    pub fn describe(&self, graph: &ChpGraph) -> String {
        let places: Vec<String> = self.state.places().iter().map(|p| p.to_string()).collect();
        format!(
            "deadlock at {{{}}} {}",
            places.join(" "),
            graph.describe_encoding(&self.state.encoding)
        )
    }
}

impl fmt::Display for ErrorLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "缺陷报告")?;
        writeln!(f, "不稳定: {}", self.instability.len())?;
        for record in &self.instability {
            writeln!(f, "  {}", record.term)?;
        }
        writeln!(f, "干扰: {}", self.interference.len())?;
        for record in &self.interference {
            writeln!(f, "  {} / {}", record.first, record.second)?;
        }
        writeln!(f, "互斥: {}", self.mutex.len())?;
        for record in &self.mutex {
            writeln!(f, "  {} / {}", record.first, record.second)?;
        }
        writeln!(f, "死锁: {}", self.deadlock.len())?;
        for record in &self.deadlock {
            writeln!(f, "  {}", record.state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::TransitionId;

    fn term(t: u32) -> TermIndex {
        TermIndex::new(TransitionId::new(t), 0)
    }

    #[test]
    fn repeated_records_are_ignored() {
        let mut ledger = ErrorLedger::new();
        assert!(ledger.insert_interference(Interference::new(term(3), term(1))));
        assert!(!ledger.insert_interference(Interference::new(term(1), term(3))));
        assert!(ledger.insert_interference(Interference::new(term(0), term(2))));
        assert_eq!(ledger.interference[0].first, term(0));
        assert_eq!(ledger.interference.len(), 2);
        assert!(ledger.has_hazards());
    }

    #[test]
    fn merge_is_a_sorted_union() {
        let mut a = ErrorLedger::new();
        a.insert_mutex(Mutex::new(term(2), term(4)));
        a.insert_instability(Instability { term: term(5), history: vec![term(1)] });
        let mut b = ErrorLedger::new();
        b.insert_mutex(Mutex::new(term(4), term(2)));
        b.insert_mutex(Mutex::new(term(0), term(1)));
        b.insert_deadlock(Deadlock { state: State::default() });

        a.merge(&b);
        assert_eq!(a.mutex, vec![Mutex::new(term(0), term(1)), Mutex::new(term(2), term(4))]);
        assert_eq!(a.len(), 4);

        let before = a.clone();
        a.merge(&b);
        assert_eq!(a, before);
    }
}
