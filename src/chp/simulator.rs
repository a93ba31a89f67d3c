//! 基于 token 的多值仿真器.
//!
//! 每一步先由 [`Simulator::enabled`] 计算就绪集, 再由 [`Simulator::fire`]
//! 发生其中一项. 仿真器同时维护两份编码: `global` 是各信号在电路中的真实值,
//! `local` 是当前控制流所能观察到的值. 检测到的缺陷记入 [`ErrorLedger`],
//! 不会中断仿真.
use rand::Rng;
use thiserror::Error;

use crate::chp::defects::{Deadlock, ErrorLedger, Instability, Interference, Mutex};
use crate::chp::graph::ChpGraph;
use crate::chp::state::{EnabledTransition, Firing, State, TermIndex, Token};
use crate::logic::{Cube, Encoding, Expression, Value};
use crate::net::TransitionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("choice {choice} is out of range, {ready} transitions are ready")]
    ChoiceOutOfRange { choice: usize, ready: usize },
    #[error("transition {0} no longer exists in the graph")]
    StaleTransition(TransitionId),
}

/// Three-valued result of checking a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Fail,
    Unstable,
    Pass,
}

impl GuardOutcome {
    pub fn evaluate(guard: &Expression, local: &Encoding, global: &Encoding) -> Self {
        let local = guard.evaluate(local);
        if local == Value::Zero {
            return GuardOutcome::Fail;
        }
        let passes = |value: Value| matches!(value, Value::One | Value::Unknown);
        if passes(local) && passes(guard.evaluate(global)) {
            GuardOutcome::Pass
        } else {
            GuardOutcome::Unstable
        }
    }
}

/// One walk through the state space of a graph. Cloning forks the walk.
#[derive(Debug, Clone)]
pub struct Simulator<'g> {
    graph: &'g ChpGraph,
    tokens: Vec<Token>,
    ready: Vec<EnabledTransition>,
    local: Encoding,
    global: Encoding,
    last: Option<Firing>,
    /// `ready` reflects the current marking.
    current: bool,
    pub ledger: ErrorLedger,
}

impl<'g> Simulator<'g> {
    pub fn new(graph: &'g ChpGraph, initial: &State) -> Self {
        Self {
            graph,
            tokens: initial.tokens.clone(),
            ready: Vec::new(),
            local: initial.encoding.clone(),
            global: initial.encoding.clone(),
            last: None,
            current: false,
            ledger: ErrorLedger::new(),
        }
    }

    pub fn graph(&self) -> &'g ChpGraph {
        self.graph
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn ready(&self) -> &[EnabledTransition] {
        &self.ready
    }

    pub fn local(&self) -> &Encoding {
        &self.local
    }

    pub fn global(&self) -> &Encoding {
        &self.global
    }

    /// Current marking with the locally observed encoding.
    pub fn state(&self) -> State {
        State::new(self.tokens.clone(), self.local.clone())
    }

    /// Recomputes the ready set and returns its size. Entries stay sorted by
    /// term; a previously ready entry whose guard no longer holds is kept and
    /// marked unstable.
    pub fn enabled(&mut self) -> usize {
        let places: Vec<_> = self.tokens.iter().map(|token| token.place).collect();
        let mut potential: Vec<EnabledTransition> = Vec::new();

        for enabling in self.graph.net.enabled(&places) {
            let Some(transition) = self.graph.net.transitions.get(enabling.transition) else {
                continue;
            };
            let guard = enabling
                .tokens
                .iter()
                .fold(transition.guard.clone(), |guard, i| guard.and(self.tokens[*i].guard.clone()));
            let outcome = GuardOutcome::evaluate(&guard, &self.local, &self.global);
            let guard_action = guard.implied_literals();
            let entry = |term: usize, local_action: Cube, remote_action: Cube| EnabledTransition {
                index: TermIndex::new(enabling.transition, term),
                tokens: enabling.tokens.clone(),
                history: Vec::new(),
                guard: guard.clone(),
                guard_action: guard_action.clone(),
                local_action,
                remote_action,
                vacuous: false,
                stable: outcome == GuardOutcome::Pass,
            };

            if transition.is_passive() {
                if outcome != GuardOutcome::Fail {
                    potential.push(entry(0, Cube::new(), Cube::new()));
                }
                continue;
            }
            for (term_no, term) in transition.action.terms.iter().enumerate() {
                let local_action = term.evaluate(&self.local);
                let remote_action = self.graph.nets.project_remote(&local_action);
                let vacuous = !term.has_side_effect() && !self.global.would_change(&remote_action);
                if outcome == GuardOutcome::Fail && !vacuous {
                    continue;
                }
                let mut ready = entry(term_no, local_action, remote_action);
                ready.vacuous = vacuous;
                ready.stable |= vacuous;
                potential.push(ready);
            }
        }
        potential.sort();

        let last = self.last.take();
        for previous in std::mem::take(&mut self.ready) {
            match potential.binary_search_by(|entry| entry.index.cmp(&previous.index)) {
                Ok(pos) => {
                    let entry = &mut potential[pos];
                    entry.history = previous.history;
                    entry.history.extend(last.clone());
                }
                Err(pos) => {
                    let mut stale = previous;
                    stale.stable = false;
                    stale.history.extend(last.clone());
                    potential.insert(pos, stale);
                }
            }
        }
        self.ready = potential;
        self.current = true;
        self.check_mutex();
        self.ready.len()
    }

    fn check_mutex(&mut self) {
        for (i, a) in self.ready.iter().enumerate() {
            for b in &self.ready[i + 1..] {
                if !(a.vacuous && b.vacuous) {
                    continue;
                }
                let contested = a
                    .tokens
                    .iter()
                    .filter(|token| b.tokens.contains(token))
                    .any(|token| {
                        let place = self.tokens[*token].place;
                        !self.graph.net.places.get(place).is_some_and(|p| p.arbiter)
                    });
                if contested && self.ledger.insert_mutex(Mutex::new(a.index, b.index)) {
                    log::warn!("{}", Mutex::new(a.index, b.index).describe(self.graph));
                }
            }
        }
    }

    /// Fires ready entry `choice` and returns it with the effects it actually
    /// had. Call [`Simulator::enabled`] before the next firing.
    pub fn fire(&mut self, choice: usize) -> Result<EnabledTransition, SimError> {
        let Some(fired) = self.ready.get(choice).cloned() else {
            return Err(SimError::ChoiceOutOfRange {
                choice,
                ready: self.ready.len(),
            });
        };
        let graph = self.graph;
        let transition = graph
            .net
            .transitions
            .get(fired.index.transition)
            .ok_or(SimError::StaleTransition(fired.index.transition))?;
        let mut fired = fired;

        self.ready.retain(|entry| !entry.shares_tokens(&fired));
        self.current = false;
        if !fired.stable {
            let record = Instability {
                term: fired.index,
                history: fired.history_terms(),
            };
            if self.ledger.insert_instability(record.clone()) {
                log::error!("{}", record.describe(self.graph));
            }
        }

        let mut consumed = fired.tokens.clone();
        consumed.sort_unstable_by(|a, b| b.cmp(a));
        for index in consumed {
            for entry in &mut self.ready {
                for token in &mut entry.tokens {
                    if *token > index {
                        *token -= 1;
                    }
                }
            }
            self.tokens.remove(index);
        }

        let guard = if transition.is_passive() {
            if fired.stable {
                self.global.and_in(&fired.guard_action);
                self.local.and_in(&fired.guard_action);
            }
            self.local.observe(&self.global);
            fired.guard.clone()
        } else {
            for earlier in &fired.history {
                if fired.remote_action.conflicts_with(&earlier.remote) {
                    let record = Interference::new(earlier.term, fired.index);
                    if self.ledger.insert_interference(record) {
                        log::error!("{}", record.describe(self.graph));
                    }
                }
                fired.local_action = fired.local_action.interfere(&earlier.remote);
                fired.remote_action = fired.remote_action.interfere(&earlier.remote);
            }
            if fired.stable && !fired.vacuous {
                self.global.and_in(&fired.guard_action);
                self.local.and_in(&fired.guard_action);
            }
            self.global.assign(&fired.remote_action, fired.stable);
            self.local.assign(&fired.local_action, fired.stable);
            self.local.observe(&self.global);
            Expression::from_cube(&fired.local_action)
        };

        for place in self.graph.net.output_places(fired.index.transition) {
            self.tokens.push(Token {
                place,
                guard: guard.clone(),
                cause: Some(fired.index),
            });
        }
        self.last = Some(Firing {
            term: fired.index,
            remote: fired.remote_action.clone(),
        });
        log::debug!("fired {}", self.graph.describe_term(fired.index));
        Ok(fired)
    }

    /// Fires a uniformly chosen ready entry; `None` when nothing is ready.
    pub fn fire_random<R: Rng>(
        &mut self,
        rng: &mut R,
    ) -> Result<Option<EnabledTransition>, SimError> {
        if self.ready.is_empty() {
            return Ok(None);
        }
        let choice = rng.random_range(0..self.ready.len());
        self.fire(choice).map(Some)
    }

    /// Records and returns a deadlock when nothing is ready. A ready set left
    /// over from the last firing is recomputed first.
    pub fn deadlock(&mut self) -> Option<Deadlock> {
        if !self.current {
            self.enabled();
        }
        if !self.ready.is_empty() {
            return None;
        }
        let record = Deadlock { state: self.state() };
        if self.ledger.insert_deadlock(record.clone()) {
            log::error!("{}", record.describe(self.graph));
        }
        Some(record)
    }

    /// Pairs of ready entries that are both vacuous and compete for a token.
    pub fn vacuous_choices(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.ready.iter().enumerate() {
            for (j, b) in self.ready.iter().enumerate().skip(i + 1) {
                if a.vacuous && b.vacuous && a.shares_tokens(b) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Folds the defects of another walk into this one.
    pub fn merge_errors(&mut self, other: &Simulator<'_>) {
        self.ledger.merge(&other.ledger);
    }
}
