//! Markings with their encodings, and the bookkeeping the simulator keeps for
//! every enabled transition.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::logic::{Cube, Encoding, Expression};
use crate::net::{Composition, PlaceId, TransitionId};

/// One term of one transition's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermIndex {
    pub transition: TransitionId,
    pub term: usize,
}

impl TermIndex {
    pub fn new(transition: TransitionId, term: usize) -> Self {
        Self { transition, term }
    }
}

impl fmt::Display for TermIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.transition, self.term)
    }
}

/// A fired term and the remote effect it had.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Firing {
    pub term: TermIndex,
    pub remote: Cube,
}

/// A token sits on a place and carries the guard its successors must still
/// see satisfied. `cause` is the firing that produced it and does not take
/// part in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub place: PlaceId,
    pub guard: Expression,
    pub cause: Option<TermIndex>,
}

impl Token {
    pub fn new(place: PlaceId) -> Self {
        Self {
            place,
            guard: Expression::truth(),
            cause: None,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.place == other.place && self.guard == other.guard
    }
}

impl Eq for Token {}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.place, &self.guard).cmp(&(other.place, &other.guard))
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.place.hash(state);
        self.guard.hash(state);
    }
}

/// A marking plus what is known about every net. Tokens are kept sorted so
/// equal states compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub tokens: Vec<Token>,
    pub encoding: Encoding,
}

impl State {
    pub fn new(mut tokens: Vec<Token>, encoding: Encoding) -> Self {
        tokens.sort();
        tokens.dedup();
        Self { tokens, encoding }
    }

    /// Plain tokens on `places`.
    pub fn marking(places: &[PlaceId], encoding: Encoding) -> Self {
        Self::new(places.iter().copied().map(Token::new).collect(), encoding)
    }

    /// Token places, ascending, without repeats.
    pub fn places(&self) -> Vec<PlaceId> {
        let mut places: Vec<PlaceId> = self.tokens.iter().map(|token| token.place).collect();
        places.dedup();
        places
    }

    pub fn contains(&self, place: PlaceId) -> bool {
        self.tokens.iter().any(|token| token.place == place)
    }

    /// Combines two states. Parallel and sequential composition keep both
    /// markings and everything either side knows; a choice keeps both
    /// markings but only what both sides agree on.
    pub fn merge(composition: Composition, a: &State, b: &State) -> State {
        let tokens = a.tokens.iter().chain(&b.tokens).cloned().collect();
        let encoding = match composition {
            Composition::Parallel | Composition::Sequence => a.encoding.and(&b.encoding),
            Composition::Choice => a.encoding.widen(&b.encoding),
        };
        State::new(tokens, encoding)
    }

    /// A single plain token on `place` with this state's encoding.
    pub fn collapse(&self, place: PlaceId) -> State {
        State::marking(&[place], self.encoding.clone())
    }

    /// Moves every token through `mapping`; a token whose place maps to
    /// several places is duplicated, one whose place is unmapped is dropped.
    pub fn convert(&self, mapping: &dyn Fn(PlaceId) -> Vec<PlaceId>) -> State {
        let tokens = self
            .tokens
            .iter()
            .flat_map(|token| {
                mapping(token.place).into_iter().map(move |place| Token {
                    place,
                    ..token.clone()
                })
            })
            .collect();
        State::new(tokens, self.encoding.clone())
    }

    /// Every token of `self` appears in `other` and `self` knows at least
    /// what `other` knows.
    pub fn is_subset_of(&self, other: &State) -> bool {
        self.tokens.iter().all(|token| other.tokens.contains(token))
            && self.encoding.refines(&other.encoding)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", token.place)?;
        }
        write!(f, "}} {}", self.encoding)
    }
}

/// A term ready to fire from the current marking.
#[derive(Debug, Clone)]
pub struct EnabledTransition {
    pub index: TermIndex,
    /// Positions of the consumed tokens in the simulator's token list.
    pub tokens: Vec<usize>,
    /// Firings that happened while this term stayed enabled.
    pub history: Vec<Firing>,
    /// The transition guard conjoined with every consumed token's guard.
    pub guard: Expression,
    pub guard_action: Cube,
    pub local_action: Cube,
    pub remote_action: Cube,
    pub vacuous: bool,
    pub stable: bool,
}

impl EnabledTransition {
    pub fn shares_tokens(&self, other: &EnabledTransition) -> bool {
        self.tokens.iter().any(|token| other.tokens.contains(token))
    }

    pub fn history_terms(&self) -> Vec<TermIndex> {
        self.history.iter().map(|firing| firing.term).collect()
    }
}

impl PartialEq for EnabledTransition {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.history == other.history
    }
}

impl Eq for EnabledTransition {}

impl PartialOrd for EnabledTransition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnabledTransition {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index, &self.history).cmp(&(other.index, &other.history))
    }
}
