//! Core data structures for the segment automaton.
//!
//! States live in a flat vector and reference each other by [`StateId`]
//! index, so self-loops and back-edges need no ownership gymnastics. The
//! four transition variants are a closed sum; matching and subset
//! construction dispatch on the tag.

use regex::Regex;

/// A state identifier: an index into the automaton's state vector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct StateId(pub(crate) u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source tag carried by catch-all wildcard transitions.
///
/// The deterministic matcher tries catch-alls last; subset construction and
/// completion both emit this tag for the "any" symbol and the sink loop.
pub const CATCH_ALL_TAG: &str = "*";

/// Predicate over segment strings.
///
/// Algebra operations need intersection of wildcard languages, which has no
/// simple surface regex; `Both` keeps the two operands as closed data and
/// tests them in turn.
#[derive(Debug, Clone)]
pub enum SegmentPredicate {
    Regex(Regex),
    Both(Box<SegmentPredicate>, Box<SegmentPredicate>),
}

impl SegmentPredicate {
    /// Compile from a regex source; falls back to a never-matching predicate
    /// when the source does not compile (callers report the diagnostic).
    pub fn from_source(source: &str) -> Result<Self, regex::Error> {
        Ok(SegmentPredicate::Regex(Regex::new(source)?))
    }

    /// `^.+$`: any one (non-empty) segment.
    pub fn any_segment() -> Self {
        SegmentPredicate::Regex(Regex::new("^.+$").expect("static regex"))
    }

    /// `^.*$`: the completion catch-all.
    pub fn catch_all() -> Self {
        SegmentPredicate::Regex(Regex::new("^.*$").expect("static regex"))
    }

    /// A predicate that accepts nothing, used when a segment degrades after
    /// a lowering failure.
    pub fn never() -> Self {
        SegmentPredicate::Regex(Regex::new(r"^[^\s\S]$").expect("static regex"))
    }

    pub fn accepts(&self, segment: &str) -> bool {
        match self {
            SegmentPredicate::Regex(re) => re.is_match(segment),
            SegmentPredicate::Both(a, b) => a.accepts(segment) && b.accepts(segment),
        }
    }
}

/// One outgoing edge of a state.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Consumes exactly the segment equal to `segment`.
    Literal { segment: String, target: StateId },
    /// Consumes one segment accepted by `matcher`. `source` is the textual
    /// tag that identifies this wildcard as an alphabet symbol.
    Wildcard {
        matcher: SegmentPredicate,
        source: String,
        target: StateId,
    },
    /// `**`: `self_loop` consumes any one segment and stays; `exit` is
    /// epsilon-like and models the zero-segment match.
    Globstar { self_loop: StateId, exit: StateId },
    /// Consumes nothing.
    Epsilon { target: StateId },
}

impl Transition {
    /// Rewrite every referenced state id. Used when splicing automata.
    pub(crate) fn retarget(&self, f: impl Fn(StateId) -> StateId) -> Transition {
        match self {
            Transition::Literal { segment, target } => Transition::Literal {
                segment: segment.clone(),
                target: f(*target),
            },
            Transition::Wildcard {
                matcher,
                source,
                target,
            } => Transition::Wildcard {
                matcher: matcher.clone(),
                source: source.clone(),
                target: f(*target),
            },
            Transition::Globstar { self_loop, exit } => Transition::Globstar {
                self_loop: f(*self_loop),
                exit: f(*exit),
            },
            Transition::Epsilon { target } => Transition::Epsilon { target: f(*target) },
        }
    }

    /// True for the completion catch-all (`*` tag).
    pub(crate) fn is_catch_all(&self) -> bool {
        matches!(self, Transition::Wildcard { source, .. } if source == CATCH_ALL_TAG)
    }
}

/// A state: its outgoing transitions and accepting bit.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub transitions: Vec<Transition>,
    pub accepting: bool,
}

/// A segment-alphabet automaton.
///
/// Immutable once constructed; algebra operations always build fresh
/// automata. The `accepting` list always mirrors the per-state bits
/// (`recompute_accepting` restores the invariant after bulk edits).
#[derive(Debug, Clone)]
pub struct SegmentAutomaton {
    pub states: Vec<State>,
    pub initial: StateId,
    pub accepting: Vec<StateId>,
    pub deterministic: bool,
}

impl Default for SegmentAutomaton {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentAutomaton {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            initial: StateId(0),
            accepting: Vec::new(),
            deterministic: false,
        }
    }

    /// Allocate a fresh state, returning its id.
    pub fn alloc(&mut self) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(State::default());
        id
    }

    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        self.states[from.index()].transitions.push(transition);
    }

    pub fn mark_accepting(&mut self, id: StateId) {
        let state = &mut self.states[id.index()];
        if !state.accepting {
            state.accepting = true;
            self.accepting.push(id);
        }
    }

    #[inline]
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Rebuild the accepting-id list from the per-state bits.
    pub fn recompute_accepting(&mut self) {
        self.accepting = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.accepting)
            .map(|(i, _)| StateId(i as u32))
            .collect();
    }
}

impl std::ops::Index<StateId> for SegmentAutomaton {
    type Output = State;

    #[inline]
    fn index(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }
}

impl std::ops::IndexMut<StateId> for SegmentAutomaton {
    #[inline]
    fn index_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id.index()]
    }
}
