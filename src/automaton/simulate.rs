//! NFA/DFA simulation over segment lists.
//!
//! Non-deterministic automata run as a set simulation: epsilon closure of the
//! initial state, one transition round per input segment, closure again,
//! accept if the final set contains an accepting state. Epsilon closure
//! follows `Epsilon` targets and globstar `exit` edges (a globstar can match
//! zero segments).
//!
//! Deterministic automata take the single-state fast path. Transition choice
//! is ordered: exact literal, then specific wildcards, then the catch-all.
//! The ordering is semantically significant: the completion sink is reached
//! through the catch-all, and trying it before specific transitions would
//! break complement.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::state::{SegmentAutomaton, StateId, Transition, CATCH_ALL_TAG};

/// Working set of active states. Small patterns stay on the stack.
pub(crate) type StateSet = SmallVec<[StateId; 8]>;

/// Run the automaton over a segment list.
pub fn automaton_matches(automaton: &SegmentAutomaton, segments: &[&str]) -> bool {
    if automaton.deterministic {
        dfa_matches(automaton, segments)
    } else {
        nfa_matches(automaton, segments)
    }
}

/// Expand `states` to its epsilon closure, in place. The result is sorted
/// and deduplicated so sets can be compared and hashed.
pub(crate) fn epsilon_closure(automaton: &SegmentAutomaton, states: &mut StateSet) {
    let mut stack: StateSet = states.clone();
    let mut seen: FxHashSet<StateId> = states.iter().copied().collect();

    while let Some(state) = stack.pop() {
        for transition in &automaton[state].transitions {
            let target = match transition {
                Transition::Epsilon { target } => *target,
                Transition::Globstar { exit, .. } => *exit,
                _ => continue,
            };
            if seen.insert(target) {
                states.push(target);
                stack.push(target);
            }
        }
    }

    states.sort_unstable();
    states.dedup();
}

fn nfa_matches(automaton: &SegmentAutomaton, segments: &[&str]) -> bool {
    let mut current: StateSet = SmallVec::new();
    current.push(automaton.initial);
    epsilon_closure(automaton, &mut current);

    for segment in segments {
        let mut next: StateSet = SmallVec::new();
        for &state in &current {
            for transition in &automaton[state].transitions {
                match transition {
                    Transition::Literal { segment: lit, target } if lit == segment => {
                        next.push(*target);
                    }
                    Transition::Wildcard { matcher, target, .. }
                        if matcher.accepts(segment) =>
                    {
                        next.push(*target);
                    }
                    // Consuming branch; the exit edge is covered by closure.
                    Transition::Globstar { self_loop, .. } => next.push(*self_loop),
                    _ => {}
                }
            }
        }
        epsilon_closure(automaton, &mut next);
        if next.is_empty() {
            return false;
        }
        current = next;
    }

    current.iter().any(|s| automaton[*s].accepting)
}

fn dfa_matches(automaton: &SegmentAutomaton, segments: &[&str]) -> bool {
    let mut current = automaton.initial;
    for segment in segments {
        match dfa_step(automaton, current, segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    automaton[current].accepting
}

/// The unique applicable transition of a deterministic state on a concrete
/// segment: exact literal first, then specific wildcards in order, then the
/// catch-all.
pub(crate) fn dfa_step(
    automaton: &SegmentAutomaton,
    state: StateId,
    segment: &str,
) -> Option<StateId> {
    let transitions = &automaton[state].transitions;

    for transition in transitions {
        if let Transition::Literal { segment: lit, target } = transition {
            if lit == segment {
                return Some(*target);
            }
        }
    }
    for transition in transitions {
        if let Transition::Wildcard {
            matcher,
            source,
            target,
        } = transition
        {
            if source != CATCH_ALL_TAG && matcher.accepts(segment) {
                return Some(*target);
            }
        }
    }
    transitions.iter().find_map(|t| match t {
        Transition::Wildcard { source, target, .. } if source == CATCH_ALL_TAG => Some(*target),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::builder::build_automaton;
    use crate::pattern::parse;

    fn nfa(source: &str) -> SegmentAutomaton {
        build_automaton(&parse(source)).0
    }

    fn accepts(automaton: &SegmentAutomaton, segments: &[&str]) -> bool {
        automaton_matches(automaton, segments)
    }

    #[test]
    fn test_literal_sequence() {
        let a = nfa("src/index.ts");
        assert!(accepts(&a, &["src", "index.ts"]));
        assert!(!accepts(&a, &["src"]));
        assert!(!accepts(&a, &["src", "index.ts", "extra"]));
        assert!(!accepts(&a, &["lib", "index.ts"]));
    }

    #[test]
    fn test_empty_pattern_accepts_no_segments() {
        let a = nfa("");
        assert!(accepts(&a, &[]));
        assert!(!accepts(&a, &["src"]));
    }

    #[test]
    fn test_globstar_zero_or_more() {
        let a = nfa("src/**");
        assert!(accepts(&a, &["src"]), "`**` matches zero segments");
        assert!(accepts(&a, &["src", "a"]));
        assert!(accepts(&a, &["src", "a", "b", "c"]));
        assert!(!accepts(&a, &["lib"]));
    }

    #[test]
    fn test_globstar_between() {
        let a = nfa("src/**/*.ts");
        assert!(accepts(&a, &["src", "index.ts"]));
        assert!(accepts(&a, &["src", "deep", "nested", "mod.ts"]));
        assert!(!accepts(&a, &["src", "index.js"]));
        assert!(!accepts(&a, &["src"]));
    }

    #[test]
    fn test_leading_globstar() {
        let a = nfa("**/*.ts");
        assert!(accepts(&a, &["index.ts"]));
        assert!(accepts(&a, &["a", "b", "index.ts"]));
        assert!(!accepts(&a, &["index.js"]));
    }

    #[test]
    fn test_alternation_branches() {
        let a = nfa("{src,lib}/main.ts");
        assert!(accepts(&a, &["src", "main.ts"]));
        assert!(accepts(&a, &["lib", "main.ts"]));
        assert!(!accepts(&a, &["bin", "main.ts"]));
    }

    #[test]
    fn test_epsilon_closure_through_globstar_exit() {
        let a = nfa("**");
        let mut set: StateSet = SmallVec::new();
        set.push(a.initial);
        epsilon_closure(&a, &mut set);
        // The exit (accepting) state is reachable without consuming input.
        assert!(set.iter().any(|s| a[*s].accepting));
    }
}
