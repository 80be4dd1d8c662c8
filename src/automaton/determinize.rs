//! Subset-construction determinization, completion and complement.
//!
//! The segment alphabet is infinite, but only finitely many symbols
//! distinguish states within one NFA: every distinct literal segment, the
//! wildcards keyed by their textual source tags, and one "any" symbol for
//! segments matched only by globstar self-loops (or existing catch-alls).
//! Subset construction runs a standard worklist over those symbols, bounded
//! by a hard state cap.
//!
//! Wildcard tags reachable from one state-set can overlap: `{*.ts/a,f*/b}`
//! puts `*.ts` and `f*` on the same frontier, and `file.ts` satisfies both.
//! One symbol per tag would force a choice and drop the other branch, so the
//! tags outgoing from each state-set are refined into one symbol per
//! non-empty tag subset, denoting the segments that match exactly that
//! subset. Refined transitions are emitted largest-subset-first with the
//! subset's predicates conjoined; the deterministic matcher's in-order scan
//! then lands every concrete segment on the full set of wildcards it
//! satisfies, which keeps determinization language-preserving.
//!
//! Completion appends a sink state and a catch-all transition from every
//! state that lacks one, making the DFA total. Complement is then a pure
//! accepting-bit flip; the sink becomes the "any other path" acceptor.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::LimitError;

use super::simulate::{epsilon_closure, StateSet};
use super::state::{SegmentAutomaton, SegmentPredicate, StateId, Transition, CATCH_ALL_TAG};

/// Default hard cap on DFA states produced by subset construction.
pub const DEFAULT_MAX_DFA_STATES: usize = 10_000;

/// Per-call determinization limits.
#[derive(Debug, Clone, Copy)]
pub struct DeterminizeOptions {
    pub max_states: usize,
}

impl Default for DeterminizeOptions {
    fn default() -> Self {
        Self {
            max_states: DEFAULT_MAX_DFA_STATES,
        }
    }
}

/// Per-state tag refinement is exponential in the number of distinct tags on
/// one frontier; past this many the construction falls back to singleton
/// symbols (the pre-refinement behavior).
const MAX_REFINED_WILDCARDS: usize = 10;

/// Every distinct literal segment in the automaton, sorted.
fn collect_literals(automaton: &SegmentAutomaton) -> Vec<String> {
    let mut literals = std::collections::BTreeSet::new();
    for state in &automaton.states {
        for transition in &state.transitions {
            if let Transition::Literal { segment, .. } = transition {
                literals.insert(segment.clone());
            }
        }
    }
    literals.into_iter().collect()
}

/// Wildcard tags (catch-all excluded) with transitions out of `set`, sorted
/// by tag. These are the tags the per-state refinement splits.
fn local_wildcards(
    automaton: &SegmentAutomaton,
    set: &[StateId],
) -> Vec<(String, SegmentPredicate)> {
    let mut wildcards = std::collections::BTreeMap::new();
    for &state in set {
        for transition in &automaton[state].transitions {
            if let Transition::Wildcard { matcher, source, .. } = transition {
                if source != CATCH_ALL_TAG {
                    wildcards
                        .entry(source.clone())
                        .or_insert_with(|| matcher.clone());
                }
            }
        }
    }
    wildcards.into_iter().collect()
}

/// All non-empty index subsets of `count` tags, largest first (stable order
/// within one size). Falls back to singletons past [`MAX_REFINED_WILDCARDS`].
fn tag_subsets(count: usize) -> Vec<Vec<usize>> {
    if count > MAX_REFINED_WILDCARDS {
        return (0..count).map(|i| vec![i]).collect();
    }
    let mut subsets: Vec<Vec<usize>> = (1u32..(1u32 << count))
        .map(|mask| (0..count).filter(|i| mask & (1 << i) != 0).collect())
        .collect();
    subsets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    subsets
}

/// Conjoin the predicates of one tag subset.
fn combined_matcher(
    local: &[(String, SegmentPredicate)],
    subset: &[usize],
) -> SegmentPredicate {
    let mut matchers = subset.iter().map(|&i| local[i].1.clone());
    let Some(first) = matchers.next() else {
        return SegmentPredicate::never();
    };
    matchers.fold(first, |acc, next| {
        SegmentPredicate::Both(Box::new(acc), Box::new(next))
    })
}

/// The diagnostic source tag of one tag subset.
fn combined_source(tags: &[&str]) -> String {
    match tags {
        [single] => (*single).to_string(),
        many => many
            .iter()
            .map(|tag| format!("({tag})"))
            .collect::<Vec<_>>()
            .join("∩"),
    }
}

/// What a symbol denotes when computing a move set.
enum Symbol<'a> {
    /// The exact segment string.
    Literal(&'a str),
    /// Segments matching exactly this set of wildcard tags (and no listed
    /// literal).
    Wildcards(&'a [&'a str]),
    /// Segments not covered by any listed literal or wildcard.
    Any,
}

/// Convert an NFA into an equivalent complete DFA.
///
/// Fails with [`LimitError::DfaStateLimit`] when subset construction would
/// allocate more than `opts.max_states` states.
pub fn determinize(
    nfa: &SegmentAutomaton,
    opts: &DeterminizeOptions,
) -> Result<SegmentAutomaton, LimitError> {
    let literals = collect_literals(nfa);

    let mut dfa = SegmentAutomaton::new();
    dfa.deterministic = true;

    let mut interned: FxHashMap<Vec<StateId>, StateId> = FxHashMap::default();
    let mut worklist: VecDeque<(Vec<StateId>, StateId)> = VecDeque::new();

    let mut seed: StateSet = SmallVec::new();
    seed.push(nfa.initial);
    epsilon_closure(nfa, &mut seed);
    let seed: Vec<StateId> = seed.to_vec();
    intern(
        nfa, &mut dfa, &mut interned, &mut worklist, seed, opts.max_states,
    )?;

    while let Some((set, dfa_state)) = worklist.pop_front() {
        for literal in &literals {
            let moved = move_set(nfa, &set, Symbol::Literal(literal));
            if moved.is_empty() {
                continue;
            }
            let target = intern(
                nfa, &mut dfa, &mut interned, &mut worklist, moved, opts.max_states,
            )?;
            dfa.add_transition(
                dfa_state,
                Transition::Literal {
                    segment: literal.clone(),
                    target,
                },
            );
        }

        // Refined wildcard symbols, largest tag subset first; the emission
        // order is what the deterministic matcher's scan relies on.
        let local = local_wildcards(nfa, &set);
        for subset in tag_subsets(local.len()) {
            let tags: Vec<&str> = subset.iter().map(|&i| local[i].0.as_str()).collect();
            let moved = move_set(nfa, &set, Symbol::Wildcards(&tags));
            if moved.is_empty() {
                continue;
            }
            let target = intern(
                nfa, &mut dfa, &mut interned, &mut worklist, moved, opts.max_states,
            )?;
            dfa.add_transition(
                dfa_state,
                Transition::Wildcard {
                    matcher: combined_matcher(&local, &subset),
                    source: combined_source(&tags),
                    target,
                },
            );
        }

        let moved = move_set(nfa, &set, Symbol::Any);
        if !moved.is_empty() {
            let target = intern(
                nfa, &mut dfa, &mut interned, &mut worklist, moved, opts.max_states,
            )?;
            dfa.add_transition(
                dfa_state,
                Transition::Wildcard {
                    matcher: SegmentPredicate::any_segment(),
                    source: CATCH_ALL_TAG.to_string(),
                    target,
                },
            );
        }
    }

    complete(&mut dfa);
    Ok(dfa)
}

/// Look up or allocate the DFA state for an NFA state-set.
fn intern(
    nfa: &SegmentAutomaton,
    dfa: &mut SegmentAutomaton,
    interned: &mut FxHashMap<Vec<StateId>, StateId>,
    worklist: &mut VecDeque<(Vec<StateId>, StateId)>,
    set: Vec<StateId>,
    max_states: usize,
) -> Result<StateId, LimitError> {
    if let Some(&existing) = interned.get(&set) {
        return Ok(existing);
    }
    if dfa.len() + 1 > max_states {
        return Err(LimitError::DfaStateLimit {
            limit: max_states,
            attempted: dfa.len() + 1,
        });
    }
    let id = dfa.alloc();
    if set.iter().any(|s| nfa[*s].accepting) {
        dfa.mark_accepting(id);
    }
    interned.insert(set.clone(), id);
    worklist.push_back((set, id));
    Ok(id)
}

/// Union of transition targets applicable to `symbol`, epsilon-closed.
fn move_set(nfa: &SegmentAutomaton, set: &[StateId], symbol: Symbol<'_>) -> Vec<StateId> {
    let mut moved: StateSet = SmallVec::new();

    for &state in set {
        for transition in &nfa[state].transitions {
            match (&symbol, transition) {
                (Symbol::Literal(lit), Transition::Literal { segment, target })
                    if segment == lit =>
                {
                    moved.push(*target);
                }
                (Symbol::Literal(lit), Transition::Wildcard { matcher, target, .. })
                    if matcher.accepts(lit) =>
                {
                    moved.push(*target);
                }
                (Symbol::Wildcards(tags), Transition::Wildcard { source, target, .. })
                    if source == CATCH_ALL_TAG || tags.iter().any(|tag| source == *tag) =>
                {
                    moved.push(*target);
                }
                (Symbol::Any, Transition::Wildcard { source, target, .. })
                    if source == CATCH_ALL_TAG =>
                {
                    moved.push(*target);
                }
                (_, Transition::Globstar { self_loop, .. }) => {
                    moved.push(*self_loop);
                }
                _ => {}
            }
        }
    }

    epsilon_closure(nfa, &mut moved);
    moved.to_vec()
}

/// Make the DFA total: add a sink and route unlisted segments to it.
fn complete(dfa: &mut SegmentAutomaton) {
    let sink = dfa.alloc();
    dfa.add_transition(
        sink,
        Transition::Wildcard {
            matcher: SegmentPredicate::catch_all(),
            source: CATCH_ALL_TAG.to_string(),
            target: sink,
        },
    );

    for idx in 0..dfa.len() {
        let id = StateId(idx as u32);
        if id == sink {
            continue;
        }
        if !dfa[id].transitions.iter().any(Transition::is_catch_all) {
            dfa.add_transition(
                id,
                Transition::Wildcard {
                    matcher: SegmentPredicate::catch_all(),
                    source: CATCH_ALL_TAG.to_string(),
                    target: sink,
                },
            );
        }
    }
}

/// Flip the accepting bit of every state of a complete DFA.
///
/// The sink introduced by completion becomes accepting, which is exactly
/// what makes "any other path" match.
pub fn complement_automaton(dfa: &SegmentAutomaton) -> SegmentAutomaton {
    let mut out = dfa.clone();
    for state in &mut out.states {
        state.accepting = !state.accepting;
    }
    out.recompute_accepting();
    out.deterministic = true;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::builder::build_automaton;
    use crate::automaton::simulate::automaton_matches;
    use crate::pattern::parse;

    fn nfa(source: &str) -> SegmentAutomaton {
        build_automaton(&parse(source)).0
    }

    fn dfa(source: &str) -> SegmentAutomaton {
        determinize(&nfa(source), &DeterminizeOptions::default()).unwrap()
    }

    #[test]
    fn test_dfa_is_marked_deterministic_and_complete() {
        let d = dfa("src/**/*.ts");
        assert!(d.deterministic);
        for state in &d.states {
            assert!(
                state.transitions.iter().any(Transition::is_catch_all),
                "every state of a complete DFA carries a catch-all"
            );
        }
    }

    #[test]
    fn test_dfa_agrees_with_nfa() {
        let samples: &[&[&str]] = &[
            &[],
            &["src"],
            &["src", "index.ts"],
            &["src", "index.js"],
            &["src", "a", "b", "mod.ts"],
            &["lib", "index.ts"],
            &["index.ts"],
            &["file.ts", "a"],
            &["file.ts", "b"],
            &["foo", "b"],
        ];
        for pattern in [
            "src/**/*.ts",
            "**/*.ts",
            "src/index.ts",
            "{a,b}/x",
            "src/**",
            "",
            "{*.ts/a,f*/b}",
        ] {
            let n = nfa(pattern);
            let d = determinize(&n, &DeterminizeOptions::default()).unwrap();
            for sample in samples {
                assert_eq!(
                    automaton_matches(&n, sample),
                    automaton_matches(&d, sample),
                    "pattern {pattern} on {sample:?}"
                );
            }
        }
    }

    #[test]
    fn test_overlapping_wildcard_tags_keep_both_branches() {
        // `file.ts` satisfies both first-segment wildcards, so the symbol
        // for one tag alone must not swallow the other branch: the refined
        // DFA has to keep the `b` continuation alive alongside the `a` one.
        let n = nfa("{*.ts/a,f*/b}");
        let d = determinize(&n, &DeterminizeOptions::default()).unwrap();

        assert!(automaton_matches(&d, &["file.ts", "b"]));
        assert!(automaton_matches(&d, &["file.ts", "a"]));

        let samples: &[&[&str]] = &[
            &["file.ts", "a"],
            &["file.ts", "b"],
            &["x.ts", "a"],
            &["x.ts", "b"],
            &["foo", "a"],
            &["foo", "b"],
            &["file.ts"],
            &["other", "a"],
        ];
        for sample in samples {
            assert_eq!(
                automaton_matches(&n, sample),
                automaton_matches(&d, sample),
                "{sample:?}"
            );
        }
    }

    #[test]
    fn test_state_cap_enforced() {
        let n = nfa("{a,b,c,d,e}/*.ts");
        let err = determinize(&n, &DeterminizeOptions { max_states: 2 }).unwrap_err();
        match err {
            LimitError::DfaStateLimit { limit, attempted } => {
                assert_eq!(limit, 2);
                assert!(attempted > 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_segment_lands_in_sink() {
        let d = dfa("src/*.ts");
        assert!(!automaton_matches(&d, &["somewhere", "else"]));
        assert!(automaton_matches(&d, &["src", "x.ts"]));
    }

    #[test]
    fn test_complement_flips_acceptance() {
        let d = dfa("**/*.test.ts");
        let c = complement_automaton(&d);
        assert!(automaton_matches(&d, &["src", "index.test.ts"]));
        assert!(!automaton_matches(&c, &["src", "index.test.ts"]));
        assert!(!automaton_matches(&d, &["src", "index.ts"]));
        assert!(automaton_matches(&c, &["src", "index.ts"]));
    }

    #[test]
    fn test_double_complement_restores_accepting() {
        let d = dfa("src/**");
        let back = complement_automaton(&complement_automaton(&d));
        assert_eq!(back.accepting, d.accepting);
        for (a, b) in back.states.iter().zip(d.states.iter()) {
            assert_eq!(a.accepting, b.accepting);
        }
    }

    #[test]
    fn test_redeterminize_complete_dfa() {
        // Determinizing an already-complete DFA must preserve the language.
        let d = dfa("src/**/*.ts");
        let d2 = determinize(&d, &DeterminizeOptions::default()).unwrap();
        for sample in [
            vec!["src", "index.ts"],
            vec!["src", "a", "b.ts"],
            vec!["lib", "x.ts"],
            vec!["src"],
        ] {
            let refs: Vec<&str> = sample.clone();
            assert_eq!(
                automaton_matches(&d, &refs),
                automaton_matches(&d2, &refs),
                "{sample:?}"
            );
        }
    }
}
