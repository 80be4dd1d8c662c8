//! Product composition: intersection and union of segment automata.
//!
//! Intersection is a pairwise product over reachable state pairs. For
//! deterministic inputs the combiner pairs each symbol with the *effective*
//! transition on the other side (exact literal, then specific wildcard, then
//! catch-all), so the priority semantics of complete DFAs survive the
//! product. Wildcard-with-wildcard pairs keep both predicates as closed data
//! ([`SegmentPredicate::Both`]); whether such a composite is satisfiable is
//! decided later, approximately, by reachability.
//!
//! Union is an NFA splice: a fresh initial state with epsilons into the two
//! renumbered operands.

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashMap;

use super::simulate::dfa_step;
use super::state::{SegmentAutomaton, SegmentPredicate, StateId, Transition, CATCH_ALL_TAG};

/// Intersect two automata. Callers must determinize both inputs first;
/// non-deterministic inputs fall back to an all-pairs combiner that ignores
/// epsilon edges.
pub fn intersect_automata(a: &SegmentAutomaton, b: &SegmentAutomaton) -> SegmentAutomaton {
    let deterministic = a.deterministic && b.deterministic;

    let mut out = SegmentAutomaton::new();
    out.deterministic = deterministic;

    let mut interned: FxHashMap<(StateId, StateId), StateId> = FxHashMap::default();
    let mut worklist: VecDeque<(StateId, StateId)> = VecDeque::new();

    let initial = intern_pair(
        a,
        b,
        (a.initial, b.initial),
        &mut out,
        &mut interned,
        &mut worklist,
    );
    out.initial = initial;

    while let Some((sa, sb)) = worklist.pop_front() {
        let from = interned[&(sa, sb)];
        let combined = if deterministic {
            combine_deterministic(a, sa, b, sb)
        } else {
            combine_general(a, sa, b, sb)
        };
        for (transition, pair) in combined {
            let target = intern_pair(a, b, pair, &mut out, &mut interned, &mut worklist);
            out.add_transition(from, attach_target(transition, target));
        }
    }

    out
}

/// A combined transition before its pair target has been interned.
enum Combined {
    Literal(String),
    Wildcard(SegmentPredicate, String),
}

fn attach_target(combined: Combined, target: StateId) -> Transition {
    match combined {
        Combined::Literal(segment) => Transition::Literal { segment, target },
        Combined::Wildcard(matcher, source) => Transition::Wildcard {
            matcher,
            source,
            target,
        },
    }
}

fn intern_pair(
    a: &SegmentAutomaton,
    b: &SegmentAutomaton,
    pair: (StateId, StateId),
    out: &mut SegmentAutomaton,
    interned: &mut FxHashMap<(StateId, StateId), StateId>,
    worklist: &mut VecDeque<(StateId, StateId)>,
) -> StateId {
    if let Some(&existing) = interned.get(&pair) {
        return existing;
    }
    let id = out.alloc();
    if a[pair.0].accepting && b[pair.1].accepting {
        out.mark_accepting(id);
    }
    interned.insert(pair, id);
    worklist.push_back(pair);
    id
}

/// Combine one pair of complete-DFA states.
///
/// Transition order matters: literals, then wildcard∧wildcard composites,
/// then single-wildcard-over-catch-all, then the combined catch-all. The
/// deterministic matcher tries them in exactly that order.
fn combine_deterministic(
    a: &SegmentAutomaton,
    sa: StateId,
    b: &SegmentAutomaton,
    sb: StateId,
) -> Vec<(Combined, (StateId, StateId))> {
    let mut out = Vec::new();

    // Every literal listed on either side steps both sides effectively.
    let mut literals: BTreeSet<&str> = BTreeSet::new();
    for transition in a[sa].transitions.iter().chain(&b[sb].transitions) {
        if let Transition::Literal { segment, .. } = transition {
            literals.insert(segment);
        }
    }
    for literal in literals {
        if let (Some(ta), Some(tb)) = (dfa_step(a, sa, literal), dfa_step(b, sb, literal)) {
            out.push((Combined::Literal(literal.to_string()), (ta, tb)));
        }
    }

    let specific = |automaton: &SegmentAutomaton, s: StateId| {
        automaton[s]
            .transitions
            .iter()
            .filter_map(|t| match t {
                Transition::Wildcard {
                    matcher,
                    source,
                    target,
                } if source != CATCH_ALL_TAG => {
                    Some((matcher.clone(), source.clone(), *target))
                }
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    let catch_all = |automaton: &SegmentAutomaton, s: StateId| {
        automaton[s].transitions.iter().find_map(|t| match t {
            Transition::Wildcard { source, target, .. } if source == CATCH_ALL_TAG => {
                Some(*target)
            }
            _ => None,
        })
    };

    let a_wild = specific(a, sa);
    let b_wild = specific(b, sb);
    let a_catch = catch_all(a, sa);
    let b_catch = catch_all(b, sb);

    for (am, asrc, at) in &a_wild {
        for (bm, bsrc, bt) in &b_wild {
            out.push((
                Combined::Wildcard(
                    SegmentPredicate::Both(Box::new(am.clone()), Box::new(bm.clone())),
                    format!("({asrc})∩({bsrc})"),
                ),
                (*at, *bt),
            ));
        }
    }
    for (am, asrc, at) in &a_wild {
        if let Some(bc) = b_catch {
            out.push((Combined::Wildcard(am.clone(), asrc.clone()), (*at, bc)));
        }
    }
    for (bm, bsrc, bt) in &b_wild {
        if let Some(ac) = a_catch {
            out.push((Combined::Wildcard(bm.clone(), bsrc.clone()), (ac, *bt)));
        }
    }
    if let (Some(ac), Some(bc)) = (a_catch, b_catch) {
        out.push((
            Combined::Wildcard(SegmentPredicate::catch_all(), CATCH_ALL_TAG.to_string()),
            (ac, bc),
        ));
    }

    out
}

/// All-pairs combiner for inputs that were not determinized. Epsilon edges
/// (including globstar exits) are not combined.
fn combine_general(
    a: &SegmentAutomaton,
    sa: StateId,
    b: &SegmentAutomaton,
    sb: StateId,
) -> Vec<(Combined, (StateId, StateId))> {
    let mut out = Vec::new();

    for ta in &a[sa].transitions {
        for tb in &b[sb].transitions {
            match (ta, tb) {
                (
                    Transition::Literal { segment: s, target: t1 },
                    Transition::Literal { segment: u, target: t2 },
                ) if s == u => {
                    out.push((Combined::Literal(s.clone()), (*t1, *t2)));
                }
                (
                    Transition::Literal { segment, target },
                    Transition::Wildcard { matcher, target: wt, .. },
                ) if matcher.accepts(segment) => {
                    out.push((Combined::Literal(segment.clone()), (*target, *wt)));
                }
                (
                    Transition::Wildcard { matcher, target: wt, .. },
                    Transition::Literal { segment, target },
                ) if matcher.accepts(segment) => {
                    out.push((Combined::Literal(segment.clone()), (*wt, *target)));
                }
                (
                    Transition::Wildcard {
                        matcher: m1,
                        source: s1,
                        target: t1,
                    },
                    Transition::Wildcard {
                        matcher: m2,
                        source: s2,
                        target: t2,
                    },
                ) => {
                    out.push((
                        Combined::Wildcard(
                            SegmentPredicate::Both(Box::new(m1.clone()), Box::new(m2.clone())),
                            format!("({s1})∩({s2})"),
                        ),
                        (*t1, *t2),
                    ));
                }
                (
                    Transition::Globstar { self_loop: l1, .. },
                    Transition::Globstar { self_loop: l2, .. },
                ) => {
                    out.push((
                        Combined::Wildcard(
                            SegmentPredicate::any_segment(),
                            CATCH_ALL_TAG.to_string(),
                        ),
                        (*l1, *l2),
                    ));
                }
                (
                    Transition::Globstar { self_loop, .. },
                    Transition::Literal { segment, target },
                ) => {
                    out.push((Combined::Literal(segment.clone()), (*self_loop, *target)));
                }
                (
                    Transition::Literal { segment, target },
                    Transition::Globstar { self_loop, .. },
                ) => {
                    out.push((Combined::Literal(segment.clone()), (*target, *self_loop)));
                }
                (
                    Transition::Globstar { self_loop, .. },
                    Transition::Wildcard {
                        matcher,
                        source,
                        target,
                    },
                ) => {
                    out.push((
                        Combined::Wildcard(matcher.clone(), source.clone()),
                        (*self_loop, *target),
                    ));
                }
                (
                    Transition::Wildcard {
                        matcher,
                        source,
                        target,
                    },
                    Transition::Globstar { self_loop, .. },
                ) => {
                    out.push((
                        Combined::Wildcard(matcher.clone(), source.clone()),
                        (*target, *self_loop),
                    ));
                }
                _ => {}
            }
        }
    }

    out
}

/// NFA union: fresh initial state with epsilons into both renumbered
/// operands. The result is non-deterministic.
pub fn union_automata(a: &SegmentAutomaton, b: &SegmentAutomaton) -> SegmentAutomaton {
    let mut out = SegmentAutomaton::new();
    out.deterministic = false;

    let initial = out.alloc();
    out.initial = initial;

    let a_offset = out.len() as u32;
    splice(&mut out, a, a_offset);
    let b_offset = out.len() as u32;
    splice(&mut out, b, b_offset);

    out.add_transition(
        initial,
        Transition::Epsilon {
            target: StateId(a.initial.0 + a_offset),
        },
    );
    out.add_transition(
        initial,
        Transition::Epsilon {
            target: StateId(b.initial.0 + b_offset),
        },
    );

    out.recompute_accepting();
    out
}

/// Copy `source`'s states into `out`, shifting every state id by `offset`.
fn splice(out: &mut SegmentAutomaton, source: &SegmentAutomaton, offset: u32) {
    for state in &source.states {
        let id = out.alloc();
        out[id].accepting = state.accepting;
        out[id].transitions = state
            .transitions
            .iter()
            .map(|t| t.retarget(|s| StateId(s.0 + offset)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::builder::build_automaton;
    use crate::automaton::determinize::{determinize, DeterminizeOptions};
    use crate::automaton::simulate::automaton_matches;
    use crate::pattern::parse;

    fn dfa(source: &str) -> SegmentAutomaton {
        let (nfa, _) = build_automaton(&parse(source));
        determinize(&nfa, &DeterminizeOptions::default()).unwrap()
    }

    #[test]
    fn test_intersection_semantics() {
        let product = intersect_automata(&dfa("src/**"), &dfa("**/*.ts"));
        assert!(product.deterministic);
        assert!(automaton_matches(&product, &["src", "index.ts"]));
        assert!(automaton_matches(&product, &["src", "deep", "mod.ts"]));
        assert!(!automaton_matches(&product, &["src", "index.js"]));
        assert!(!automaton_matches(&product, &["lib", "index.ts"]));
    }

    #[test]
    fn test_intersection_of_literals() {
        let product = intersect_automata(&dfa("src/index.ts"), &dfa("src/*.ts"));
        assert!(automaton_matches(&product, &["src", "index.ts"]));
        assert!(!automaton_matches(&product, &["src", "other.ts"]));
    }

    #[test]
    fn test_disjoint_literal_intersection_is_dead() {
        let product = intersect_automata(&dfa("src/a"), &dfa("lib/b"));
        assert!(!automaton_matches(&product, &["src", "a"]));
        assert!(!automaton_matches(&product, &["lib", "b"]));
    }

    #[test]
    fn test_intersection_agrees_with_conjunction() {
        let patterns = [("src/**", "**/*.ts"), ("**/*.ts", "src/*.ts"), ("a/*", "*/b")];
        let samples: &[&[&str]] = &[
            &["src", "index.ts"],
            &["src", "a", "b.ts"],
            &["a", "b"],
            &["a", "c"],
            &["x"],
            &[],
        ];
        for (p, q) in patterns {
            let dp = dfa(p);
            let dq = dfa(q);
            let product = intersect_automata(&dp, &dq);
            for sample in samples {
                assert_eq!(
                    automaton_matches(&product, sample),
                    automaton_matches(&dp, sample) && automaton_matches(&dq, sample),
                    "({p}) ∩ ({q}) on {sample:?}"
                );
            }
        }
    }

    #[test]
    fn test_union_semantics() {
        let (a, _) = build_automaton(&parse("src/**"));
        let (b, _) = build_automaton(&parse("**/*.ts"));
        let union = union_automata(&a, &b);
        assert!(!union.deterministic);
        assert!(automaton_matches(&union, &["src", "anything"]));
        assert!(automaton_matches(&union, &["lib", "index.ts"]));
        assert!(!automaton_matches(&union, &["lib", "index.js"]));
    }

    #[test]
    fn test_union_preserves_accepting_count() {
        let (a, _) = build_automaton(&parse("a"));
        let (b, _) = build_automaton(&parse("b"));
        let union = union_automata(&a, &b);
        assert_eq!(union.accepting.len(), a.accepting.len() + b.accepting.len());
        assert_eq!(union.len(), a.len() + b.len() + 1);
    }
}
