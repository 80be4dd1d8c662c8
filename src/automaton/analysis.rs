//! Emptiness, witness search and bounded path counting.
//!
//! Emptiness is forward reachability over the state graph. This is an
//! over-approximation for automata produced by intersection: a reachable
//! accepting state may sit behind a composite wildcard predicate that no
//! actual segment satisfies. Witness search compensates by verifying every
//! synthesized segment against the real predicate before using it.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use super::state::{SegmentAutomaton, SegmentPredicate, StateId, Transition};

/// Sample tokens tried when a wildcard segment has to be materialized and
/// the tag-derived guess fails.
const SAMPLE_TOKENS: &[&str] = &[
    "file.ts", "file.js", "index.ts", "test.ts", "file", "dir", "src", "match1", "a",
];

/// True when no accepting state is reachable from the initial state.
pub fn is_empty(automaton: &SegmentAutomaton) -> bool {
    let reachable = reachable_states(automaton);
    !automaton
        .accepting
        .iter()
        .any(|id| reachable.contains(id))
}

/// Forward reachability, following every transition target (both faces of a
/// globstar included).
pub(crate) fn reachable_states(automaton: &SegmentAutomaton) -> FxHashSet<StateId> {
    let mut seen = FxHashSet::default();
    if automaton.is_empty() {
        return seen;
    }
    let mut stack = vec![automaton.initial];
    seen.insert(automaton.initial);

    while let Some(state) = stack.pop() {
        for transition in &automaton[state].transitions {
            let targets: [Option<StateId>; 2] = match transition {
                Transition::Literal { target, .. }
                | Transition::Wildcard { target, .. }
                | Transition::Epsilon { target } => [Some(*target), None],
                Transition::Globstar { self_loop, exit } => [Some(*self_loop), Some(*exit)],
            };
            for target in targets.into_iter().flatten() {
                if seen.insert(target) {
                    stack.push(target);
                }
            }
        }
    }
    seen
}

/// Find a path accepted by the automaton, or `None` when no accepting state
/// is reachable (or every route runs through an unsatisfiable wildcard).
///
/// BFS over `(state, accumulated segments)`. Literals append themselves;
/// wildcard segments are synthesized from the source tag and a small token
/// dictionary, and only used when the actual predicate accepts them;
/// a globstar contributes both its zero-consume exit and a one-consume
/// self-loop step with a generic token.
pub fn find_witness(automaton: &SegmentAutomaton) -> Option<String> {
    if automaton.is_empty() {
        return None;
    }

    let mut visited: FxHashSet<StateId> = FxHashSet::default();
    let mut queue: VecDeque<(StateId, Vec<String>)> = VecDeque::new();
    visited.insert(automaton.initial);
    queue.push_back((automaton.initial, Vec::new()));

    while let Some((state, segments)) = queue.pop_front() {
        if automaton[state].accepting {
            return Some(render_path(&segments));
        }

        for transition in &automaton[state].transitions {
            match transition {
                Transition::Literal { segment, target } => {
                    if visited.insert(*target) {
                        let mut next = segments.clone();
                        next.push(segment.clone());
                        queue.push_back((*target, next));
                    }
                }
                Transition::Wildcard {
                    matcher,
                    source,
                    target,
                } => {
                    if !visited.contains(target) {
                        if let Some(sample) = synthesize_segment(source, matcher) {
                            visited.insert(*target);
                            let mut next = segments.clone();
                            next.push(sample);
                            queue.push_back((*target, next));
                        }
                    }
                }
                Transition::Globstar { self_loop, exit } => {
                    if visited.insert(*exit) {
                        queue.push_back((*exit, segments.clone()));
                    }
                    if visited.insert(*self_loop) {
                        let mut next = segments.clone();
                        next.push("dir".to_string());
                        queue.push_back((*self_loop, next));
                    }
                }
                Transition::Epsilon { target } => {
                    if visited.insert(*target) {
                        queue.push_back((*target, segments.clone()));
                    }
                }
            }
        }
    }

    None
}

fn render_path(segments: &[String]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Produce a concrete segment satisfying `matcher`, guided by its source
/// tag. Best-effort: a tag-derived guess first, then the dictionary. Every
/// candidate is verified against the predicate before being returned.
fn synthesize_segment(tag: &str, matcher: &SegmentPredicate) -> Option<String> {
    let derived = derive_from_tag(tag);
    std::iter::once(derived)
        .chain(SAMPLE_TOKENS.iter().map(|t| t.to_string()))
        .find(|candidate| !candidate.is_empty() && matcher.accepts(candidate))
}

/// Turn a wildcard source tag into a plausible segment: stars become a
/// token, `?` a letter, a class its first member. Composite algebra tags
/// degrade to garbage here, which the dictionary fallback absorbs.
fn derive_from_tag(tag: &str) -> String {
    let mut out = String::new();
    let mut chars = tag.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("file"),
            '?' => out.push('x'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' => {
                let mut member = None;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    if member.is_none() && inner != '!' && inner != '^' {
                        member = Some(inner);
                    }
                }
                if let Some(m) = member {
                    out.push(m);
                }
            }
            '(' | ')' => {}
            c => out.push(c),
        }
    }
    out
}

/// Count accepting configurations per depth, up to `max_depth` segments.
///
/// Memoized on `(state, remaining)`. Depths with a zero count are omitted
/// from the result.
pub fn count_paths(automaton: &SegmentAutomaton, max_depth: usize) -> FxHashMap<usize, u64> {
    let mut memo: FxHashMap<(StateId, usize), u64> = FxHashMap::default();
    let mut in_progress: FxHashSet<(StateId, usize)> = FxHashSet::default();
    let mut result = FxHashMap::default();

    if automaton.is_empty() {
        return result;
    }

    for depth in 0..=max_depth {
        let count = count_from(
            automaton,
            automaton.initial,
            depth,
            &mut memo,
            &mut in_progress,
        );
        if count > 0 {
            result.insert(depth, count);
        }
    }
    result
}

fn count_from(
    automaton: &SegmentAutomaton,
    state: StateId,
    remaining: usize,
    memo: &mut FxHashMap<(StateId, usize), u64>,
    in_progress: &mut FxHashSet<(StateId, usize)>,
) -> u64 {
    if let Some(&cached) = memo.get(&(state, remaining)) {
        return cached;
    }
    // Guard against epsilon cycles; our constructions do not create them,
    // but a revisit must not recurse forever.
    if !in_progress.insert((state, remaining)) {
        return 0;
    }

    let mut total: u64 = if remaining == 0 && automaton[state].accepting {
        1
    } else {
        0
    };

    for transition in &automaton[state].transitions {
        let add = match transition {
            Transition::Epsilon { target } => {
                count_from(automaton, *target, remaining, memo, in_progress)
            }
            Transition::Globstar { self_loop, exit } => {
                let mut sum = count_from(automaton, *exit, remaining, memo, in_progress);
                if remaining > 0 {
                    sum = sum.saturating_add(count_from(
                        automaton,
                        *self_loop,
                        remaining - 1,
                        memo,
                        in_progress,
                    ));
                }
                sum
            }
            Transition::Literal { target, .. } | Transition::Wildcard { target, .. } => {
                if remaining > 0 {
                    count_from(automaton, *target, remaining - 1, memo, in_progress)
                } else {
                    0
                }
            }
        };
        total = total.saturating_add(add);
    }

    in_progress.remove(&(state, remaining));
    memo.insert((state, remaining), total);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::builder::build_automaton;
    use crate::automaton::determinize::{determinize, DeterminizeOptions};
    use crate::automaton::product::intersect_automata;
    use crate::automaton::simulate::automaton_matches;
    use crate::paths::split_segments;
    use crate::pattern::parse;

    fn nfa(source: &str) -> SegmentAutomaton {
        build_automaton(&parse(source)).0
    }

    #[test]
    fn test_fresh_automata_are_nonempty() {
        assert!(!is_empty(&nfa("src/**/*.ts")));
        assert!(!is_empty(&nfa("")));
    }

    #[test]
    fn test_dead_intersection_is_empty() {
        let a = determinize(&nfa("src/a"), &DeterminizeOptions::default()).unwrap();
        let b = determinize(&nfa("lib/b"), &DeterminizeOptions::default()).unwrap();
        let product = intersect_automata(&a, &b);
        assert!(is_empty(&product));
        assert_eq!(find_witness(&product), None);
    }

    #[test]
    fn test_witness_is_accepted_by_automaton() {
        for pattern in ["src/index.ts", "src/**/*.ts", "**", "{a,b}/[0-9]", "*.ts"] {
            let automaton = nfa(pattern);
            let witness = find_witness(&automaton)
                .unwrap_or_else(|| panic!("no witness for {pattern}"));
            let segments = split_segments(&witness);
            assert!(
                automaton_matches(&automaton, &segments),
                "witness {witness} rejected by {pattern}"
            );
        }
    }

    #[test]
    fn test_witness_for_empty_pattern_is_root() {
        assert_eq!(find_witness(&nfa("")), Some("/".to_string()));
    }

    #[test]
    fn test_witness_verified_against_composite() {
        // (*.ts) ∩ (*.js) is structurally reachable but unsatisfiable; the
        // synthesizer must not fabricate a segment for it.
        let a = determinize(&nfa("*.ts"), &DeterminizeOptions::default()).unwrap();
        let b = determinize(&nfa("*.js"), &DeterminizeOptions::default()).unwrap();
        let product = intersect_automata(&a, &b);
        assert_eq!(find_witness(&product), None);
        // ...even though plain reachability says non-empty.
        assert!(!is_empty(&product));
    }

    #[test]
    fn test_count_paths_literal() {
        let counts = count_paths(&nfa("src/index.ts"), 4);
        assert_eq!(counts.get(&2), Some(&1));
        assert_eq!(counts.get(&1), None);
        assert_eq!(counts.get(&3), None);
    }

    #[test]
    fn test_count_paths_alternation() {
        let counts = count_paths(&nfa("{a,b,c}/x"), 3);
        assert_eq!(counts.get(&2), Some(&3));
    }

    #[test]
    fn test_count_paths_globstar_growth() {
        let counts = count_paths(&nfa("src/**"), 3);
        // Depth 1: /src. Depth 2: /src/<any>. Depth 3: /src/<any>/<any>.
        assert_eq!(counts.get(&1), Some(&1));
        assert_eq!(counts.get(&2), Some(&1));
        assert_eq!(counts.get(&3), Some(&1));
        assert_eq!(counts.get(&0), None);
    }
}
