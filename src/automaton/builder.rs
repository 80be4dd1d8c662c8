//! NFA construction from pattern ASTs.
//!
//! Thompson-style construction over the segment alphabet: one start state,
//! one accepting state, an intermediate state between consecutive segments,
//! and fresh epsilon-wired start/accept pairs per alternation branch. A
//! globstar becomes a single [`Transition::Globstar`] whose self-loop points
//! back at its origin state (consume one segment, stay) and whose exit edge
//! is epsilon-like (match zero segments).

use crate::pattern::{IssueCode, ParseIssue, PathPattern, RootNode, Segment};
use crate::segment::to_regex;

use super::state::{SegmentAutomaton, SegmentPredicate, StateId, Transition};

/// Cap on the length of a lowered per-segment regex; longer sources surface
/// `UNSAFE_REGEX` and the node degrades to match-nothing.
const MAX_SEGMENT_REGEX_LEN: usize = 1000;

/// Build the (non-deterministic) segment automaton for a parsed pattern.
///
/// Lowering failures do not abort construction; they come back as issues and
/// the offending segment contributes a never-matching transition.
pub fn build_automaton(pattern: &PathPattern) -> (SegmentAutomaton, Vec<ParseIssue>) {
    let mut automaton = SegmentAutomaton::new();
    let mut issues = Vec::new();

    let start = automaton.alloc();
    let accept = automaton.alloc();
    build_node(&mut automaton, &pattern.root, start, accept, &mut issues);

    automaton.initial = start;
    automaton.mark_accepting(accept);
    (automaton, issues)
}

fn build_node(
    automaton: &mut SegmentAutomaton,
    node: &RootNode,
    start: StateId,
    accept: StateId,
    issues: &mut Vec<ParseIssue>,
) {
    match node {
        RootNode::Sequence(segments) if segments.is_empty() => {
            automaton.add_transition(start, Transition::Epsilon { target: accept });
        }
        RootNode::Sequence(segments) => {
            let mut current = start;
            for (idx, segment) in segments.iter().enumerate() {
                let next = if idx + 1 == segments.len() {
                    accept
                } else {
                    automaton.alloc()
                };
                emit_segment(automaton, segment, current, next, issues);
                current = next;
            }
        }
        RootNode::Alternation(branches) => {
            for branch in branches {
                let branch_start = automaton.alloc();
                let branch_accept = automaton.alloc();
                automaton.add_transition(
                    start,
                    Transition::Epsilon {
                        target: branch_start,
                    },
                );
                build_node(automaton, branch, branch_start, branch_accept, issues);
                automaton.add_transition(
                    branch_accept,
                    Transition::Epsilon { target: accept },
                );
            }
        }
    }
}

/// Emit the transition(s) for one segment between `from` and `to`.
fn emit_segment(
    automaton: &mut SegmentAutomaton,
    segment: &Segment,
    from: StateId,
    to: StateId,
    issues: &mut Vec<ParseIssue>,
) {
    match segment {
        Segment::Literal(lit) => {
            automaton.add_transition(
                from,
                Transition::Literal {
                    segment: lit.clone(),
                    target: to,
                },
            );
        }
        Segment::Globstar => {
            automaton.add_transition(
                from,
                Transition::Globstar {
                    self_loop: from,
                    exit: to,
                },
            );
        }
        Segment::Wildcard(_) | Segment::CharClass(_) | Segment::Composite(_) => {
            let matcher = lower_segment(segment, issues);
            automaton.add_transition(
                from,
                Transition::Wildcard {
                    matcher,
                    source: segment.source_text(),
                    target: to,
                },
            );
        }
    }
}

/// Lower a non-literal segment to its predicate.
fn lower_segment(segment: &Segment, issues: &mut Vec<ParseIssue>) -> SegmentPredicate {
    let source = match to_regex(segment) {
        Some(source) => source,
        None => unreachable!("literal segments take the equality path"),
    };

    if source.len() > MAX_SEGMENT_REGEX_LEN {
        issues.push(ParseIssue::new(
            IssueCode::UnsafeRegex,
            format!(
                "lowered segment regex is {} bytes (cap {})",
                source.len(),
                MAX_SEGMENT_REGEX_LEN
            ),
        ));
        return SegmentPredicate::never();
    }

    match SegmentPredicate::from_source(&source) {
        Ok(predicate) => predicate,
        Err(err) => {
            issues.push(ParseIssue::new(
                IssueCode::InvalidRegex,
                format!("segment regex failed to compile: {err}"),
            ));
            SegmentPredicate::never()
        }
    }
}

/// Compute the (min, max) segment-count bounds of a pattern. `max` is `None`
/// when any branch contains a globstar.
pub fn segment_bounds(pattern: &PathPattern) -> (usize, Option<usize>) {
    node_bounds(&pattern.root)
}

fn node_bounds(node: &RootNode) -> (usize, Option<usize>) {
    match node {
        RootNode::Sequence(segments) => {
            let min = segments
                .iter()
                .filter(|s| !matches!(s, Segment::Globstar))
                .count();
            let max = if segments.iter().any(|s| matches!(s, Segment::Globstar)) {
                None
            } else {
                Some(segments.len())
            };
            (min, max)
        }
        RootNode::Alternation(branches) => {
            let mut min = usize::MAX;
            let mut max = Some(0usize);
            for branch in branches {
                let (bmin, bmax) = node_bounds(branch);
                min = min.min(bmin);
                max = match (max, bmax) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
            }
            if branches.is_empty() {
                (0, Some(0))
            } else {
                (min, max)
            }
        }
    }
}
