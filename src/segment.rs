//! Per-segment matching and regex lowering.
//!
//! [`segment_matches`] tests one path segment string against one segment
//! node. Wildcard and composite segments use greedy matching with
//! backtracking: a `*` tries every consumption length, `?` and character
//! classes consume exactly one character.
//!
//! [`to_regex`] lowers a segment node to an anchored regex source string.
//! Literals lower to `None` so callers keep the fast equality path; globstar
//! lowers to the universal regex.
//!
//! [`matches_direct`] walks the pattern AST against a path without building
//! an automaton. It always agrees with the compiled matcher; the compiled
//! path just amortizes better over repeated matches.

use crate::pattern::{CharClass, PathPattern, RootNode, Segment, WildcardPart};
use crate::paths::split_segments;

/// Test a segment string against a segment node.
pub fn segment_matches(text: &str, segment: &Segment) -> bool {
    match segment {
        Segment::Literal(lit) => lit == text,
        // "Any one segment" semantics during automaton construction.
        Segment::Globstar => true,
        Segment::CharClass(class) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => class.contains(c),
                _ => false,
            }
        }
        Segment::Wildcard(parts) | Segment::Composite(parts) => {
            let chars: Vec<char> = text.chars().collect();
            match_parts(parts, &chars)
        }
    }
}

/// Backtracking part matcher. `*` tries each split point; everything else
/// consumes a fixed number of characters.
fn match_parts(parts: &[WildcardPart], text: &[char]) -> bool {
    let Some((part, rest)) = parts.split_first() else {
        return text.is_empty();
    };

    match part {
        WildcardPart::Literal(lit) => {
            let lit_chars: Vec<char> = lit.chars().collect();
            if text.len() < lit_chars.len() || text[..lit_chars.len()] != lit_chars[..] {
                return false;
            }
            match_parts(rest, &text[lit_chars.len()..])
        }
        WildcardPart::Question => !text.is_empty() && match_parts(rest, &text[1..]),
        WildcardPart::Class(class) => {
            !text.is_empty() && class.contains(text[0]) && match_parts(rest, &text[1..])
        }
        WildcardPart::Star => (0..=text.len()).any(|k| match_parts(rest, &text[k..])),
    }
}

/// Match a normalized absolute path directly against a pattern AST.
///
/// Negation applies as the usual outer flip.
pub fn matches_direct(path: &str, pattern: &PathPattern) -> bool {
    let segments = split_segments(path);
    let matched = node_matches(&pattern.root, &segments);
    if pattern.is_negation {
        !matched
    } else {
        matched
    }
}

fn node_matches(node: &RootNode, segments: &[&str]) -> bool {
    match node {
        RootNode::Sequence(pattern_segments) => {
            // Memoized on (pattern position, path position): globstars make
            // the naive recursion quadratic in the worst case.
            let mut memo = vec![vec![None; segments.len() + 1]; pattern_segments.len() + 1];
            sequence_matches(pattern_segments, 0, segments, 0, &mut memo)
        }
        RootNode::Alternation(branches) => {
            branches.iter().any(|branch| node_matches(branch, segments))
        }
    }
}

fn sequence_matches(
    pattern_segments: &[Segment],
    pi: usize,
    segments: &[&str],
    si: usize,
    memo: &mut [Vec<Option<bool>>],
) -> bool {
    if let Some(cached) = memo[pi][si] {
        return cached;
    }

    let result = match pattern_segments.get(pi) {
        None => si == segments.len(),
        Some(Segment::Globstar) => {
            // Zero segments consumed, or one more and stay on the globstar.
            sequence_matches(pattern_segments, pi + 1, segments, si, memo)
                || (si < segments.len()
                    && sequence_matches(pattern_segments, pi, segments, si + 1, memo))
        }
        Some(segment) => {
            si < segments.len()
                && segment_matches(segments[si], segment)
                && sequence_matches(pattern_segments, pi + 1, segments, si + 1, memo)
        }
    };

    memo[pi][si] = Some(result);
    result
}

/// Lower a segment node to an anchored regex source, or `None` for literals
/// (which use direct equality instead).
pub fn to_regex(segment: &Segment) -> Option<String> {
    match segment {
        Segment::Literal(_) => None,
        Segment::Globstar => Some("^.*$".to_string()),
        Segment::CharClass(class) => Some(format!("^{}$", class_regex(class))),
        Segment::Wildcard(parts) | Segment::Composite(parts) => {
            let mut out = String::from("^");
            for part in parts {
                match part {
                    WildcardPart::Literal(lit) => {
                        for c in lit.chars() {
                            push_escaped(&mut out, c);
                        }
                    }
                    WildcardPart::Star => out.push_str(".*"),
                    WildcardPart::Question => out.push('.'),
                    WildcardPart::Class(class) => out.push_str(&class_regex(class)),
                }
            }
            out.push('$');
            Some(out)
        }
    }
}

/// Emit a `[...]` class. `^`, `-`, `]` and `\` must be escaped inside the
/// emitted class body.
fn class_regex(class: &CharClass) -> String {
    let mut out = String::from("[");
    if class.negated {
        out.push('^');
    }
    for range in &class.ranges {
        push_class_escaped(&mut out, range.start);
        out.push('-');
        push_class_escaped(&mut out, range.end);
    }
    for c in class.chars.chars() {
        push_class_escaped(&mut out, c);
    }
    out.push(']');
    out
}

fn push_class_escaped(out: &mut String, c: char) {
    if matches!(c, '^' | '-' | ']' | '\\') {
        out.push('\\');
    }
    out.push(c);
}

fn push_escaped(out: &mut String, c: char) {
    if matches!(
        c,
        '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    ) {
        out.push('\\');
    }
    out.push(c);
}
