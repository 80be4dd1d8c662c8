//! Pattern tokenizer and recursive-descent parser.
//!
//! Parsing is total: every source string yields a [`PathPattern`]. Malformed
//! constructs degrade to a best-effort node and record a [`ParseIssue`] with
//! a stable code, so validation stays a caller-side decision.
//!
//! Pattern-level prefixes are handled here: a leading `!` marks negation, a
//! leading `/` or `~` marks the pattern as absolute. Brace groups are expanded
//! before segment parsing, so alternation branches are always plain sequences.

use super::brace;
use super::{
    CharClass, CharRange, IssueCode, ParseIssue, PathPattern, RootNode, Segment, WildcardPart,
};

/// Parse a pattern source string.
pub fn parse(source: &str) -> PathPattern {
    let mut issues = Vec::new();

    let mut rest = source;
    let is_negation = rest.starts_with('!');
    if is_negation {
        rest = &rest[1..];
    }
    let is_absolute = rest.starts_with('/') || rest.starts_with('~');
    if rest.starts_with('~') {
        rest = &rest[1..];
    }
    if rest.starts_with('/') {
        rest = &rest[1..];
    }
    let prefix_len = source.len() - rest.len();

    let branches = match brace::expand(rest) {
        Ok(expansion) => {
            for mut issue in expansion.issues {
                if let Some(pos) = issue.position.as_mut() {
                    *pos += prefix_len;
                }
                issues.push(issue);
            }
            expansion.branches
        }
        Err(limit) => {
            issues.push(ParseIssue::new(IssueCode::ExpansionLimit, limit.to_string()));
            vec![rest.to_string()]
        }
    };

    // Offsets only map back to the source when no expansion rewrote the text.
    let exact_offsets = branches.len() == 1 && branches[0] == rest;

    let mut sequences = Vec::with_capacity(branches.len());
    for branch in &branches {
        let mut segments = Vec::new();
        for (offset, raw) in split_with_offsets(branch) {
            let base = if exact_offsets {
                Some(prefix_len + offset)
            } else {
                None
            };
            segments.push(parse_segment(raw, base, &mut issues));
        }
        sequences.push(RootNode::Sequence(segments));
    }

    let root = if sequences.len() == 1 {
        sequences.pop().unwrap()
    } else {
        RootNode::Alternation(sequences)
    };

    PathPattern {
        source: source.to_string(),
        root,
        is_absolute,
        is_negation,
        issues,
    }
}

/// Split a branch on `/`, dropping empty segments, keeping byte offsets.
fn split_with_offsets(branch: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in branch.char_indices() {
        if ch == '/' {
            if idx > start {
                out.push((start, &branch[start..idx]));
            }
            start = idx + 1;
        }
    }
    if branch.len() > start {
        out.push((start, &branch[start..]));
    }
    out
}

/// Parse one path segment into its AST node.
fn parse_segment(raw: &str, base: Option<usize>, issues: &mut Vec<ParseIssue>) -> Segment {
    if raw == "**" {
        return Segment::Globstar;
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut parts: Vec<WildcardPart> = Vec::new();
    let mut literal = String::new();
    let mut idx = 0;

    let at = |issues: &mut Vec<ParseIssue>, code, message: &str, pos: usize, len: usize| {
        match base {
            Some(b) => issues.push(ParseIssue::at(code, message, b + pos, len)),
            None => issues.push(ParseIssue::new(code, message)),
        }
    };

    while idx < chars.len() {
        match chars[idx] {
            '\\' => {
                if idx + 1 < chars.len() {
                    literal.push(chars[idx + 1]);
                    idx += 2;
                } else {
                    at(
                        issues,
                        IssueCode::InvalidEscape,
                        "dangling escape at end of segment",
                        idx,
                        1,
                    );
                    literal.push('\\');
                    idx += 1;
                }
            }
            '*' => {
                let run_start = idx;
                while idx < chars.len() && chars[idx] == '*' {
                    idx += 1;
                }
                if idx - run_start > 1 {
                    at(
                        issues,
                        IssueCode::InvalidGlobstar,
                        "`**` must be a whole segment",
                        run_start,
                        idx - run_start,
                    );
                }
                flush_literal(&mut parts, &mut literal);
                parts.push(WildcardPart::Star);
            }
            '?' => {
                flush_literal(&mut parts, &mut literal);
                parts.push(WildcardPart::Question);
                idx += 1;
            }
            '[' => match parse_class(&chars, idx) {
                ClassParse::Ok {
                    class,
                    next,
                    reversed_range,
                } => {
                    if let Some(pos) = reversed_range {
                        at(
                            issues,
                            IssueCode::InvalidRange,
                            "character range is reversed",
                            pos,
                            3,
                        );
                    }
                    if class.is_empty() {
                        at(
                            issues,
                            IssueCode::EmptyCharClass,
                            "character class is empty",
                            idx,
                            next - idx,
                        );
                    }
                    flush_literal(&mut parts, &mut literal);
                    parts.push(WildcardPart::Class(class));
                    idx = next;
                }
                ClassParse::Unclosed => {
                    at(
                        issues,
                        IssueCode::UnclosedBracket,
                        "unclosed character class",
                        idx,
                        chars.len() - idx,
                    );
                    literal.push('[');
                    idx += 1;
                }
            },
            '(' | ')' | '|' => {
                at(
                    issues,
                    IssueCode::BannedFeature,
                    "extended glob syntax is not supported",
                    idx,
                    1,
                );
                literal.push(chars[idx]);
                idx += 1;
            }
            c => {
                literal.push(c);
                idx += 1;
            }
        }
    }
    flush_literal(&mut parts, &mut literal);

    classify(parts)
}

fn flush_literal(parts: &mut Vec<WildcardPart>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(WildcardPart::Literal(std::mem::take(literal)));
    }
}

/// Pick the segment variant from its parsed parts.
fn classify(parts: Vec<WildcardPart>) -> Segment {
    let has_class = parts.iter().any(|p| matches!(p, WildcardPart::Class(_)));
    let has_wild = parts
        .iter()
        .any(|p| matches!(p, WildcardPart::Star | WildcardPart::Question));

    match (&parts[..], has_class, has_wild) {
        ([], _, _) => Segment::Literal(String::new()),
        ([WildcardPart::Literal(s)], _, _) => Segment::Literal(s.clone()),
        ([WildcardPart::Class(c)], _, _) => Segment::CharClass(c.clone()),
        (_, true, _) => Segment::Composite(parts),
        (_, false, true) => Segment::Wildcard(parts),
        _ => {
            // Adjacent literal runs only; merge them.
            let merged: String = parts
                .iter()
                .filter_map(|p| match p {
                    WildcardPart::Literal(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            Segment::Literal(merged)
        }
    }
}

enum ClassParse {
    Ok {
        class: CharClass,
        next: usize,
        /// Char index of the first reversed range, if one was dropped.
        reversed_range: Option<usize>,
    },
    Unclosed,
}

/// Parse a `[...]` class starting at the `[` in `chars[open]`.
///
/// Grammar notes: `!` or `^` directly after `[` negates; `]` is literal when
/// it is the first class member; `-` is literal at the end; `\` escapes the
/// next character.
fn parse_class(chars: &[char], open: usize) -> ClassParse {
    let mut class = CharClass::default();
    let mut idx = open + 1;
    let mut first = true;
    let mut reversed_range = None;

    if idx < chars.len() && (chars[idx] == '!' || chars[idx] == '^') {
        class.negated = true;
        idx += 1;
    }

    while idx < chars.len() {
        let c = chars[idx];
        if c == ']' && !first {
            return ClassParse::Ok {
                class,
                next: idx + 1,
                reversed_range,
            };
        }
        first = false;

        let member = if c == '\\' && idx + 1 < chars.len() {
            idx += 1;
            chars[idx]
        } else {
            c
        };

        // Range form: member '-' end, unless the '-' closes the class.
        if idx + 2 < chars.len() && chars[idx + 1] == '-' && chars[idx + 2] != ']' {
            let mut end_idx = idx + 2;
            let end = if chars[end_idx] == '\\' && end_idx + 1 < chars.len() {
                end_idx += 1;
                chars[end_idx]
            } else {
                chars[end_idx]
            };
            if member <= end {
                class.ranges.push(CharRange { start: member, end });
            } else if reversed_range.is_none() {
                reversed_range = Some(idx);
            }
            idx = end_idx + 1;
        } else {
            class.chars.push(member);
            idx += 1;
        }
    }

    ClassParse::Unclosed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(p: &PathPattern) -> &[Segment] {
        match &p.root {
            RootNode::Sequence(s) => s,
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_literal_path() {
        let p = parse("src/index.ts");
        assert!(p.is_valid());
        assert!(!p.is_absolute);
        assert_eq!(
            seq(&p),
            &[
                Segment::Literal("src".into()),
                Segment::Literal("index.ts".into())
            ]
        );
    }

    #[test]
    fn test_parse_flags() {
        let p = parse("!/src/*.ts");
        assert!(p.is_negation);
        assert!(p.is_absolute);

        let p = parse("~/docs");
        assert!(p.is_absolute);
        assert_eq!(seq(&p), &[Segment::Literal("docs".into())]);
    }

    #[test]
    fn test_parse_empty_and_tilde() {
        let p = parse("");
        assert_eq!(seq(&p), &[] as &[Segment]);

        let p = parse("~");
        assert!(p.is_absolute);
        assert_eq!(seq(&p), &[] as &[Segment]);
    }

    #[test]
    fn test_parse_globstar_segment() {
        let p = parse("src/**/*.ts");
        let segs = seq(&p);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[1], Segment::Globstar);
        assert_eq!(
            segs[2],
            Segment::Wildcard(vec![
                WildcardPart::Star,
                WildcardPart::Literal(".ts".into())
            ])
        );
    }

    #[test]
    fn test_embedded_globstar_is_invalid() {
        let p = parse("src/a**b");
        assert_eq!(p.issues.len(), 1);
        assert_eq!(p.issues[0].code, IssueCode::InvalidGlobstar);
        // Degrades to a single star.
        assert_eq!(
            seq(&p)[1],
            Segment::Wildcard(vec![
                WildcardPart::Literal("a".into()),
                WildcardPart::Star,
                WildcardPart::Literal("b".into())
            ])
        );
    }

    #[test]
    fn test_parse_char_class() {
        let p = parse("file[0-9a-f].ts");
        assert!(p.is_valid());
        match &seq(&p)[0] {
            Segment::Composite(parts) => {
                assert_eq!(parts[0], WildcardPart::Literal("file".into()));
                match &parts[1] {
                    WildcardPart::Class(c) => {
                        assert!(!c.negated);
                        assert_eq!(
                            c.ranges,
                            vec![
                                CharRange { start: '0', end: '9' },
                                CharRange { start: 'a', end: 'f' }
                            ]
                        );
                    }
                    other => panic!("expected class, got {other:?}"),
                }
                assert_eq!(parts[2], WildcardPart::Literal(".ts".into()));
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_lone_class_segment() {
        let p = parse("src/[abc]");
        match &seq(&p)[1] {
            Segment::CharClass(c) => assert_eq!(c.chars, "abc"),
            other => panic!("expected char class, got {other:?}"),
        }
    }

    #[test]
    fn test_class_negation_and_literal_bracket() {
        let p = parse("[!a-z]");
        match &p.root {
            RootNode::Sequence(segs) => match &segs[0] {
                Segment::CharClass(c) => assert!(c.negated),
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }

        // `]` first is a literal member.
        let p = parse("[]x]");
        match &seq(&p)[0] {
            Segment::CharClass(c) => assert_eq!(c.chars, "]x"),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_dash_at_end_is_literal() {
        let p = parse("[a-]");
        match &seq(&p)[0] {
            Segment::CharClass(c) => {
                assert!(c.ranges.is_empty());
                assert_eq!(c.chars, "a-");
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_reversed_range_is_error() {
        let p = parse("[z-a]");
        assert_eq!(p.issues[0].code, IssueCode::InvalidRange);
        // Dropping the reversed range left the class empty, which is
        // reported as well.
        assert_eq!(p.issues[1].code, IssueCode::EmptyCharClass);
    }

    #[test]
    fn test_unclosed_bracket_degrades() {
        let p = parse("src/[abc");
        assert_eq!(p.issues[0].code, IssueCode::UnclosedBracket);
        assert_eq!(seq(&p)[1], Segment::Literal("[abc".into()));
    }

    #[test]
    fn test_banned_extglob() {
        let p = parse("@(a|b)");
        assert!(p
            .issues
            .iter()
            .all(|i| i.code == IssueCode::BannedFeature));
        assert!(!p.issues.is_empty());
    }

    #[test]
    fn test_escape_produces_literal() {
        let p = parse(r"src/\*.ts");
        assert!(p.is_valid());
        assert_eq!(seq(&p)[1], Segment::Literal("*.ts".into()));
    }

    #[test]
    fn test_brace_expansion_to_alternation() {
        let p = parse("src/{a,b}.ts");
        match &p.root {
            RootNode::Alternation(branches) => {
                assert_eq!(branches.len(), 2);
                assert_eq!(
                    branches[0],
                    RootNode::Sequence(vec![
                        Segment::Literal("src".into()),
                        Segment::Literal("a.ts".into())
                    ])
                );
            }
            other => panic!("expected alternation, got {other:?}"),
        }
    }

    #[test]
    fn test_issue_positions_map_to_source() {
        let p = parse("!/src/[z-a].ts");
        let issue = &p.issues[0];
        assert_eq!(issue.code, IssueCode::InvalidRange);
        // Position of `z` in the original source.
        assert_eq!(issue.position, Some(7));
    }

    #[test]
    fn test_duplicate_slashes_dropped() {
        let p = parse("src//lib");
        assert_eq!(
            seq(&p),
            &[
                Segment::Literal("src".into()),
                Segment::Literal("lib".into())
            ]
        );
    }
}
