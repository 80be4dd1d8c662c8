//! Brace alternation and numeric-range expansion.
//!
//! `{a,b,c}` expands to one branch per alternative; `{m..n}` expands to the
//! integer sequence between `m` and `n` (ascending or descending). Nesting is
//! not supported. Two caps bound the work: a total-expansion cap and a
//! numeric-range element cap, both configurable per call.

use crate::pattern::{IssueCode, ParseIssue};
use crate::LimitError;

/// Default cap on the total number of expanded branches.
pub const DEFAULT_MAX_EXPANSIONS: usize = 100;
/// Default cap on the number of elements a `{m..n}` range may produce.
pub const DEFAULT_MAX_RANGE: usize = 50;

/// Per-call expansion limits.
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    pub max_expansions: usize,
    pub max_range: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            max_range: DEFAULT_MAX_RANGE,
        }
    }
}

/// Result of a brace expansion: the expanded branches plus any diagnostics.
///
/// Malformed braces (unclosed, nested) degrade to the literal text and leave
/// an issue; only the expansion caps are hard errors.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub branches: Vec<String>,
    pub issues: Vec<ParseIssue>,
}

/// Expand with default limits.
pub fn expand(input: &str) -> Result<Expansion, LimitError> {
    expand_with(input, &ExpandOptions::default())
}

/// Expand all brace groups in `input`, left to right.
pub fn expand_with(input: &str, opts: &ExpandOptions) -> Result<Expansion, LimitError> {
    let mut issues = Vec::new();
    let branches = expand_inner(input, opts, &mut issues)?;
    Ok(Expansion { branches, issues })
}

fn expand_inner(
    input: &str,
    opts: &ExpandOptions,
    issues: &mut Vec<ParseIssue>,
) -> Result<Vec<String>, LimitError> {
    let Some(open) = find_unescaped(input, 0, '{') else {
        return Ok(vec![input.to_string()]);
    };

    // Locate the matching close. A second open brace before it is nesting,
    // which the grammar forbids.
    let mut close = None;
    let mut idx = open + 1;
    let bytes = input.as_bytes();
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 1,
            b'{' => {
                issues.push(ParseIssue::at(
                    IssueCode::NestedBraces,
                    "nested braces are not supported",
                    idx,
                    1,
                ));
                return Ok(vec![input.to_string()]);
            }
            b'}' => {
                close = Some(idx);
                break;
            }
            _ => {}
        }
        idx += 1;
    }

    let Some(close) = close else {
        issues.push(ParseIssue::at(
            IssueCode::UnclosedBrace,
            "unclosed brace group",
            open,
            input.len() - open,
        ));
        return Ok(vec![input.to_string()]);
    };

    let before = &input[..open];
    let inner = &input[open + 1..close];
    let after = &input[close + 1..];

    let items = expand_group(inner, opts)?;
    let suffixes = expand_inner(after, opts, issues)?;

    let total = items.len().saturating_mul(suffixes.len());
    if total > opts.max_expansions {
        return Err(LimitError::ExpansionLimit {
            limit: opts.max_expansions,
            actual: total,
        });
    }

    let mut out = Vec::with_capacity(total);
    for item in &items {
        for suffix in &suffixes {
            out.push(format!("{}{}{}", before, item, suffix));
        }
    }
    Ok(out)
}

/// Expand the contents of one brace group into its alternatives.
fn expand_group(inner: &str, opts: &ExpandOptions) -> Result<Vec<String>, LimitError> {
    // Numeric range form first: a single `m..n` item.
    if !inner.contains(',') {
        if let Some((start, end)) = parse_range(inner) {
            let count = start.abs_diff(end) as usize + 1;
            if count > opts.max_range {
                return Err(LimitError::ExpansionLimit {
                    limit: opts.max_range,
                    actual: count,
                });
            }
            let elements: Vec<String> = if start <= end {
                (start..=end).map(|v| v.to_string()).collect()
            } else {
                (end..=start).rev().map(|v| v.to_string()).collect()
            };
            return Ok(elements);
        }
    }

    Ok(split_unescaped(inner, ',')
        .into_iter()
        .map(|s| s.to_string())
        .collect())
}

/// Parse `m..n` with integer endpoints.
fn parse_range(s: &str) -> Option<(i64, i64)> {
    let (lhs, rhs) = s.split_once("..")?;
    Some((lhs.parse().ok()?, rhs.parse().ok()?))
}

/// Find the next unescaped occurrence of `needle` at or after `from`.
fn find_unescaped(s: &str, from: usize, needle: char) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut idx = from;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 1,
            b if b == needle as u8 => return Some(idx),
            _ => {}
        }
        idx += 1;
    }
    None
}

/// Split on unescaped occurrences of `sep`.
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 1,
            b if b == sep as u8 => {
                out.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
        idx += 1;
    }
    out.push(&s[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches(input: &str) -> Vec<String> {
        expand(input).unwrap().branches
    }

    #[test]
    fn test_no_braces_passthrough() {
        assert_eq!(branches("src/*.ts"), vec!["src/*.ts"]);
    }

    #[test]
    fn test_simple_alternation() {
        assert_eq!(branches("file.{txt,md}"), vec!["file.txt", "file.md"]);
    }

    #[test]
    fn test_cartesian_order() {
        assert_eq!(
            branches("{a,b}/{x,y}"),
            vec!["a/x", "a/y", "b/x", "b/y"]
        );
    }

    #[test]
    fn test_numeric_range_ascending() {
        assert_eq!(branches("{1..5}"), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_numeric_range_descending() {
        assert_eq!(branches("{3..1}"), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_range_limit() {
        let err = expand("{1..100}").unwrap_err();
        match err {
            LimitError::ExpansionLimit { limit, actual } => {
                assert_eq!(limit, 50);
                assert_eq!(actual, 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_expansion_limit() {
        // 11 * 11 = 121 branches, over the default cap of 100.
        let input = "{a,b,c,d,e,f,g,h,i,j,k}/{a,b,c,d,e,f,g,h,i,j,k}";
        assert!(matches!(
            expand(input),
            Err(LimitError::ExpansionLimit { limit: 100, .. })
        ));
    }

    #[test]
    fn test_nested_braces_degrade() {
        let result = expand("{a,{b,c}}").unwrap();
        assert_eq!(result.branches, vec!["{a,{b,c}}"]);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].code, IssueCode::NestedBraces);
    }

    #[test]
    fn test_unclosed_brace_degrade() {
        let result = expand("{a,b").unwrap();
        assert_eq!(result.branches, vec!["{a,b"]);
        assert_eq!(result.issues[0].code, IssueCode::UnclosedBrace);
    }

    #[test]
    fn test_escaped_brace_is_literal() {
        assert_eq!(branches(r"\{a,b\}"), vec![r"\{a,b\}"]);
    }

    #[test]
    fn test_custom_limits() {
        let opts = ExpandOptions {
            max_expansions: 4,
            max_range: 10,
        };
        assert_eq!(
            expand_with("{1..4}", &opts).unwrap().branches,
            vec!["1", "2", "3", "4"]
        );
        assert!(expand_with("{1..11}", &opts).is_err());
        assert!(expand_with("{a,b,c,d,e}", &opts).is_err());
    }
}
