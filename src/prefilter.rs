//! Quick-reject pre-filtering.
//!
//! A [`QuickRejectFilter`] is a bundle of cheap string checks derived from a
//! pattern: required path prefix and suffix, a minimum character length, and
//! literal segments every match must contain. Filters are conservative by
//! construction (they may pass a non-matching path, never reject a matching
//! one), so the matcher can short-circuit to `false` without simulating the
//! automaton.
//!
//! Filters compose under the algebra: intersection takes the
//! longest-compatible prefix/suffix, the larger minimum length and the union
//! of required literals; union takes the longest-common prefix/suffix, the
//! smaller minimum length and the intersection of required literals.

use crate::pattern::{PathPattern, RootNode, Segment, WildcardPart};

/// Cheap reject checks applied before automaton simulation.
///
/// All fields describe the path with its leading `/` stripped.
#[derive(Debug, Clone, Default)]
pub struct QuickRejectFilter {
    /// Every matching path starts with this.
    pub prefix: Option<String>,
    /// Every matching path ends with this.
    pub suffix: Option<String>,
    /// Minimum character count of a matching path.
    pub min_len: usize,
    /// Literal segments every matching path contains.
    pub required_segments: Vec<String>,
}

impl QuickRejectFilter {
    /// A filter that rejects nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive the filter for a parsed pattern.
    pub fn from_pattern(pattern: &PathPattern) -> Self {
        node_filter(&pattern.root)
    }

    /// True when the path cannot possibly match the pattern.
    pub fn rejects(&self, path: &str, segments: &[&str]) -> bool {
        if let Some(prefix) = &self.prefix {
            if !path.starts_with(prefix.as_str()) {
                return true;
            }
        }
        if let Some(suffix) = &self.suffix {
            if !path.ends_with(suffix.as_str()) {
                return true;
            }
        }
        if self.min_len > 0 && path.chars().count() < self.min_len {
            return true;
        }
        self.required_segments
            .iter()
            .any(|required| !segments.contains(&required.as_str()))
    }

    /// Combine for an intersection: both patterns constrain the path.
    pub fn intersect(a: &Self, b: &Self) -> Self {
        let mut required = a.required_segments.clone();
        for segment in &b.required_segments {
            if !required.contains(segment) {
                required.push(segment.clone());
            }
        }
        Self {
            prefix: longest_compatible(&a.prefix, &b.prefix),
            suffix: longest_compatible(&a.suffix, &b.suffix),
            min_len: a.min_len.max(b.min_len),
            required_segments: required,
        }
    }

    /// Combine for a union: only constraints shared by both survive.
    pub fn union(a: &Self, b: &Self) -> Self {
        let required = a
            .required_segments
            .iter()
            .filter(|segment| b.required_segments.contains(segment))
            .cloned()
            .collect();
        Self {
            prefix: common_affix(&a.prefix, &b.prefix, common_prefix),
            suffix: common_affix(&a.suffix, &b.suffix, common_suffix),
            min_len: a.min_len.min(b.min_len),
            required_segments: required,
        }
    }
}

/// The longer of two affixes. When one contains the other this is the
/// tighter compatible constraint; when they are incompatible no path matches
/// both patterns anyway, so keeping either is still conservative.
fn longest_compatible(a: &Option<String>, b: &Option<String>) -> Option<String> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if x.len() >= y.len() {
                Some(x.clone())
            } else {
                Some(y.clone())
            }
        }
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (None, None) => None,
    }
}

fn common_affix(
    a: &Option<String>,
    b: &Option<String>,
    common: impl Fn(&str, &str) -> String,
) -> Option<String> {
    match (a, b) {
        (Some(x), Some(y)) => {
            let shared = common(x, y);
            if shared.is_empty() {
                None
            } else {
                Some(shared)
            }
        }
        _ => None,
    }
}

fn common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

fn common_suffix(a: &str, b: &str) -> String {
    let shared: Vec<char> = a
        .chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect();
    shared.into_iter().rev().collect()
}

fn node_filter(node: &RootNode) -> QuickRejectFilter {
    match node {
        RootNode::Sequence(segments) => sequence_filter(segments),
        RootNode::Alternation(branches) => {
            let mut iter = branches.iter();
            let Some(first) = iter.next() else {
                return QuickRejectFilter::empty();
            };
            let mut combined = node_filter(first);
            for branch in iter {
                combined = QuickRejectFilter::union(&combined, &node_filter(branch));
            }
            combined
        }
    }
}

fn sequence_filter(segments: &[Segment]) -> QuickRejectFilter {
    // Prefix: consecutive leading literal segments, plus the literal run
    // opening the first non-literal segment.
    let mut prefix_parts: Vec<&str> = Vec::new();
    let mut prefix_run: Option<&str> = None;
    for segment in segments {
        match segment {
            Segment::Literal(lit) => prefix_parts.push(lit),
            Segment::Wildcard(parts) | Segment::Composite(parts) => {
                if let Some(WildcardPart::Literal(run)) = parts.first() {
                    prefix_run = Some(run);
                }
                break;
            }
            _ => break,
        }
    }
    let prefix = match (prefix_parts.is_empty(), prefix_run) {
        (true, None) => None,
        (true, Some(run)) => Some(run.to_string()),
        (false, None) => Some(prefix_parts.join("/")),
        (false, Some(run)) => Some(format!("{}/{}", prefix_parts.join("/"), run)),
    };

    // Suffix: the closing literal run of the last segment.
    let suffix = segments.last().and_then(|segment| match segment {
        Segment::Literal(lit) => Some(lit.clone()),
        Segment::Wildcard(parts) | Segment::Composite(parts) => match parts.last() {
            Some(WildcardPart::Literal(run)) => Some(run.clone()),
            _ => None,
        },
        _ => None,
    });

    let counted = segments
        .iter()
        .filter(|s| !matches!(s, Segment::Globstar))
        .count();
    let min_len: usize = segments.iter().map(Segment::min_chars).sum::<usize>()
        + counted.saturating_sub(1);

    let required_segments = segments
        .iter()
        .filter_map(|s| match s {
            Segment::Literal(lit) => Some(lit.clone()),
            _ => None,
        })
        .collect();

    QuickRejectFilter {
        prefix,
        suffix,
        min_len,
        required_segments,
    }
}
