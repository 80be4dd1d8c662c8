//! Containment analysis between compiled patterns.
//!
//! The analyzer decides A ⊆ B, A ⊇ B, overlap and disjointness structurally
//! and by sampling, not as a closed-form decision procedure: a bounded set of
//! concrete paths is generated from each pattern's AST and replayed against
//! the other pattern, then structural reasoning over depth bounds and
//! quick-reject affixes strengthens the verdict. A counterexample proves
//! non-containment; the absence of one does not prove containment.

use std::fmt;

use crate::pattern::{CharClass, RootNode, Segment, WildcardPart};
use crate::segment::segment_matches;
use crate::CompiledPattern;

/// How many concrete variants each sampled branch produces.
const SAMPLE_VARIANTS: usize = 3;
/// Largest globstar expansion tried while sampling.
const GLOBSTAR_EXPANSION: usize = 3;
/// Cap on positions reported in the segment-by-segment comparison.
const COMPARED_POSITIONS: usize = 5;

/// The derived relation between two pattern languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Equal,
    Subset,
    Superset,
    Overlapping,
    Disjoint,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relationship::Equal => "equal",
            Relationship::Subset => "subset",
            Relationship::Superset => "superset",
            Relationship::Overlapping => "overlapping",
            Relationship::Disjoint => "disjoint",
        })
    }
}

/// Why a containment check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    DepthBounds,
    RequiredPrefix,
    RequiredSuffix,
    Anchoring,
    SegmentMismatch,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureReason::DepthBounds => "depth_bounds",
            FailureReason::RequiredPrefix => "required_prefix",
            FailureReason::RequiredSuffix => "required_suffix",
            FailureReason::Anchoring => "anchoring",
            FailureReason::SegmentMismatch => "segment_mismatch",
        })
    }
}

/// One position of the segment-by-segment comparison.
#[derive(Debug, Clone)]
pub struct SegmentConstraint {
    pub position: usize,
    /// Source text of A's constraint at this position, `**`-aware.
    pub a_constraint: String,
    pub b_constraint: String,
    /// Whether A's constraint is contained in B's at this position.
    pub a_subset_of_b: bool,
    pub difference: String,
}

/// Role of a witness path in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessKind {
    /// In A but not in B.
    Counterexample,
    /// In B but not in A.
    ReverseCounterexample,
    /// In both languages.
    Shared,
}

#[derive(Debug, Clone)]
pub struct WitnessPath {
    pub path: String,
    pub kind: WitnessKind,
}

/// Structured explanation attached to every containment result.
#[derive(Debug, Clone, Default)]
pub struct ContainmentExplanation {
    pub failure_reasons: Vec<FailureReason>,
    pub segment_comparison: Vec<SegmentConstraint>,
    pub witnesses: Vec<WitnessPath>,
}

/// Outcome of [`check_containment`].
#[derive(Debug, Clone)]
pub struct ContainmentResult {
    pub is_subset: bool,
    pub is_superset: bool,
    pub is_equal: bool,
    pub has_overlap: bool,
    pub relationship: Relationship,
    /// A path in A but not in B, when one was found.
    pub counterexample: Option<String>,
    /// A path in B but not in A, when one was found.
    pub reverse_counterexample: Option<String>,
    pub explanation: ContainmentExplanation,
}

/// Analyze the containment relation between the languages of two compiled
/// patterns.
pub fn check_containment(a: &CompiledPattern, b: &CompiledPattern) -> ContainmentResult {
    let a_samples = sample_paths(a);
    let b_samples = sample_paths(b);

    let (mut is_subset, mut counterexample) = direction(a, &a_samples, b);
    let (mut is_superset, mut reverse_counterexample) = direction(b, &b_samples, a);

    // Structural strengthening: an unbounded language cannot fit inside a
    // bounded one, whatever the samples say.
    if is_subset && a.max_segments().is_none() {
        if let Some(b_max) = b.max_segments() {
            is_subset = false;
            counterexample = deep_sample(a, b_max + 1).or(counterexample);
        }
    }
    if is_superset && b.max_segments().is_none() {
        if let Some(a_max) = a.max_segments() {
            is_superset = false;
            reverse_counterexample = deep_sample(b, a_max + 1).or(reverse_counterexample);
        }
    }

    let shared = find_shared(a, b, &a_samples, &b_samples);
    let has_overlap = shared.is_some();

    let is_equal = is_subset && is_superset;
    let relationship = if is_equal {
        Relationship::Equal
    } else if is_subset {
        Relationship::Subset
    } else if is_superset {
        Relationship::Superset
    } else if has_overlap {
        Relationship::Overlapping
    } else {
        Relationship::Disjoint
    };

    let mut witnesses = Vec::new();
    if let Some(path) = &counterexample {
        witnesses.push(WitnessPath {
            path: path.clone(),
            kind: WitnessKind::Counterexample,
        });
    }
    if let Some(path) = &reverse_counterexample {
        witnesses.push(WitnessPath {
            path: path.clone(),
            kind: WitnessKind::ReverseCounterexample,
        });
    }
    if let Some(path) = &shared {
        witnesses.push(WitnessPath {
            path: path.clone(),
            kind: WitnessKind::Shared,
        });
    }

    let explanation = ContainmentExplanation {
        failure_reasons: if is_subset {
            Vec::new()
        } else {
            failure_reasons(a, b, counterexample.is_some())
        },
        segment_comparison: compare_segments(a, b),
        witnesses,
    };

    ContainmentResult {
        is_subset,
        is_superset,
        is_equal,
        has_overlap,
        relationship,
        counterexample,
        reverse_counterexample,
        explanation,
    }
}

/// Replay `from`'s samples against `into`: contained unless a sample fails.
fn direction(
    from: &CompiledPattern,
    samples: &[String],
    into: &CompiledPattern,
) -> (bool, Option<String>) {
    debug_assert!(samples.iter().all(|path| from.matches(path)));
    for path in samples {
        if !into.matches(path) {
            return (false, Some(path.clone()));
        }
    }
    (true, None)
}

/// Generate a bounded sample of concrete paths from a pattern's AST.
///
/// Literals appear verbatim; wildcards are lowered by substitution (with a
/// dictionary fallback); a charclass contributes its first range start or
/// first character; globstars expand to 0..=k `dir{i}` runs.
fn sample_paths(pattern: &CompiledPattern) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for branch in pattern.pattern().root.branches() {
        let RootNode::Sequence(segments) = branch else {
            continue;
        };
        let has_globstar = segments.iter().any(|s| matches!(s, Segment::Globstar));
        let expansions: &[usize] = if has_globstar { &[0, 1, 2, GLOBSTAR_EXPANSION] } else { &[0] };

        for &expansion in expansions {
            for variant in 0..SAMPLE_VARIANTS {
                let path = render_branch(segments, expansion, variant);
                if pattern.matches(&path) && !out.contains(&path) {
                    out.push(path);
                }
            }
        }
    }
    out
}

fn render_branch(segments: &[Segment], globstar_expansion: usize, variant: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for segment in segments {
        match segment {
            Segment::Literal(lit) => parts.push(lit.clone()),
            Segment::Globstar => {
                for i in 0..globstar_expansion {
                    parts.push(format!("dir{}", i + 1));
                }
            }
            other => parts.push(sample_segment(other, variant)),
        }
    }
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// A concrete segment for a non-literal segment node.
fn sample_segment(segment: &Segment, variant: usize) -> String {
    let derived = match segment {
        Segment::CharClass(class) => class_sample(class).to_string(),
        Segment::Wildcard(parts) | Segment::Composite(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    WildcardPart::Literal(lit) => out.push_str(lit),
                    WildcardPart::Star => out.push_str(&format!("file{variant}")),
                    WildcardPart::Question => out.push('x'),
                    WildcardPart::Class(class) => out.push(class_sample(class)),
                }
            }
            out
        }
        Segment::Literal(lit) => lit.clone(),
        Segment::Globstar => format!("dir{}", variant + 1),
    };
    if segment_matches(&derived, segment) {
        return derived;
    }

    for fallback in [
        format!("file{variant}.ts"),
        format!("file{variant}.js"),
        format!("test-{variant}"),
        format!("match{variant}"),
    ] {
        if segment_matches(&fallback, segment) {
            return fallback;
        }
    }
    derived
}

/// First range start or first listed character; negated classes scan a small
/// candidate set instead.
fn class_sample(class: &CharClass) -> char {
    if !class.negated {
        if let Some(range) = class.ranges.first() {
            return range.start;
        }
        if let Some(c) = class.chars.chars().next() {
            return c;
        }
    }
    ['a', 'z', '0', '9', '_', '-', '.', 'q']
        .into_iter()
        .find(|c| class.contains(*c))
        .unwrap_or('_')
}

/// A path from `pattern` with at least `depth` segments, used as the
/// counterexample when an unbounded language is checked against a bounded
/// one.
fn deep_sample(pattern: &CompiledPattern, depth: usize) -> Option<String> {
    for branch in pattern.pattern().root.branches() {
        let RootNode::Sequence(segments) = branch else {
            continue;
        };
        if !segments.iter().any(|s| matches!(s, Segment::Globstar)) {
            continue;
        }
        for variant in 0..SAMPLE_VARIANTS {
            let path = render_branch(segments, depth, variant);
            if pattern.matches(&path) {
                return Some(path);
            }
        }
    }
    None
}

/// Find a path in both languages: each side's samples first, then a combined
/// generator mixing prefixes and suffixes from the two quick-reject filters.
fn find_shared(
    a: &CompiledPattern,
    b: &CompiledPattern,
    a_samples: &[String],
    b_samples: &[String],
) -> Option<String> {
    for path in a_samples.iter().chain(b_samples) {
        if a.matches(path) && b.matches(path) {
            return Some(path.clone());
        }
    }
    combined_candidates(a, b)
        .into_iter()
        .find(|path| a.matches(path) && b.matches(path))
}

fn combined_candidates(a: &CompiledPattern, b: &CompiledPattern) -> Vec<String> {
    let prefixes: Vec<Option<&str>> = vec![
        a.filter().prefix.as_deref(),
        b.filter().prefix.as_deref(),
        None,
    ];
    let suffixes: Vec<Option<&str>> = vec![
        a.filter().suffix.as_deref(),
        b.filter().suffix.as_deref(),
        None,
    ];

    let mut out = Vec::new();
    for prefix in &prefixes {
        if let Some(prefix) = prefix {
            out.push(format!("/{prefix}"));
        }
        for suffix in &suffixes {
            let file = match suffix {
                Some(s) if s.starts_with('.') => format!("file{s}"),
                Some(s) => s.to_string(),
                None => "file".to_string(),
            };
            for mid in ["", "dir"] {
                let mut parts: Vec<&str> = Vec::new();
                if let Some(prefix) = prefix {
                    parts.push(prefix);
                }
                if !mid.is_empty() {
                    parts.push(mid);
                }
                parts.push(&file);
                let path = format!("/{}", parts.join("/"));
                if !out.contains(&path) {
                    out.push(path);
                }
            }
        }
    }
    out
}

/// Classify why A ⊄ B from the structural summaries.
fn failure_reasons(
    a: &CompiledPattern,
    b: &CompiledPattern,
    have_counterexample: bool,
) -> Vec<FailureReason> {
    let mut reasons = Vec::new();

    let depth_conflict = a.min_segments() < b.min_segments()
        || match (a.max_segments(), b.max_segments()) {
            (None, Some(_)) => true,
            (Some(a_max), Some(b_max)) => a_max > b_max,
            _ => false,
        };
    if depth_conflict {
        reasons.push(FailureReason::DepthBounds);
    }

    if let (Some(ap), Some(bp)) = (&a.filter().prefix, &b.filter().prefix) {
        if !ap.starts_with(bp.as_str()) && !bp.starts_with(ap.as_str()) {
            reasons.push(FailureReason::RequiredPrefix);
        }
    }
    if let (Some(asuf), Some(bsuf)) = (&a.filter().suffix, &b.filter().suffix) {
        if !asuf.ends_with(bsuf.as_str()) && !bsuf.ends_with(asuf.as_str()) {
            reasons.push(FailureReason::RequiredSuffix);
        }
    }
    if a.pattern().is_absolute != b.pattern().is_absolute {
        reasons.push(FailureReason::Anchoring);
    }

    if reasons.is_empty() && have_counterexample {
        reasons.push(FailureReason::SegmentMismatch);
    }
    reasons
}

/// Segment-by-segment comparison over the first sequence branch of each
/// side, at most [`COMPARED_POSITIONS`] positions.
fn compare_segments(a: &CompiledPattern, b: &CompiledPattern) -> Vec<SegmentConstraint> {
    let a_segments = first_sequence(&a.pattern().root);
    let b_segments = first_sequence(&b.pattern().root);
    let positions = a_segments.len().max(b_segments.len()).min(COMPARED_POSITIONS);

    let mut out = Vec::with_capacity(positions);
    for position in 0..positions {
        let a_segment = a_segments.get(position);
        let b_segment = b_segments.get(position);
        let a_constraint = constraint_text(a_segment);
        let b_constraint = constraint_text(b_segment);
        let verdict = position_subset(a_segment, b_segment);
        let difference = if verdict {
            String::new()
        } else {
            format!("`{a_constraint}` is not contained in `{b_constraint}`")
        };
        out.push(SegmentConstraint {
            position,
            a_constraint,
            b_constraint,
            a_subset_of_b: verdict,
            difference,
        });
    }
    out
}

fn first_sequence(root: &RootNode) -> &[Segment] {
    match root {
        RootNode::Sequence(segments) => segments,
        RootNode::Alternation(branches) => branches
            .first()
            .map(first_sequence)
            .unwrap_or(&[]),
    }
}

fn constraint_text(segment: Option<&Segment>) -> String {
    match segment {
        Some(segment) => segment.source_text(),
        None => "<end>".to_string(),
    }
}

/// Per-position verdict. Conservative: only clearly-contained cases say yes.
fn position_subset(a: Option<&Segment>, b: Option<&Segment>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    if a.source_text() == b.source_text() {
        return true;
    }
    match b {
        Segment::Globstar => true,
        Segment::Wildcard(parts) if matches!(parts.as_slice(), [WildcardPart::Star]) => true,
        _ => match a {
            Segment::Literal(lit) => segment_matches(lit, b),
            _ => false,
        },
    }
}
