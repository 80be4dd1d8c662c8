//! glob-algebra: a path-pattern algebra engine.
//!
//! The crate parses glob-style path patterns, compiles them to segment-level
//! finite automata, matches normalized absolute paths against them, and
//! performs set-theoretic operations on the languages the patterns denote:
//! intersection, union, complement, difference and containment analysis.
//!
//! ```
//! use glob_algebra::compile;
//!
//! let sources = compile("src/**/*.ts");
//! assert!(sources.matches("/src/app/index.ts"));
//! assert!(!sources.matches("/lib/index.ts"));
//!
//! let tests = compile("**/*.test.ts");
//! let production = sources.difference(&tests).unwrap();
//! assert!(production.matches("/src/app/index.ts"));
//! assert!(!production.matches("/src/app/index.test.ts"));
//! ```
//!
//! Patterns operate on *segments*, not characters: `*` never crosses a `/`,
//! and `**` consumes zero or more complete segments. All matching APIs take
//! normalized absolute paths; [`normalize_path`] converts caller input.
//!
//! Compiled patterns are immutable values. Every algebra operation returns a
//! fresh pattern, so sharing across threads needs no synchronization.

pub mod automaton;
pub mod containment;
mod paths;
mod pattern;
mod prefilter;
mod segment;

use std::fmt;

use rustc_hash::FxHashMap;

use automaton::{
    automaton_matches, build_automaton, complement_automaton, determinize, intersect_automata,
    segment_bounds, union_automata, SegmentAutomaton,
};

pub use automaton::{DeterminizeOptions, DEFAULT_MAX_DFA_STATES};
pub use containment::{
    check_containment, ContainmentExplanation, ContainmentResult, FailureReason, Relationship,
    SegmentConstraint, WitnessKind, WitnessPath,
};
pub use paths::{normalize_path, split_segments, NormalizeContext};
pub use pattern::{
    parse, CharClass, CharRange, ExpandOptions, IssueCode, ParseIssue, PathPattern, RootNode,
    Segment, WildcardPart,
};
pub use prefilter::QuickRejectFilter;
pub use segment::{matches_direct, segment_matches, to_regex};

/// Operational limit errors.
///
/// Unlike parse diagnostics (which ride along on the pattern), these abort
/// the operation that hit them. Callers may recover by raising the cap or
/// simplifying the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// Subset construction would exceed the DFA state cap.
    DfaStateLimit { limit: usize, attempted: usize },
    /// Brace expansion would exceed the branch or range cap.
    ExpansionLimit { limit: usize, actual: usize },
}

impl LimitError {
    /// The stable diagnostic code for this limit.
    pub fn code(&self) -> IssueCode {
        match self {
            LimitError::DfaStateLimit { .. } => IssueCode::DfaStateLimit,
            LimitError::ExpansionLimit { .. } => IssueCode::ExpansionLimit,
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitError::DfaStateLimit { limit, attempted } => write!(
                f,
                "{}: subset construction needed {} states (cap {})",
                IssueCode::DfaStateLimit,
                attempted,
                limit
            ),
            LimitError::ExpansionLimit { limit, actual } => write!(
                f,
                "{}: brace expansion produced {} entries (cap {})",
                IssueCode::ExpansionLimit,
                actual,
                limit
            ),
        }
    }
}

impl std::error::Error for LimitError {}

/// Compile a pattern source string.
///
/// Compilation is total: syntax problems are recorded as issues on the
/// returned pattern and the offending constructs degrade to best-effort
/// matchers. Check [`CompiledPattern::is_valid`] when strictness matters.
pub fn compile(source: &str) -> CompiledPattern {
    CompiledPattern::compile(source)
}

/// Expand brace groups with the default caps.
pub fn expand_braces(source: &str) -> Result<Vec<String>, LimitError> {
    pattern::expand(source).map(|expansion| expansion.branches)
}

/// Expand brace groups with caller-supplied caps.
pub fn expand_braces_with(
    source: &str,
    options: &ExpandOptions,
) -> Result<Vec<String>, LimitError> {
    pattern::expand_with(source, options).map(|expansion| expansion.branches)
}

/// A pattern compiled for matching and algebra.
///
/// Value-like and immutable: clone freely, share by reference, never mutated
/// in place. Holds the parsed AST, the segment automaton, the quick-reject
/// filter and the precomputed segment-count bounds.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    pattern: PathPattern,
    filter: QuickRejectFilter,
    automaton: SegmentAutomaton,
    min_segments: usize,
    max_segments: Option<usize>,
}

impl CompiledPattern {
    /// Compile from source. See [`compile`].
    pub fn compile(source: &str) -> Self {
        Self::from_pattern(pattern::parse(source))
    }

    /// Compile an already-parsed pattern.
    pub fn from_pattern(mut pattern: PathPattern) -> Self {
        let (automaton, issues) = build_automaton(&pattern);
        pattern.issues.extend(issues);
        let (min_segments, max_segments) = segment_bounds(&pattern);
        let filter = QuickRejectFilter::from_pattern(&pattern);
        Self {
            source: pattern.source.clone(),
            pattern,
            filter,
            automaton,
            min_segments,
            max_segments,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn issues(&self) -> &[ParseIssue] {
        &self.pattern.issues
    }

    pub fn is_valid(&self) -> bool {
        self.pattern.issues.is_empty()
    }

    pub fn filter(&self) -> &QuickRejectFilter {
        &self.filter
    }

    pub fn automaton(&self) -> &SegmentAutomaton {
        &self.automaton
    }

    pub fn min_segments(&self) -> usize {
        self.min_segments
    }

    pub fn max_segments(&self) -> Option<usize> {
        self.max_segments
    }

    /// True when a `**` is reachable, i.e. there is no segment-count bound.
    pub fn is_unbounded(&self) -> bool {
        self.max_segments.is_none()
    }

    /// Match a normalized absolute path.
    ///
    /// Quick-reject checks and segment-count bounds run before automaton
    /// simulation. A leading `!` on the source applies as a final outer
    /// flip, after everything else.
    pub fn matches(&self, path: &str) -> bool {
        let matched = self.matches_raw(path);
        if self.pattern.is_negation {
            !matched
        } else {
            matched
        }
    }

    fn matches_raw(&self, path: &str) -> bool {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let segments = split_segments(path);

        if self.filter.rejects(trimmed, &segments) {
            return false;
        }
        if segments.len() < self.min_segments {
            return false;
        }
        if let Some(max) = self.max_segments {
            if segments.len() > max {
                return false;
            }
        }
        automaton_matches(&self.automaton, &segments)
    }

    /// The pattern denoting `L(self) ∩ L(other)`.
    ///
    /// Both operands are determinized first; the product automaton explores
    /// reachable state pairs only.
    pub fn intersect(&self, other: &Self) -> Result<Self, LimitError> {
        self.intersect_with(other, &DeterminizeOptions::default())
    }

    /// [`intersect`](Self::intersect) with caller-supplied determinization
    /// limits.
    pub fn intersect_with(
        &self,
        other: &Self,
        options: &DeterminizeOptions,
    ) -> Result<Self, LimitError> {
        let product = intersect_automata(&self.dfa_with(options)?, &other.dfa_with(options)?);
        let max_segments = match (self.max_segments, other.max_segments) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        Ok(Self::synthetic(
            format!("({}) ∩ ({})", self.source, other.source),
            vec![self.pattern.root.clone(), other.pattern.root.clone()],
            product,
            QuickRejectFilter::intersect(&self.filter, &other.filter),
            self.min_segments.max(other.min_segments),
            max_segments,
        ))
    }

    /// The pattern denoting `L(self) ∪ L(other)`. The result wraps an NFA;
    /// downstream operations determinize on demand.
    pub fn union(&self, other: &Self) -> Self {
        let spliced = union_automata(&self.automaton, &other.automaton);
        let max_segments = match (self.max_segments, other.max_segments) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Self::synthetic(
            format!("({}) ∪ ({})", self.source, other.source),
            vec![self.pattern.root.clone(), other.pattern.root.clone()],
            spliced,
            QuickRejectFilter::union(&self.filter, &other.filter),
            self.min_segments.min(other.min_segments),
            max_segments,
        )
    }

    /// The pattern denoting the complement of `L(self)`.
    pub fn complement(&self) -> Result<Self, LimitError> {
        self.complement_with(&DeterminizeOptions::default())
    }

    /// [`complement`](Self::complement) with caller-supplied determinization
    /// limits.
    pub fn complement_with(&self, options: &DeterminizeOptions) -> Result<Self, LimitError> {
        let complemented = complement_automaton(&self.dfa_with(options)?);
        Ok(Self::synthetic(
            format!("¬({})", self.source),
            vec![self.pattern.root.clone()],
            complemented,
            QuickRejectFilter::empty(),
            0,
            None,
        ))
    }

    /// The pattern denoting `L(self) \ L(other)`.
    pub fn difference(&self, other: &Self) -> Result<Self, LimitError> {
        self.difference_with(other, &DeterminizeOptions::default())
    }

    /// [`difference`](Self::difference) with caller-supplied determinization
    /// limits.
    pub fn difference_with(
        &self,
        other: &Self,
        options: &DeterminizeOptions,
    ) -> Result<Self, LimitError> {
        let complemented = complement_automaton(&other.dfa_with(options)?);
        let product = intersect_automata(&self.dfa_with(options)?, &complemented);
        Ok(Self::synthetic(
            format!("({}) \\ ({})", self.source, other.source),
            vec![self.pattern.root.clone(), other.pattern.root.clone()],
            product,
            self.filter.clone(),
            self.min_segments,
            self.max_segments,
        ))
    }

    /// Containment analysis against another pattern. See
    /// [`containment::check_containment`].
    pub fn check_containment(&self, other: &Self) -> ContainmentResult {
        containment::check_containment(self, other)
    }

    /// True when no path can match (reachability approximation; see
    /// [`automaton::is_empty`]).
    pub fn is_empty_language(&self) -> bool {
        automaton::is_empty(&self.automaton)
    }

    /// A path accepted by this pattern, when one can be constructed.
    pub fn find_witness(&self) -> Option<String> {
        automaton::find_witness(&self.automaton)
    }

    /// Count accepted paths per segment depth, up to `max_depth`.
    pub fn count_paths(&self, max_depth: usize) -> FxHashMap<usize, u64> {
        automaton::count_paths(&self.automaton, max_depth)
    }

    /// This pattern's automaton as a complete DFA.
    fn dfa_with(&self, options: &DeterminizeOptions) -> Result<SegmentAutomaton, LimitError> {
        if self.automaton.deterministic {
            Ok(self.automaton.clone())
        } else {
            determinize(&self.automaton, options)
        }
    }

    /// Wrap an automaton produced by an algebra operation.
    ///
    /// The synthetic AST is an alternation referencing the operand roots so
    /// downstream consumers can still introspect them; the source string is
    /// diagnostic only and is never re-parsed.
    fn synthetic(
        source: String,
        operand_roots: Vec<RootNode>,
        automaton: SegmentAutomaton,
        filter: QuickRejectFilter,
        min_segments: usize,
        max_segments: Option<usize>,
    ) -> Self {
        let pattern = PathPattern {
            source: source.clone(),
            root: RootNode::Alternation(operand_roots),
            is_absolute: true,
            is_negation: false,
            issues: Vec::new(),
        };
        Self {
            source,
            pattern,
            filter,
            automaton,
            min_segments,
            max_segments,
        }
    }
}

/// A collection of compiled patterns keyed by caller identifiers.
///
/// ```
/// use glob_algebra::PatternSet;
///
/// let mut set = PatternSet::new();
/// set.add_pattern("sources", "src/**/*.ts");
/// set.add_pattern("tests", "**/*.test.ts");
///
/// let hits = set.matches_for_path("/src/app/main.test.ts");
/// assert_eq!(hits.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PatternSet<X = String> {
    patterns: Vec<(X, CompiledPattern)>,
}

impl<X: Clone + Eq> PatternSet<X> {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Compile and register a pattern under `id`. One id may carry several
    /// patterns; it matches when any of them does.
    pub fn add_pattern(&mut self, id: X, source: &str) {
        self.patterns.push((id, compile(source)));
    }

    /// Ids of all patterns matching the path, each at most once.
    pub fn matches_for_path(&self, path: &str) -> Vec<X> {
        let mut out: Vec<X> = Vec::new();
        for (id, pattern) in &self.patterns {
            if pattern.matches(path) && !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// True when any registered pattern matches (returns on first hit).
    pub fn has_matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|(_, p)| p.matches(path))
    }

    /// Remove every pattern registered under `id`.
    pub fn delete_patterns(&mut self, id: &X) {
        self.patterns.retain(|(existing, _)| existing != id);
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }
}

impl<X: Clone + Eq> Default for PatternSet<X> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_match() {
        let pattern = compile("src/**/*.ts");
        assert!(pattern.matches("/src/index.ts"));
        assert!(pattern.matches("/src/a/b/index.ts"));
        assert!(!pattern.matches("/lib/index.ts"));
        assert!(!pattern.matches("/src/index.js"));
    }

    #[test]
    fn test_empty_pattern_matches_root_only() {
        let pattern = compile("");
        assert!(pattern.matches("/"));
        assert!(!pattern.matches("/src"));

        let tilde = compile("~");
        assert!(tilde.matches("/"));
        assert!(!tilde.matches("/home"));
    }

    #[test]
    fn test_negation_outer_flip() {
        let pattern = compile("!src/**");
        assert!(pattern.pattern().is_negation);
        assert!(!pattern.matches("/src/index.ts"));
        assert!(pattern.matches("/lib/index.ts"));
        assert!(pattern.matches("/"));
    }

    #[test]
    fn test_globstar_matches_zero_segments() {
        let pattern = compile("src/**");
        assert!(pattern.matches("/src"));
        assert!(pattern.matches("/src/deep/tree"));
    }

    #[test]
    fn test_unbounded_flag() {
        assert!(compile("src/**").is_unbounded());
        assert!(!compile("src/*.ts").is_unbounded());
        assert_eq!(compile("src/*.ts").max_segments(), Some(2));
        assert_eq!(compile("src/**").max_segments(), None);
    }

    #[test]
    fn test_intersection_scenario() {
        let product = compile("src/**").intersect(&compile("**/*.ts")).unwrap();
        assert!(product.matches("/src/index.ts"));
        assert!(!product.matches("/src/index.js"));
        assert!(!product.matches("/lib/index.ts"));
        assert_eq!(product.source(), "(src/**) ∩ (**/*.ts)");
    }

    #[test]
    fn test_union_scenario() {
        let either = compile("src/**").union(&compile("**/*.ts"));
        for path in ["/src/anything", "/lib/index.ts"] {
            assert!(either.matches(path));
            assert!(
                compile("src/**").matches(path) || compile("**/*.ts").matches(path)
            );
        }
        assert!(!either.matches("/lib/index.js"));
        assert_eq!(either.source(), "(src/**) ∪ (**/*.ts)");
    }

    #[test]
    fn test_complement_scenario() {
        let complement = compile("**/*.test.ts").complement().unwrap();
        assert!(complement.matches("/src/index.ts"));
        assert!(!complement.matches("/src/index.test.ts"));
        assert!(complement.matches("/"));
        assert_eq!(complement.source(), "¬(**/*.test.ts)");
    }

    #[test]
    fn test_difference_scenario() {
        let difference = compile("src/**").difference(&compile("**/*.test.ts")).unwrap();
        assert!(difference.matches("/src/index.ts"));
        assert!(!difference.matches("/src/index.test.ts"));
        assert_eq!(difference.source(), "(src/**) \\ (**/*.test.ts)");
    }

    #[test]
    fn test_algebra_preserves_operand_asts() {
        let product = compile("src/**").intersect(&compile("**/*.ts")).unwrap();
        match &product.pattern().root {
            RootNode::Alternation(operands) => assert_eq!(operands.len(), 2),
            other => panic!("expected operand alternation, got {other:?}"),
        }
    }

    #[test]
    fn test_compilation_is_total_for_invalid_patterns() {
        let pattern = compile("src/[abc");
        assert!(!pattern.is_valid());
        assert_eq!(pattern.issues()[0].code, IssueCode::UnclosedBracket);
        // Degrades to a literal `[abc` segment.
        assert!(pattern.matches("/src/[abc"));
    }

    #[test]
    fn test_expand_braces_scenarios() {
        assert_eq!(
            expand_braces("{a,b}/{x,y}").unwrap(),
            vec!["a/x", "a/y", "b/x", "b/y"]
        );
        assert_eq!(
            expand_braces("{1..5}").unwrap(),
            vec!["1", "2", "3", "4", "5"]
        );
        assert!(matches!(
            expand_braces("{1..100}"),
            Err(LimitError::ExpansionLimit { limit: 50, actual: 100 })
        ));
    }

    #[test]
    fn test_per_call_state_cap() {
        let a = compile("{a,b,c,d,e}/*.ts");
        let b = compile("**");
        let err = a
            .intersect_with(&b, &DeterminizeOptions { max_states: 2 })
            .unwrap_err();
        assert!(matches!(err, LimitError::DfaStateLimit { limit: 2, .. }));

        // The default cap is far above anything these patterns need.
        assert!(a.intersect(&b).is_ok());
    }

    #[test]
    fn test_limit_error_display_carries_code() {
        let err = LimitError::DfaStateLimit {
            limit: 2,
            attempted: 3,
        };
        assert!(err.to_string().starts_with("DFA_STATE_LIMIT"));
        assert_eq!(err.code(), IssueCode::DfaStateLimit);
    }

    #[test]
    fn test_pattern_set() {
        let mut set = PatternSet::new();
        set.add_pattern("sources", "src/**/*.ts");
        set.add_pattern("tests", "**/*.test.ts");
        set.add_pattern("sources", "lib/**/*.ts");

        assert_eq!(set.matches_for_path("/src/main.ts"), vec!["sources"]);
        assert_eq!(
            set.matches_for_path("/src/main.test.ts"),
            vec!["sources", "tests"]
        );
        assert!(set.has_matches("/lib/util.ts"));
        assert!(!set.has_matches("/docs/readme.md"));

        set.delete_patterns(&"sources");
        assert_eq!(set.pattern_count(), 1);
        assert!(!set.has_matches("/src/main.ts"));
    }

    #[test]
    fn test_compiled_pattern_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledPattern>();
        assert_send_sync::<PatternSet<String>>();
    }

    #[test]
    fn test_count_paths_exposed() {
        let counts = compile("{a,b}/x").count_paths(3);
        assert_eq!(counts.get(&2), Some(&2));
    }

    #[test]
    fn test_find_witness_exposed() {
        let witness = compile("src/**/*.ts").find_witness().unwrap();
        assert!(compile("src/**/*.ts").matches(&witness));
    }
}
