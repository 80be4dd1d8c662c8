//! Segment-alphabet automaton engine.
//!
//! This module implements the NFA/DFA core that pattern compilation and the
//! algebra operations are built on. The key components are:
//!
//! - `state`: flat-vector automaton representation and the transition sum
//! - `builder`: Thompson-style AST → NFA construction
//! - `simulate`: set-based NFA simulation and the DFA fast path
//! - `determinize`: subset construction, completion and complement
//! - `product`: pairwise intersection and NFA-splice union
//! - `analysis`: reachability, witness search, bounded path counting

pub mod analysis;
pub mod builder;
pub mod determinize;
pub mod product;
mod simulate;
mod state;

// Re-export from state
pub use state::{SegmentAutomaton, SegmentPredicate, State, StateId, Transition, CATCH_ALL_TAG};

// Re-export from builder
pub use builder::{build_automaton, segment_bounds};

// Re-export from simulate
pub use simulate::automaton_matches;

// Re-export from determinize
pub use determinize::{
    complement_automaton, determinize, DeterminizeOptions, DEFAULT_MAX_DFA_STATES,
};

// Re-export from product
pub use product::{intersect_automata, union_automata};

// Re-export from analysis
pub use analysis::{count_paths, find_witness, is_empty};
