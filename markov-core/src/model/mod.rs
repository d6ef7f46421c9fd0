//! Chain construction and sampling.
//!
//! This module provides:
//! - The weighted directed graph of a Markov chain (`ChainModel`)
//! - Construction from observation streams (`ChainBuilder`)
//! - Drawing-mode edits (`ChainEdit`)
//! - Weighted random walks (`SequenceGenerator`)

/// Weighted directed graph of states and transitions.
///
/// Supports occurrence counting, merging, drawing-mode edits and
/// binary snapshots.
pub mod chain_model;

/// Sequential and parallel construction of a `ChainModel` from
/// separator-delimited observations.
pub mod builder;

/// Patch operations for hand-drawn chains.
pub mod edit;

/// Weighted random walk producing a `GeneratedSequence`.
pub mod generator;

/// Generation parameters (starting state, length limit, delimiter).
pub mod params;

/// Cumulative-weight roulette selection.
pub mod selection;

/// Result of one walk.
pub mod sequence;

/// A single state (node) of the chain.
pub mod state;

/// A single weighted transition (edge) of the chain.
pub mod transition;
