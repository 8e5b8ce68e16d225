//! Translation of linear temporal logic formulas into Büchi automata.
//!
//! The crate implements the classic three-stage pipeline: a parsed and
//! algebraically simplified formula is turned into a very weak alternating
//! automaton, which a powerset construction converts into a generalized
//! Büchi automaton with transition-based acceptance, which in turn is
//! degeneralized into an ordinary Büchi automaton. Each stage applies
//! on-the-fly and a-posteriori simplifications so that the resulting
//! automata stay small enough to feed into a model checker.
//!
//! The [`translate`] entry point runs the whole pipeline; the [`output`]
//! module renders the result as a Spin never claim, a C state table, or a
//! Graphviz graph.

pub mod core;
pub mod errors;
pub mod output;

pub use crate::core::{Flags, Translation, translate};
