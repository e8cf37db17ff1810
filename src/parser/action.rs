// src/parser/action.rs

//! Transition actions and their identity features.

use std::rc::Rc;

use crate::graph::Concept;
use crate::intern::Sym;
use crate::lexicon::{Lexicon, ShiftRule};
use crate::weights::hash_features;

// Distinct tags seed the identity-feature hashes per action kind.
const TAG_SHIFT: i32 = 1;
const TAG_REDUCE: i32 = 2;
const TAG_EMPTY: i32 = 3;
const TAG_DUMMY: i32 = 4;

/// Attachment direction of a reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceDir {
    Left = 0,
    Right = 1,
}

/// A parser transition.
///
/// Shift carries the concept the consumed token maps to, shared by
/// reference so candidate enumeration stays cheap. Reduce attaches the
/// tail fragment's root under the node at pre-order `position` of the
/// head fragment.
#[derive(Debug, Clone)]
pub enum Action {
    Shift { rule: ShiftRule, concept: Rc<Concept> },
    Reduce { dir: ReduceDir, label: Sym, position: usize },
    Empty,
    Dummy,
}

impl Action {
    pub fn is_shift(&self) -> bool {
        matches!(self, Action::Shift { .. })
    }

    pub fn is_reduce(&self) -> bool {
        matches!(self, Action::Reduce { .. })
    }

    /// Identity features at increasing specificity. Shift and Reduce emit
    /// a three-level back-off ladder; Empty and Dummy are atomic.
    pub fn identity_features(&self) -> Vec<i32> {
        match self {
            Action::Shift { rule, concept } => vec![
                hash_features(&[TAG_SHIFT]),
                hash_features(&[TAG_SHIFT, rule.value()]),
                hash_features(&[TAG_SHIFT, rule.value(), concept.feature_hash()]),
            ],
            Action::Reduce { dir, label, position } => vec![
                hash_features(&[TAG_REDUCE, *dir as i32]),
                hash_features(&[TAG_REDUCE, *dir as i32, label.feat()]),
                hash_features(&[TAG_REDUCE, *dir as i32, label.feat(), *position as i32]),
            ],
            Action::Empty => vec![hash_features(&[TAG_EMPTY])],
            Action::Dummy => vec![hash_features(&[TAG_DUMMY])],
        }
    }

    /// Human-readable rendering for logs.
    pub fn describe(&self, lex: &Lexicon) -> String {
        match self {
            Action::Shift { rule, concept } => {
                format!(
                    "Shift({:?}, {})",
                    rule,
                    crate::graph::sexp::render(concept, &lex.interner)
                )
            }
            Action::Reduce { dir, label, position } => format!(
                "Reduce({:?}, {}, {})",
                dir,
                lex.interner.resolve(*label),
                position
            ),
            Action::Empty => "Empty".to_string(),
            Action::Dummy => "Dummy".to_string(),
        }
    }
}
