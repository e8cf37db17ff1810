// src/parser/mod.rs

//! The transition system.
//!
//! A parse is a sequence of [`Action`]s over a left-to-right buffer of
//! tokens and a stack of concept fragments. [`ParseSession`] owns every
//! state reached while exploring one sentence; states are immutable
//! records linked by arena indices, so beam search and gold replay can
//! branch from any state without copying histories.

mod action;
mod state;

pub use action::{Action, ReduceDir};
pub use state::{ParseSession, StateId, StateNode};
