// src/graph/mod.rs

//! Concept-graph fragments.
//!
//! A [`Concept`] is a rooted, ordered tree of interned node labels with
//! labeled edges. Fragments serve both as the parser's output and as the
//! gold-alignment representation during training. Nodes are addressed by
//! 0-indexed pre-order traversal rank, which is also the order used by the
//! s-expression serialization in [`sexp`].

mod concept;
pub mod sexp;

pub use concept::Concept;

/// Node name of the placeholder concept produced for inputs where no
/// token contributed a fragment.
pub const EMPTY_CONCEPT: &str = "amr-empty";
