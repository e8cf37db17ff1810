// src/io/mod.rs

//! Corpus and model-directory persistence.
//!
//! `corpus` reads JAMR-style alignment blocks into token sequences and
//! harvests the label vocabulary and concept table while doing so.
//! `model` persists everything a trained parser needs to run again: the
//! interner dump, labels, concept table, the lexical mapping files, and
//! run metadata.

pub mod corpus;
pub mod model;

#[cfg(test)]
mod tests;
