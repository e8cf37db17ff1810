// src/token.rs

//! Annotated input tokens.
//!
//! A token is an input position with interned identifiers for its surface
//! form, lemma, and coarse part of speech, plus dependency annotation from
//! an upstream linguistic pipeline. Supervised tokens additionally carry a
//! gold concept fragment and the gold attachment (head token, edge label,
//! pre-order position in the head fragment). Tokens are immutable once
//! constructed; index 0 of every sequence is the synthetic ROOT token.

use bitflags::bitflags;

use crate::graph::Concept;
use crate::intern::{Interner, Sym};

/// Printable form of the synthetic root token.
pub const ROOT_TOKEN: &str = "<ROOT>";

bitflags! {
    /// Coarse part-of-speech role flags derived from the POS tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PosFlags: u8 {
        const VERB = 1 << 0;
        const NOUN = 1 << 1;
        const ADJ  = 1 << 2;
    }
}

impl PosFlags {
    /// Penn-treebank style prefixes: VB* verbs, NN* nouns, JJ* adjectives.
    fn from_pos(pos: &str) -> Self {
        let mut flags = PosFlags::empty();
        if pos.starts_with("VB") {
            flags |= PosFlags::VERB;
        }
        if pos.starts_with("NN") {
            flags |= PosFlags::NOUN;
        }
        if pos.starts_with("JJ") {
            flags |= PosFlags::ADJ;
        }
        flags
    }
}

/// Gold supervision attached to an aligned token.
#[derive(Debug, Clone)]
pub struct Gold {
    /// The concept fragment this token invokes.
    pub concept: Concept,
    /// Token index of the gold head (0 is ROOT).
    pub head: usize,
    /// Gold edge label.
    pub label: Sym,
    /// Pre-order attachment position within the head token's fragment.
    pub position: usize,
}

/// One annotated input position.
#[derive(Debug, Clone)]
pub struct Token {
    pub surf: Sym,
    pub lemma: Sym,
    pub pos: Sym,
    /// Dependency head token index, if annotated.
    pub dep_head: Option<usize>,
    /// Dependency relation, if annotated.
    pub dep_rel: Option<Sym>,
    pub flags: PosFlags,
    /// Gold alignment, present only on supervised, aligned tokens.
    pub gold: Option<Gold>,
}

impl Token {
    /// The synthetic ROOT token occupying index 0.
    pub fn root(interner: &Interner) -> Self {
        let id = interner.intern(ROOT_TOKEN);
        Token {
            surf: id,
            lemma: id,
            pos: id,
            dep_head: None,
            dep_rel: None,
            flags: PosFlags::empty(),
            gold: None,
        }
    }

    pub fn new(
        interner: &Interner,
        surf: Sym,
        lemma: Sym,
        pos: Sym,
        dep_head: Option<usize>,
        dep_rel: Option<Sym>,
    ) -> Self {
        let flags = PosFlags::from_pos(&interner.resolve(pos));
        Token {
            surf,
            lemma,
            pos,
            dep_head,
            dep_rel,
            flags,
            gold: None,
        }
    }

    pub fn with_gold(mut self, gold: Gold) -> Self {
        self.gold = Some(gold);
        self
    }

    pub fn is_verb(&self) -> bool {
        self.flags.contains(PosFlags::VERB)
    }

    pub fn is_noun(&self) -> bool {
        self.flags.contains(PosFlags::NOUN)
    }

    pub fn is_adj(&self) -> bool {
        self.flags.contains(PosFlags::ADJ)
    }
}
