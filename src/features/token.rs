// src/features/token.rs

//! Per-token context features: lemma, POS tag, lemma suffixes.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::features::{combine, empty_feat, feat, FeatureTemplate};
use crate::intern::Sym;
use crate::parser::{Action, ParseSession, StateId};
use crate::token::Token;

enum Slot {
    Lemma,
    Pos,
    Suffix(usize),
}

/// A template reading one attribute of the s0/s1/b0 tokens, emitting the
/// unigram slots plus the s0_s1 and s0_b0 pairs.
pub struct TokenFeature {
    name: &'static str,
    slot: Slot,
    // Suffix ids per lemma, filled on demand.
    suffix_memo: RefCell<HashMap<Sym, i32>>,
}

impl TokenFeature {
    pub fn lemma() -> Self {
        TokenFeature {
            name: "lemma",
            slot: Slot::Lemma,
            suffix_memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn pos() -> Self {
        TokenFeature {
            name: "pos",
            slot: Slot::Pos,
            suffix_memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn suffix(len: usize) -> Self {
        let name = match len {
            2 => "suffix2",
            3 => "suffix3",
            _ => "suffix",
        };
        TokenFeature {
            name,
            slot: Slot::Suffix(len),
            suffix_memo: RefCell::new(HashMap::new()),
        }
    }

    fn value(&self, sess: &ParseSession, tok: &Token) -> i32 {
        match self.slot {
            Slot::Lemma => tok.lemma.feat(),
            Slot::Pos => tok.pos.feat(),
            Slot::Suffix(len) => self.suffix_of(sess, tok.lemma, len),
        }
    }

    fn suffix_of(&self, sess: &ParseSession, lemma: Sym, len: usize) -> i32 {
        if let Some(&v) = self.suffix_memo.borrow().get(&lemma) {
            return v;
        }
        let interner = &sess.lexicon().interner;
        let s = interner.resolve(lemma);
        let chars: Vec<char> = s.chars().collect();
        let start = chars.len().saturating_sub(len);
        let suffix: String = chars[start..].iter().collect();
        let v = interner.intern(&suffix).feat();
        self.suffix_memo.borrow_mut().insert(lemma, v);
        v
    }
}

impl FeatureTemplate for TokenFeature {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<Vec<i32>> {
        let interner = &sess.lexicon().interner;
        let toks = sess.tokens();
        let empty = empty_feat(interner);

        let s0 = self.value(sess, &toks[sess.s0(state)]);
        let s1 = sess
            .s1(state)
            .map_or(empty, |i| self.value(sess, &toks[i]));
        let b0 = sess
            .b0(state)
            .map_or(empty, |i| self.value(sess, &toks[i]));

        let context = vec![
            feat(interner, self.name, "s0", &[s0]),
            feat(interner, self.name, "s1", &[s1]),
            feat(interner, self.name, "b0", &[b0]),
            feat(interner, self.name, "s0_s1", &[s0, s1]),
            feat(interner, self.name, "s0_b0", &[s0, b0]),
        ];
        combine(actions, &context)
    }
}
