// src/features/dep.rs

//! Dependency-annotation features: relation of s0/s1/b0 plus the signed
//! offset from each anchor to its dependency head. Tokens without a head
//! contribute offset -1.

use crate::features::{combine, empty_feat, feat, FeatureTemplate};
use crate::parser::{Action, ParseSession, StateId};
use crate::token::Token;

pub struct DepFeature;

fn rel(tok: &Token) -> i32 {
    tok.dep_rel.map_or(-1, |r| r.feat())
}

fn offset(tok: &Token, anchor: usize) -> i32 {
    match tok.dep_head {
        Some(head) => head as i32 - anchor as i32,
        None => -1,
    }
}

impl FeatureTemplate for DepFeature {
    fn name(&self) -> &'static str {
        "dep"
    }

    fn extract(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<Vec<i32>> {
        let interner = &sess.lexicon().interner;
        let toks = sess.tokens();
        let empty = empty_feat(interner);

        let s0_idx = sess.s0(state);
        let s1_idx = sess.s1(state);
        let b0_idx = sess.b0(state);

        let s0_rel = rel(&toks[s0_idx]);
        let s1_rel = s1_idx.map_or(empty, |i| rel(&toks[i]));
        let b0_rel = b0_idx.map_or(empty, |i| rel(&toks[i]));

        let s0_off = offset(&toks[s0_idx], s0_idx);
        let s1_off = s1_idx.map_or(empty, |i| offset(&toks[i], i));
        let b0_off = b0_idx.map_or(empty, |i| offset(&toks[i], i));

        let context = vec![
            feat(interner, "dep", "s0_rel", &[s0_rel]),
            feat(interner, "dep", "s1_rel", &[s1_rel]),
            feat(interner, "dep", "b0_rel", &[b0_rel]),
            feat(interner, "dep", "s0_off", &[s0_off]),
            feat(interner, "dep", "s1_off", &[s1_off]),
            feat(interner, "dep", "b0_off", &[b0_off]),
        ];
        combine(actions, &context)
    }
}
