// src/features/between.rs

//! Lemma and POS of every token strictly between s1 and s0. With no s1
//! the context is empty and the template contributes nothing.

use crate::features::{combine, feat, FeatureTemplate};
use crate::parser::{Action, ParseSession, StateId};

pub struct BetweenTokensFeature;

impl FeatureTemplate for BetweenTokensFeature {
    fn name(&self) -> &'static str {
        "between"
    }

    fn extract(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<Vec<i32>> {
        let interner = &sess.lexicon().interner;
        let toks = sess.tokens();

        let mut context = Vec::new();
        if let Some(s1) = sess.s1(state) {
            let s0 = sess.s0(state);
            for i in (s1 + 1)..s0 {
                context.push(feat(interner, "between", "s1_s0_w", &[toks[i].lemma.feat()]));
                context.push(feat(interner, "between", "s1_s0_t", &[toks[i].pos.feat()]));
            }
        }
        combine(actions, &context)
    }
}
