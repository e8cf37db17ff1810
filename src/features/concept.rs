// src/features/concept.rs

//! Fragment-root concept features for the top two stack entries.

use crate::features::{combine, empty_feat, feat, FeatureTemplate};
use crate::parser::{Action, ParseSession, StateId};

pub struct ConceptFeature;

impl FeatureTemplate for ConceptFeature {
    fn name(&self) -> &'static str {
        "concept"
    }

    fn extract(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<Vec<i32>> {
        let interner = &sess.lexicon().interner;
        let empty = empty_feat(interner);

        let s0 = sess.concept(state).map_or(empty, |c| c.id.feat());
        let s1 = sess.left_concept(state).map_or(empty, |c| c.id.feat());

        let context = vec![
            feat(interner, "concept", "s0", &[s0]),
            feat(interner, "concept", "s1", &[s1]),
            feat(interner, "concept", "s0_s1", &[s0, s1]),
        ];
        combine(actions, &context)
    }
}
