// src/scorer.rs

//! Action scoring.

use crate::features::FeatureTemplate;
use crate::parser::{Action, ParseSession, StateId};
use crate::weights::Weights;

/// Assigns one score per candidate action of a state.
pub trait Scorer {
    fn score(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<f32>;
}

/// Linear model: the sum of learned weights over every feature each
/// template extracts for the action.
pub struct LinearScorer<'a, W: Weights> {
    templates: &'a [Box<dyn FeatureTemplate>],
    weights: &'a W,
}

impl<'a, W: Weights> LinearScorer<'a, W> {
    pub fn new(templates: &'a [Box<dyn FeatureTemplate>], weights: &'a W) -> Self {
        LinearScorer { templates, weights }
    }
}

impl<W: Weights> Scorer for LinearScorer<'_, W> {
    fn score(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<f32> {
        let mut scores = vec![0.0; actions.len()];
        for template in self.templates {
            let sets = template.extract(sess, state, actions);
            for (score, feats) in scores.iter_mut().zip(&sets) {
                for &f in feats {
                    *score += self.weights.get(f);
                }
            }
        }
        scores
    }
}
