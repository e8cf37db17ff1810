// src/decoder.rs

//! Beam-search decoding.

use std::cmp::Ordering;

use anyhow::Result;
use log::warn;

use crate::parser::{Action, ParseSession, StateId};
use crate::scorer::Scorer;

/// Frontier beam search: all hypotheses advance in lock step, the best
/// `beam_size` successors survive each step, and the search stops when
/// the best hypothesis is terminal.
pub struct BeamDecoder {
    beam_size: usize,
}

impl BeamDecoder {
    pub fn new(beam_size: usize) -> Self {
        BeamDecoder {
            beam_size: beam_size.max(1),
        }
    }

    pub fn beam_size(&self) -> usize {
        self.beam_size
    }

    /// Decodes from the session's initial state, returning the best
    /// terminal state.
    pub fn decode(&self, sess: &mut ParseSession, scorer: &dyn Scorer) -> Result<StateId> {
        let mut frontier = vec![sess.initial()];
        while !sess.is_final(frontier[0]) {
            let mut cands: Vec<(StateId, Action, f32)> = Vec::new();
            for &state in &frontier {
                let actions = sess.valid_actions(state);
                let scores = scorer.score(sess, state, &actions);
                let base = sess.node(state).score;
                for (action, score) in actions.into_iter().zip(scores) {
                    cands.push((state, action, base + score));
                }
            }
            if cands.is_empty() {
                warn!("beam ran out of candidate actions before a terminal state");
                return Ok(frontier[0]);
            }

            // Stable sort keeps enumeration order among ties.
            cands.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
            cands.truncate(self.beam_size);

            let mut next = Vec::with_capacity(cands.len());
            for (state, action, score) in cands {
                next.push(sess.advance(state, action, score)?);
            }
            frontier = next;
        }
        Ok(frontier[0])
    }
}
