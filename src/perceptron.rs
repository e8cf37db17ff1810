// src/perceptron.rs

//! Structured-perceptron training with weight averaging.
//!
//! Each example is decoded with the current weights; the gold derivation
//! is replayed with the oracle. The update targets the max-violation
//! prefix: the step where the predicted score most exceeds the gold
//! score, with every step up to and including it updated by +1 on gold
//! features and -1 on predicted ones. A second accumulator collects the
//! same updates scaled by the example counter `t`, so a checkpoint can
//! emit the averaged weights `w - w_avg / t`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::decoder::BeamDecoder;
use crate::features::FeatureTemplate;
use crate::lexicon::Lexicon;
use crate::parser::{Action, ParseSession, StateId};
use crate::scorer::{LinearScorer, Scorer};
use crate::token::Token;
use crate::weights::{ArrayWeights, Weights};

pub struct Perceptron {
    templates: Vec<Box<dyn FeatureTemplate>>,
    decoder: BeamDecoder,
    ws: ArrayWeights,
    ws_avg: ArrayWeights,
    t: u32,
}

/// One perceptron step over flat feature lists: gold features go up by 1,
/// predicted ones down by 1; the averaging accumulator moves by `t`.
pub fn apply_update<W: Weights>(
    ws: &mut W,
    ws_avg: &mut W,
    t: u32,
    gold_feats: &[i32],
    pred_feats: &[i32],
) {
    for &f in gold_feats {
        ws.add(f, 1.0);
        ws_avg.add(f, t as f32);
    }
    for &f in pred_feats {
        ws.add(f, -1.0);
        ws_avg.add(f, -(t as f32));
    }
}

impl Perceptron {
    pub fn new(
        templates: Vec<Box<dyn FeatureTemplate>>,
        decoder: BeamDecoder,
        feat_size: usize,
    ) -> Self {
        Perceptron {
            templates,
            decoder,
            ws: ArrayWeights::new(feat_size),
            ws_avg: ArrayWeights::new(feat_size),
            t: 1,
        }
    }

    pub fn weights(&self) -> &ArrayWeights {
        &self.ws
    }

    /// Runs `epochs` passes over the corpus, checkpointing the averaged
    /// weights as `iter1`, `iter2`, ... under `dest` after each pass.
    pub fn train(
        &mut self,
        lex: &Lexicon,
        corpus: &[Vec<Token>],
        epochs: usize,
        dest: Option<&Path>,
    ) -> Result<()> {
        if let Some(dir) = dest {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating model directory {}", dir.display()))?;
        }
        for template in &self.templates {
            info!("using feature: {}", template.name());
        }

        for epoch in 1..=epochs {
            info!("epoch {epoch}/{epochs}");
            for (n, toks) in corpus.iter().enumerate() {
                debug!("example {n}");
                self.update_example(lex, toks)
                    .with_context(|| format!("training example {n}"))?;
            }
            if let Some(dir) = dest {
                let path = dir.join(format!("iter{epoch}"));
                self.ws.save_averaged(&path, &self.ws_avg, self.t)?;
                info!("checkpointed {}", path.display());
            }
        }
        Ok(())
    }

    fn update_example(&mut self, lex: &Lexicon, toks: &[Token]) -> Result<()> {
        let mut sess = ParseSession::new(toks, lex);

        // Replay the oracle, scoring each gold step with current weights
        // so the trajectories are comparable.
        let mut gold = sess.initial();
        while !sess.is_final(gold) {
            let Some(action) = sess.gold_action(gold)? else {
                warn!("oracle failed (non-projective attachments), skipping example");
                return Ok(());
            };
            debug!("gold action: {}", action.describe(lex));
            let step = {
                let scorer = LinearScorer::new(&self.templates, &self.ws);
                scorer.score(&sess, gold, std::slice::from_ref(&action))[0]
            };
            let score = sess.node(gold).score + step;
            gold = sess.advance(gold, action, score)?;
        }

        let pred = {
            let scorer = LinearScorer::new(&self.templates, &self.ws);
            self.decoder.decode(&mut sess, &scorer)?
        };

        let gold_seq = sess.state_sequence(gold);
        let pred_seq = sess.state_sequence(pred);
        if gold_seq.is_empty() || pred_seq.is_empty() {
            // A ROOT-only record parses in zero actions; nothing to learn.
            debug!("empty derivation, skipping example");
            return Ok(());
        }

        // Max-violation step; ties go to the latest step. Trajectories
        // can differ in length when the decoder discards tokens the
        // oracle keeps, so the scan stops at the shorter one.
        let mut max_v = f32::NEG_INFINITY;
        let mut max_k = 0;
        for k in 1..gold_seq.len().min(pred_seq.len()) {
            let v = sess.node(pred_seq[k]).score - sess.node(gold_seq[k]).score;
            if v >= max_v {
                max_v = v;
                max_k = k;
            }
        }

        for k in (0..=max_k).rev() {
            let (gold_feats, pred_feats) =
                self.step_features(&sess, gold_seq[k], pred_seq[k])?;
            apply_update(&mut self.ws, &mut self.ws_avg, self.t, &gold_feats, &pred_feats);
        }
        self.t += 1;
        Ok(())
    }

    /// Features of the actions taken into the gold and predicted states
    /// at one step, flattened over all templates.
    fn step_features(
        &self,
        sess: &ParseSession,
        gold: StateId,
        pred: StateId,
    ) -> Result<(Vec<i32>, Vec<i32>)> {
        let mut gold_feats = Vec::new();
        let mut pred_feats = Vec::new();
        for (state, feats) in [(gold, &mut gold_feats), (pred, &mut pred_feats)] {
            let node = sess.node(state);
            let prev = node.prev.context("update step on the initial state")?;
            let action: &Action = node
                .prev_act
                .as_ref()
                .context("update step without an action")?;
            for template in &self.templates {
                feats.extend(template.extract_one(sess, prev, action));
            }
        }
        Ok((gold_feats, pred_feats))
    }
}
