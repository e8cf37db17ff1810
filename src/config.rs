// src/config.rs

//! Run configuration.
//!
//! One struct covers both the training invocation and the metadata a
//! model directory carries, so a saved model replays parsing with the
//! exact feature set and feature-space size it was trained with. Every
//! field has a default; `config.json` may specify any subset.

use serde::{Deserialize, Serialize};

/// Which weight store backs the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightsKind {
    /// Fixed-size hashed array; the usual choice.
    #[default]
    Array,
    /// Exact map, no collisions, unbounded memory.
    Map,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // Apply default values for any field missing in config.json.
pub struct TrainConfig {
    /// Passes over the training corpus.
    pub iterations: usize,
    /// Beam width for decoding, in training and at parse time.
    pub beam_size: usize,
    /// log2 of the hashed feature-space size.
    pub feature_bits: u32,
    /// Feature template names, resolved via the registry.
    pub features: Vec<String>,
    pub weights: WeightsKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            iterations: 5,
            beam_size: 8,
            feature_bits: 22,
            features: crate::features::known_features()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            weights: WeightsKind::default(),
        }
    }
}

impl TrainConfig {
    /// Size of the hashed weight array.
    pub fn feat_size(&self) -> usize {
        1usize << self.feature_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_every_registered_feature() {
        let config = TrainConfig::default();
        assert_eq!(config.features, crate::features::known_features());
        assert_eq!(config.feat_size(), 1 << 22);
        assert_eq!(config.weights, WeightsKind::Array);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"beam_size": 3, "weights": "map"}"#).expect("parse");
        assert_eq!(config.beam_size, 3);
        assert_eq!(config.weights, WeightsKind::Map);
        assert_eq!(config.iterations, TrainConfig::default().iterations);
    }

    #[test]
    fn json_roundtrip() {
        let mut config = TrainConfig::default();
        config.features = vec!["lemma".to_string(), "dep".to_string()];
        config.feature_bits = 18;
        let json = serde_json::to_string(&config).expect("serialize");
        let back: TrainConfig = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, config);
    }
}
