// src/weights.rs

//! Feature hashing and weight storage.
//!
//! Features are arbitrary integer tuples reduced to a single `i32` by an
//! order-sensitive avalanche mix (Jenkins one-at-a-time). [`ArrayWeights`]
//! folds that value into a fixed-size array by `|hash| mod size`; hash
//! collisions are a deliberate capacity/accuracy trade-off, never an
//! error. [`MapWeights`] is the exact alternative, keyed by the raw hash.
//!
//! Persistence is a little-endian binary record: a sparse dump of
//! `(i32 index, f32 value)` pairs for every non-zero cell, preceded for
//! the array store by an `i32` size field. A fill-factor statistic is
//! written alongside each checkpoint.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;

/// Order-sensitive mix of an integer tuple into one feature value.
///
/// Jenkins one-at-a-time, seed 0; wrapping arithmetic, arithmetic right
/// shifts. Argument order matters and must be kept stable by callers.
pub fn hash_features(vals: &[i32]) -> i32 {
    let mut acc: i32 = 0;
    for &n in vals {
        acc = acc.wrapping_add(n);
        acc = acc.wrapping_add(acc << 10);
        acc ^= acc >> 6;
    }
    acc = acc.wrapping_add(acc << 3);
    acc ^= acc >> 11;
    acc = acc.wrapping_add(acc << 15);
    acc
}

/// Additive feature-weight storage.
pub trait Weights {
    fn get(&self, feature: i32) -> f32;
    fn add(&mut self, feature: i32, delta: f32);
}

/// Fixed-size hashed weight store.
#[derive(Debug, Clone)]
pub struct ArrayWeights {
    weights: Vec<f32>,
}

impl ArrayWeights {
    pub fn new(size: usize) -> Self {
        ArrayWeights {
            weights: vec![0.0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.weights.len()
    }

    fn index(&self, feature: i32) -> usize {
        // i64 math so i32::MIN has a well-defined absolute value.
        ((feature as i64).unsigned_abs() % self.weights.len() as u64) as usize
    }

    /// Writes the averaged weights `w[i] - avg[i] / t` as a sparse binary
    /// record, plus a `.load_factor` sidecar reporting the fill factor.
    pub fn save_averaged(&self, path: &Path, avg: &ArrayWeights, t: u32) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating weights file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all(&(self.weights.len() as i32).to_le_bytes())?;

        let mut used = 0usize;
        for (i, &w) in self.weights.iter().enumerate() {
            let value = w - avg.weights[i] / t as f32;
            if value != 0.0 {
                out.write_all(&(i as i32).to_le_bytes())?;
                out.write_all(&value.to_le_bytes())?;
                used += 1;
            }
        }
        out.flush()?;

        let stats = format!(
            "{:.3}% [{}/{}]\n",
            used as f64 * 100.0 / self.weights.len() as f64,
            used,
            self.weights.len()
        );
        let sidecar = sidecar_path(path, "load_factor");
        fs::write(&sidecar, stats)
            .with_context(|| format!("writing {}", sidecar.display()))?;
        debug!(
            "checkpointed {} non-zero weights of {} to {}",
            used,
            self.weights.len(),
            path.display()
        );
        Ok(())
    }

    /// Loads a sparse dump written by [`save_averaged`]: zero-fills an
    /// array of the declared size, then applies the recorded cells.
    pub fn load(path: &Path) -> Result<Self> {
        let mut buf = Vec::new();
        File::open(path)
            .with_context(|| format!("opening weights file {}", path.display()))?
            .read_to_end(&mut buf)?;
        if buf.len() < 4 || (buf.len() - 4) % 8 != 0 {
            bail!("weights file {} is truncated", path.display());
        }
        let size = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if size <= 0 {
            bail!("weights file {} declares size {}", path.display(), size);
        }
        let mut ws = ArrayWeights::new(size as usize);
        for chunk in buf[4..].chunks_exact(8) {
            let i = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let v = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            ws.add(i, v);
        }
        Ok(ws)
    }
}

impl Weights for ArrayWeights {
    fn get(&self, feature: i32) -> f32 {
        self.weights[self.index(feature)]
    }

    fn add(&mut self, feature: i32, delta: f32) {
        let i = self.index(feature);
        self.weights[i] += delta;
    }
}

/// Exact mapping-backed weight store. Absent keys read as zero.
#[derive(Debug, Clone, Default)]
pub struct MapWeights {
    weights: HashMap<i32, f32>,
}

impl MapWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sparse averaged dump; no leading size field (the store has no fixed
    /// capacity), with a `.feat_num` sidecar carrying the non-zero count.
    pub fn save_averaged(&self, path: &Path, avg: &MapWeights, t: u32) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating weights file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        let mut used = 0usize;
        // Deterministic record order.
        let mut keys: Vec<i32> = self.weights.keys().copied().collect();
        keys.sort_unstable();
        for i in keys {
            let value = self.get(i) - avg.get(i) / t as f32;
            if value != 0.0 {
                out.write_all(&i.to_le_bytes())?;
                out.write_all(&value.to_le_bytes())?;
                used += 1;
            }
        }
        out.flush()?;

        let sidecar = sidecar_path(path, "feat_num");
        fs::write(&sidecar, format!("{used}\n"))
            .with_context(|| format!("writing {}", sidecar.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut buf = Vec::new();
        File::open(path)
            .with_context(|| format!("opening weights file {}", path.display()))?
            .read_to_end(&mut buf)?;
        if buf.len() % 8 != 0 {
            bail!("weights file {} is truncated", path.display());
        }
        let mut ws = MapWeights::new();
        for chunk in buf.chunks_exact(8) {
            let i = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let v = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            ws.add(i, v);
        }
        Ok(ws)
    }
}

impl Weights for MapWeights {
    fn get(&self, feature: i32) -> f32 {
        self.weights.get(&feature).copied().unwrap_or(0.0)
    }

    fn add(&mut self, feature: i32, delta: f32) {
        *self.weights.entry(feature).or_insert(0.0) += delta;
    }
}

fn sidecar_path(path: &Path, ext: &str) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_owned()).unwrap_or_default();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_order_sensitive_and_deterministic() {
        assert_eq!(hash_features(&[1, 2]), hash_features(&[1, 2]));
        assert_ne!(hash_features(&[1, 2]), hash_features(&[2, 1]));
        assert_ne!(hash_features(&[1]), hash_features(&[1, 0]));
    }

    #[test]
    fn hash_matches_reference_values() {
        // Spot checks computed by hand from the mix definition.
        assert_eq!(hash_features(&[]), 0);
        let one = {
            let mut acc: i32 = 1;
            acc = acc.wrapping_add(acc << 10);
            acc ^= acc >> 6;
            acc = acc.wrapping_add(acc << 3);
            acc ^= acc >> 11;
            acc.wrapping_add(acc << 15)
        };
        assert_eq!(hash_features(&[1]), one);
    }

    #[test]
    fn array_weights_fold_by_modulus() {
        let mut ws = ArrayWeights::new(10);
        ws.add(3, 1.5);
        assert_eq!(ws.get(3), 1.5);
        // Negative features fold by absolute value.
        ws.add(-3, 1.0);
        assert_eq!(ws.get(3), 2.5);
        // Collision at the modulus is accepted arithmetic, not an error.
        ws.add(13, 1.0);
        assert_eq!(ws.get(3), 3.5);
        // i32::MIN must not panic.
        ws.add(i32::MIN, 1.0);
        let _ = ws.get(i32::MIN);
    }

    #[test]
    fn map_weights_default_to_zero() {
        let mut ws = MapWeights::new();
        assert_eq!(ws.get(42), 0.0);
        ws.add(42, 0.5);
        ws.add(42, 0.25);
        assert_eq!(ws.get(42), 0.75);
    }

    #[test]
    fn array_save_load_roundtrip_applies_averaging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("iter1");

        let mut live = ArrayWeights::new(16);
        let mut avg = ArrayWeights::new(16);
        live.add(1, 3.0);
        avg.add(1, 4.0);
        live.add(5, -2.0);
        let t = 2;
        live.save_averaged(&path, &avg, t).expect("save");

        let loaded = ArrayWeights::load(&path).expect("load");
        assert_eq!(loaded.size(), 16);
        assert_eq!(loaded.get(1), 3.0 - 4.0 / 2.0);
        assert_eq!(loaded.get(5), -2.0);
        assert_eq!(loaded.get(2), 0.0);

        let sidecar = path.with_file_name("iter1.load_factor");
        let stats = std::fs::read_to_string(sidecar).expect("sidecar");
        assert!(stats.contains("[2/16]"), "unexpected stats: {stats}");
    }

    #[test]
    fn map_save_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ws");
        let mut live = MapWeights::new();
        live.add(7, 1.0);
        live.add(-9, 2.5);
        live.save_averaged(&path, &MapWeights::new(), 1).expect("save");
        let loaded = MapWeights::load(&path).expect("load");
        assert_eq!(loaded.get(7), 1.0);
        assert_eq!(loaded.get(-9), 2.5);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn truncated_weight_files_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad");
        std::fs::write(&path, [0u8; 7]).expect("write");
        assert!(ArrayWeights::load(&path).is_err());
        assert!(MapWeights::load(&path).is_err());
    }
}
