// src/features/mod.rs

//! Feature templates for action scoring.
//!
//! A template reads the parse context (stack tokens, buffer head, current
//! fragments) and emits hashed context features; those are then crossed
//! with each candidate action's identity features, so one template
//! contributes `context x identity` weights per action. Templates are
//! selected by name at configuration time through [`create_set`].

mod between;
mod concept;
mod dep;
mod token;

pub use between::BetweenTokensFeature;
pub use concept::ConceptFeature;
pub use dep::DepFeature;
pub use token::TokenFeature;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;

use crate::intern::Interner;
use crate::parser::{Action, ParseSession, StateId};
use crate::weights::hash_features;

/// One source of features over a state and its candidate actions.
pub trait FeatureTemplate {
    fn name(&self) -> &'static str;

    /// Combined feature sets, one `Vec` per action, parallel to
    /// `actions`.
    fn extract(&self, sess: &ParseSession, state: StateId, actions: &[Action]) -> Vec<Vec<i32>>;

    /// Features of a single state/action pair.
    fn extract_one(&self, sess: &ParseSession, state: StateId, action: &Action) -> Vec<i32> {
        let mut sets = self.extract(sess, state, std::slice::from_ref(action));
        sets.remove(0)
    }
}

/// Hashes one context feature: template name, slot name, then values.
fn feat(interner: &Interner, template: &str, name: &str, vals: &[i32]) -> i32 {
    let mut xs = Vec::with_capacity(vals.len() + 2);
    xs.push(interner.intern(template).feat());
    xs.push(interner.intern(name).feat());
    xs.extend_from_slice(vals);
    hash_features(&xs)
}

/// Placeholder value for an absent context slot. Interned, so it cannot
/// collide with any real identifier's value.
fn empty_feat(interner: &Interner) -> i32 {
    interner.intern("<EMPTY>").feat()
}

/// Crosses every context feature with every identity feature of each
/// action; the context feature hashes first.
fn combine(actions: &[Action], context: &[i32]) -> Vec<Vec<i32>> {
    actions
        .iter()
        .map(|action| {
            let mut out = Vec::new();
            for af in action.identity_features() {
                for &f in context {
                    out.push(hash_features(&[f, af]));
                }
            }
            out
        })
        .collect()
}

type Ctor = fn() -> Box<dyn FeatureTemplate>;

static REGISTRY: Lazy<Vec<(&'static str, Ctor)>> = Lazy::new(|| {
    vec![
        ("lemma", || Box::new(TokenFeature::lemma()) as Box<dyn FeatureTemplate>),
        ("pos", || Box::new(TokenFeature::pos()) as Box<dyn FeatureTemplate>),
        ("suffix2", || Box::new(TokenFeature::suffix(2)) as Box<dyn FeatureTemplate>),
        ("suffix3", || Box::new(TokenFeature::suffix(3)) as Box<dyn FeatureTemplate>),
        ("dep", || Box::new(DepFeature) as Box<dyn FeatureTemplate>),
        ("concept", || Box::new(ConceptFeature) as Box<dyn FeatureTemplate>),
        ("between", || Box::new(BetweenTokensFeature) as Box<dyn FeatureTemplate>),
    ]
});

/// Every registered template name, in registry order.
pub fn known_features() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Instantiates the template registered under `name`.
pub fn create(name: &str) -> Result<Box<dyn FeatureTemplate>> {
    for (n, ctor) in REGISTRY.iter() {
        if *n == name {
            return Ok(ctor());
        }
    }
    bail!(
        "unknown feature '{}' (known: {})",
        name,
        known_features().join(", ")
    );
}

/// Instantiates a full template set from configured names.
pub fn create_set<S: AsRef<str>>(names: &[S]) -> Result<Vec<Box<dyn FeatureTemplate>>> {
    names.iter().map(|n| create(n.as_ref())).collect()
}

#[cfg(test)]
mod tests;
