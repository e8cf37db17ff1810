// src/lexicon.rs

//! The lexical environment.
//!
//! `Lexicon` gathers everything the transition system consults that is not
//! part of a single parse: the string interner, the edge-label vocabulary
//! with its precomputed reverse-label map, the predicate/argument table,
//! word-to-predicate mappings, and the concept table harvested from
//! training data. It is built once at startup, sealed, and then threaded
//! by reference into every component; nothing reads it through globals.
//!
//! Derived string properties (predicate-likeness, ARG-label-ness, licensed
//! argument sets) are pure functions of interned identifiers and are
//! memoized in lazily populated tables. The interning table is append-only
//! so the memos never need invalidation.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::graph::Concept;
use crate::intern::{Interner, Sym};
use crate::token::Token;

/// Edge label designating attachment to the synthetic ROOT.
pub const ROOT_LABEL: &str = "root";

/// Suffix marking a reversed edge label (e.g. `ARG0-of`).
pub const REVERSE_SUFFIX: &str = "-of";

/// The concept-identification rule that produced a Shift candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftRule {
    /// Word-to-predicate table lookup.
    ToPred,
    /// Adjective-to-noun lookup.
    ToNoun,
    /// Concept-table mapping harvested from training data.
    KnownMap,
    /// Singleton fragment carrying the lemma itself.
    LeaveAsIs,
}

impl ShiftRule {
    pub fn value(self) -> i32 {
        match self {
            ShiftRule::ToPred => 0,
            ShiftRule::ToNoun => 1,
            ShiftRule::KnownMap => 2,
            ShiftRule::LeaveAsIs => 3,
        }
    }
}

/// A sense-numbered predicate with its licensed numeric argument slots.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub id: Sym,
    pub args: Vec<u32>,
}

/// Immutable-after-load lexical environment.
#[derive(Debug, Default)]
pub struct Lexicon {
    pub interner: Interner,
    /// Closed label vocabulary, sorted for reproducible enumeration.
    labels: Vec<Sym>,
    /// Reversed label -> base form, precomputed over the vocabulary.
    reverse_label: HashMap<Sym, Sym>,
    /// Registered predicates keyed by predicate name.
    predicates: HashMap<Sym, Predicate>,
    /// Lemma -> candidate predicate names, per POS role.
    pub noun_preds: HashMap<Sym, Vec<Sym>>,
    pub adj_preds: HashMap<Sym, Vec<Sym>>,
    pub verb_preds: HashMap<Sym, Vec<Sym>>,
    /// Adjective lemma -> etymological nouns.
    pub adj_nouns: HashMap<Sym, Vec<Sym>>,
    /// Lemma -> fragments observed in training data (deduplicated,
    /// corpus order).
    concept_table: HashMap<Sym, Vec<Concept>>,
    root_label: Option<Sym>,

    pred_memo: RefCell<HashMap<Sym, bool>>,
    arg_label_memo: RefCell<HashMap<Sym, bool>>,
    arg_set_memo: RefCell<HashMap<Sym, Vec<Sym>>>,
}

impl Lexicon {
    pub fn new(interner: Interner) -> Self {
        let root = interner.intern(ROOT_LABEL);
        Lexicon {
            interner,
            labels: vec![root],
            root_label: Some(root),
            ..Default::default()
        }
    }

    pub fn root_label(&self) -> Sym {
        // Set in new(); Default is only reachable through new().
        self.root_label.unwrap_or_else(|| self.interner.intern(ROOT_LABEL))
    }

    /// Registers an edge label. Idempotent.
    pub fn add_label(&mut self, label: Sym) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Records a lemma -> fragment mapping, skipping structural duplicates.
    pub fn add_concept_mapping(&mut self, lemma: Sym, concept: Concept) {
        let entry = self.concept_table.entry(lemma).or_default();
        if !entry.contains(&concept) {
            entry.push(concept);
        }
    }

    pub fn concepts_for(&self, lemma: Sym) -> &[Concept] {
        self.concept_table
            .get(&lemma)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All harvested lemma -> fragment entries, unordered.
    pub fn concept_entries(&self) -> impl Iterator<Item = (Sym, &[Concept])> + '_ {
        self.concept_table.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn register_predicate(&mut self, pred: Predicate) {
        self.predicates.insert(pred.id, pred);
    }

    pub fn predicate(&self, id: Sym) -> Option<&Predicate> {
        self.predicates.get(&id)
    }

    /// Finalizes the vocabulary: ensures every reversible label has its
    /// base counterpart registered, precomputes the reverse-label map, and
    /// sorts labels for deterministic action enumeration.
    pub fn seal(&mut self) {
        let mut reversed = Vec::new();
        for &label in &self.labels {
            let name = self.interner.resolve(label);
            if let Some(base) = name.strip_suffix(REVERSE_SUFFIX) {
                if !base.is_empty() {
                    reversed.push((label, self.interner.intern(base)));
                }
            }
        }
        for &(label, base) in &reversed {
            self.add_label(base);
            self.reverse_label.insert(label, base);
        }
        self.labels.sort_unstable();
        self.labels.dedup();
    }

    /// The closed label vocabulary (sorted after `seal`).
    pub fn labels(&self) -> &[Sym] {
        &self.labels
    }

    /// Base form of a reversed label, if `label` is reversed.
    pub fn reverse_of(&self, label: Sym) -> Option<Sym> {
        self.reverse_label.get(&label).copied()
    }

    /// Whether the identifier looks like a sense-numbered predicate
    /// ("walk-01"): contains a hyphen and is more than three characters long.
    pub fn is_predicate(&self, id: Sym) -> bool {
        if let Some(&b) = self.pred_memo.borrow().get(&id) {
            return b;
        }
        let name = self.interner.resolve(id);
        let b = name.contains('-') && name.len() > 3;
        self.pred_memo.borrow_mut().insert(id, b);
        b
    }

    /// Whether the label is a numeric-argument label (`ARG` prefix).
    pub fn is_arg_label(&self, label: Sym) -> bool {
        if let Some(&b) = self.arg_label_memo.borrow().get(&label) {
            return b;
        }
        let b = self.interner.resolve(label).starts_with("ARG");
        self.arg_label_memo.borrow_mut().insert(label, b);
        b
    }

    /// Whether `label` may attach a dependent to predicate `pred`.
    /// Unregistered predicates license any label; registered ones restrict
    /// ARG labels to their recorded argument numbers.
    pub fn allows_label(&self, pred: Sym, label: Sym) -> bool {
        let Some(entry) = self.predicates.get(&pred) else {
            return true;
        };
        if !self.is_arg_label(label) {
            return true;
        }
        if let Some(allowed) = self.arg_set_memo.borrow().get(&pred) {
            return allowed.contains(&label);
        }
        let allowed: Vec<Sym> = entry
            .args
            .iter()
            .map(|n| self.interner.intern(&format!("ARG{n}")))
            .collect();
        let ok = allowed.contains(&label);
        self.arg_set_memo.borrow_mut().insert(pred, allowed);
        ok
    }

    /// Lists every way to shift `tok` into a concept fragment, in a fixed
    /// order. Never empty: the leave-as-is fallback guarantees at least
    /// one candidate.
    pub fn identify_concepts(&self, tok: &Token) -> Vec<(ShiftRule, Concept)> {
        let mut out: Vec<(ShiftRule, Concept)> = Vec::new();
        let mut seen_ids: Vec<Sym> = Vec::new();
        let mut leave_as_is = true;
        let lemma = tok.lemma;

        if tok.is_noun() {
            if let Some(preds) = self.noun_preds.get(&lemma) {
                for &p in preds {
                    out.push((ShiftRule::ToPred, Concept::new(p)));
                    seen_ids.push(p);
                }
            }
        } else if tok.is_adj() {
            if let Some(preds) = self.adj_preds.get(&lemma) {
                for &p in preds {
                    out.push((ShiftRule::ToPred, Concept::new(p)));
                    seen_ids.push(p);
                }
            }
            if let Some(nouns) = self.adj_nouns.get(&lemma) {
                for &n in nouns {
                    if n == lemma {
                        // The lemma itself maps to a noun; leave-as-is
                        // would duplicate it.
                        leave_as_is = false;
                    }
                    out.push((ShiftRule::ToNoun, Concept::new(n)));
                    seen_ids.push(n);
                }
            }
        } else if tok.is_verb() {
            if let Some(preds) = self.verb_preds.get(&lemma) {
                for &p in preds {
                    out.push((ShiftRule::ToPred, Concept::new(p)));
                    seen_ids.push(p);
                }
            }
        }

        if leave_as_is {
            out.push((ShiftRule::LeaveAsIs, Concept::new(lemma)));
            seen_ids.push(lemma);
        }

        for concept in self.concepts_for(lemma) {
            // Multi-node fragments are always new information; singletons
            // only when no rule above already produced the same id.
            if concept.size() >= 2 || !seen_ids.contains(&concept.id) {
                out.push((ShiftRule::KnownMap, concept.clone()));
            }
        }

        debug_assert!(!out.is_empty());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::sexp;

    fn noun_token(lex: &Lexicon, lemma: &str) -> Token {
        let s = lex.interner.intern(lemma);
        Token::new(&lex.interner, s, s, lex.interner.intern("NN"), None, None)
    }

    #[test]
    fn seal_registers_base_labels_and_reverse_map() {
        let mut lex = Lexicon::new(Interner::new());
        let arg0_of = lex.interner.intern("ARG0-of");
        let msg = lex.interner.intern("mod");
        lex.add_label(arg0_of);
        lex.add_label(msg);
        lex.seal();

        let arg0 = lex.interner.intern("ARG0");
        assert_eq!(lex.reverse_of(arg0_of), Some(arg0));
        assert_eq!(lex.reverse_of(msg), None);
        assert!(lex.labels().contains(&arg0));
        let mut sorted = lex.labels().to_vec();
        sorted.sort_unstable();
        assert_eq!(lex.labels(), sorted.as_slice());
    }

    #[test]
    fn predicate_heuristic() {
        let lex = Lexicon::new(Interner::new());
        assert!(lex.is_predicate(lex.interner.intern("walk-01")));
        assert!(!lex.is_predicate(lex.interner.intern("person")));
        assert!(!lex.is_predicate(lex.interner.intern("a-b")));
        assert!(!lex.is_predicate(lex.interner.intern("-x")));
        // Memoized path returns the same answer.
        assert!(lex.is_predicate(lex.interner.intern("walk-01")));
    }

    #[test]
    fn arg_labels_restricted_to_registered_slots() {
        let mut lex = Lexicon::new(Interner::new());
        let pred = lex.interner.intern("walk-01");
        lex.register_predicate(Predicate {
            id: pred,
            args: vec![0, 1],
        });
        let arg0 = lex.interner.intern("ARG0");
        let arg3 = lex.interner.intern("ARG3");
        let manner = lex.interner.intern("manner");
        assert!(lex.allows_label(pred, arg0));
        assert!(!lex.allows_label(pred, arg3));
        assert!(lex.allows_label(pred, manner));
        // Unregistered predicates permit anything.
        let other = lex.interner.intern("run-02");
        assert!(lex.allows_label(other, arg3));
    }

    #[test]
    fn identification_always_offers_a_candidate() {
        let lex = Lexicon::new(Interner::new());
        let tok = noun_token(&lex, "gadget");
        let cands = lex.identify_concepts(&tok);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].0, ShiftRule::LeaveAsIs);
        assert_eq!(cands[0].1, Concept::new(lex.interner.intern("gadget")));
    }

    #[test]
    fn identification_merges_tables_and_dedups_singletons() {
        let mut lex = Lexicon::new(Interner::new());
        let worker = lex.interner.intern("worker");
        let work01 = lex.interner.intern("work-01");
        lex.noun_preds.insert(worker, vec![work01]);
        // A singleton concept-table entry that duplicates the rule output
        // must be suppressed; a multi-node fragment must not.
        lex.add_concept_mapping(worker, Concept::new(work01));
        let person = sexp::parse("(p / person :ARG0-of (w / work-01))", &lex.interner)
            .expect("well-formed");
        lex.add_concept_mapping(worker, person.clone());

        let tok = noun_token(&lex, "worker");
        let cands = lex.identify_concepts(&tok);
        let rules: Vec<ShiftRule> = cands.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            rules,
            vec![ShiftRule::ToPred, ShiftRule::LeaveAsIs, ShiftRule::KnownMap]
        );
        assert_eq!(cands[2].1, person);
    }
}
