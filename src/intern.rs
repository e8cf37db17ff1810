// src/intern.rs

//! Process-wide string interning.
//!
//! Every string the parser touches (surface forms, lemmas, POS tags, edge
//! labels, concept names, feature names) is reduced to a small integer
//! [`Sym`] through an [`Interner`]. The table is append-only: symbols are
//! never removed or renumbered, so a `Sym` minted at load time stays valid
//! for the whole run and can be persisted as a plain integer.
//!
//! The interner uses interior mutability because feature extraction mints
//! new symbols (e.g. lemma suffixes) while the rest of the lexicon is
//! borrowed immutably. The execution model is single-threaded per run, so
//! a `RefCell` suffices.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// An interned string identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

impl Sym {
    /// Raw index into the interner table.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The symbol as a feature value for hashing.
    pub fn feat(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Inner {
    str2id: HashMap<String, Sym>,
    id2str: Vec<String>,
}

/// Append-only bidirectional string/symbol table.
#[derive(Debug, Default)]
pub struct Interner {
    inner: RefCell<Inner>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an interner from a dumped table. Entry order defines ids.
    pub fn from_strings(strings: Vec<String>) -> Self {
        let interner = Interner::new();
        for s in &strings {
            interner.intern(s);
        }
        interner
    }

    /// Returns the symbol for `s`, minting a new one if unseen.
    pub fn intern(&self, s: &str) -> Sym {
        let mut inner = self.inner.borrow_mut();
        if let Some(&sym) = inner.str2id.get(s) {
            return sym;
        }
        let sym = Sym(inner.id2str.len() as u32);
        inner.id2str.push(s.to_owned());
        inner.str2id.insert(s.to_owned(), sym);
        sym
    }

    /// The string behind `sym`. Unknown symbols resolve to an empty string,
    /// which cannot be the printable form of any minted symbol.
    pub fn resolve(&self, sym: Sym) -> String {
        self.inner
            .borrow()
            .id2str
            .get(sym.index())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().id2str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the table in id order, for persistence.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.borrow().id2str.clone()
    }
}
