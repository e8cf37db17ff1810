// src/graph/sexp.rs

//! S-expression rendering and parsing for concept fragments.
//!
//! The canonical form is `(v / name :label child ...)` where `v` is a
//! variable derived from the first character of the node name, suffixed
//! with a counter on repeats. Quoted string literals render bare, without
//! tree structure. Parsing is tolerant: any structural mismatch yields
//! `None` rather than an error, because corpora carry a known number of
//! corrupt records that must be skippable.

use std::collections::HashMap;

use crate::graph::Concept;
use crate::intern::{Interner, Sym};

/// Renders `concept` in the canonical parenthesized form.
pub fn render(concept: &Concept, interner: &Interner) -> String {
    let mut vars: HashMap<String, u32> = HashMap::new();
    let mut out = String::new();
    render_into(concept, interner, &mut vars, &mut out);
    out
}

fn render_into(
    concept: &Concept,
    interner: &Interner,
    vars: &mut HashMap<String, u32>,
    out: &mut String,
) {
    let name = interner.resolve(concept.id);
    if name.starts_with('"') {
        // String literal leaf; no variable, no parens.
        out.push_str(&name);
        return;
    }

    let var: String = name.chars().take(1).collect();
    out.push('(');
    out.push_str(&var);
    let count = vars.get(&var).copied().unwrap_or(0) + 1;
    if count > 1 {
        out.push_str(&count.to_string());
    }
    vars.insert(var, count);
    out.push_str(" / ");
    out.push_str(&name);
    for (label, child) in &concept.children {
        out.push_str(" :");
        out.push_str(&interner.resolve(*label));
        out.push(' ');
        render_into(child, interner, vars, out);
    }
    out.push(')');
}

#[derive(Debug)]
enum Item {
    Open,
    Label(Sym),
    Name(Sym),
    Node(Concept),
}

/// Parses the canonical form back into a fragment.
///
/// Returns `None` for any malformed input, including unbalanced
/// parentheses, stray tokens, and unterminated quotes.
pub fn parse(text: &str, interner: &Interner) -> Option<Concept> {
    let toks = strip_variables(tokenize(text)?);

    let mut stack: Vec<Item> = Vec::new();
    for tok in toks {
        match tok.as_str() {
            "(" => stack.push(Item::Open),
            ")" => reduce(&mut stack)?,
            t if t.starts_with(':') => stack.push(Item::Label(interner.intern(&t[1..]))),
            t if t.starts_with('"') => {
                // Literal leaves parse directly to nodes.
                stack.push(Item::Node(Concept::new(interner.intern(t))));
            }
            t => stack.push(Item::Name(interner.intern(t))),
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(Item::Node(c)), true) => Some(c),
        _ => None,
    }
}

/// Matches `"(" name (label node)* ` on top of the stack and replaces it
/// with the assembled node.
fn reduce(stack: &mut Vec<Item>) -> Option<()> {
    let mut pairs: Vec<(Sym, Concept)> = Vec::new();
    loop {
        match stack.pop()? {
            Item::Node(child) => match stack.pop()? {
                Item::Label(label) => pairs.push((label, child)),
                _ => return None,
            },
            Item::Name(id) => {
                match stack.pop()? {
                    Item::Open => {}
                    _ => return None,
                }
                let mut node = Concept::new(id);
                for (label, child) in pairs.into_iter().rev() {
                    node.add_child(label, child);
                }
                stack.push(Item::Node(node));
                return Some(());
            }
            _ => return None,
        }
    }
}

/// Splits on parentheses and whitespace, keeping quoted literals intact.
fn tokenize(text: &str) -> Option<Vec<String>> {
    let mut toks = Vec::new();
    let mut cur = String::new();
    let mut in_quote = false;
    for ch in text.chars() {
        if in_quote {
            cur.push(ch);
            if ch == '"' {
                in_quote = false;
                toks.push(std::mem::take(&mut cur));
            }
            continue;
        }
        match ch {
            '"' => {
                if !cur.is_empty() {
                    toks.push(std::mem::take(&mut cur));
                }
                cur.push('"');
                in_quote = true;
            }
            '(' | ')' => {
                if !cur.is_empty() {
                    toks.push(std::mem::take(&mut cur));
                }
                toks.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    toks.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if in_quote {
        return None;
    }
    if !cur.is_empty() {
        toks.push(cur);
    }
    Some(toks)
}

/// Drops `var /` prefixes so only names, labels, and parens remain.
fn strip_variables(toks: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(toks.len());
    let mut i = 0;
    while i < toks.len() {
        if i + 1 < toks.len() && toks[i + 1] == "/" {
            i += 2; // skip variable and the slash, keep the name
        } else {
            out.push(toks[i].clone());
            i += 1;
        }
    }
    out
}
