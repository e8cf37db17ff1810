// src/io/corpus.rs

//! JAMR-style alignment corpus reader.
//!
//! A record is a block of `#`-prefixed lines: `::tok` with the sentence,
//! `::node` lines naming aligned concept nodes with their token spans,
//! `::root`, and `::edge` lines connecting nodes. Optional `::lemma`,
//! `::pos`, and `::dep` lines carry precomputed linguistic annotation;
//! without them tokens fall back to surface lemmas, an unknown POS tag,
//! and no dependency arcs. A non-comment line ends the block.
//!
//! Records flagged with the upstream parser-exception sentinel, or that
//! fail mid-assembly (multiple fragment roots, cyclic edges, malformed
//! columns), are skipped with a warning; loading never fails on a bad
//! record, only on I/O.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;

use crate::graph::Concept;
use crate::intern::Sym;
use crate::lexicon::Lexicon;
use crate::token::{Gold, Token};

const EXCEPTION_SENTINEL: &str = "# THERE WAS AN EXCEPTION IN THE PARSER.";
const UNKNOWN_POS: &str = "UNK";

/// Whitespace split that keeps double-quoted segments (which may contain
/// spaces) as single elements.
pub fn split_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending: Option<String> = None;
    let mut in_quote = false;
    for part in line.split_whitespace() {
        if part.starts_with('"') {
            in_quote = true;
        }
        match pending.as_mut() {
            Some(p) => {
                p.push(' ');
                p.push_str(part);
            }
            None => pending = Some(part.to_string()),
        }
        if part.ends_with('"') {
            in_quote = false;
        }
        if !in_quote {
            if let Some(p) = pending.take() {
                out.push(p);
            }
        }
    }
    if let Some(p) = pending {
        // Unterminated quote; keep what we saw.
        out.push(p);
    }
    out
}

#[derive(Default)]
struct Block {
    words: Option<Vec<String>>,
    lemmas: Option<Vec<String>>,
    poss: Option<Vec<String>>,
    deps: Option<Vec<String>>,
    nodes: Vec<BlockNode>,
    edges: Vec<BlockEdge>,
    ignore: bool,
}

struct BlockNode {
    key: String,
    name: String,
    span: String,
    span_from: usize,
}

struct BlockEdge {
    label: String,
    head: String,
    tail: String,
}

impl Block {
    fn feed(&mut self, line: &str) -> Result<()> {
        let es = split_line(line);
        if es.len() < 2 {
            bail!("comment line with no directive");
        }
        match es[1].as_str() {
            "::tok" => self.words = Some(es[2..].to_vec()),
            "::lemma" => self.lemmas = Some(es[2..].to_vec()),
            "::pos" => self.poss = Some(es[2..].to_vec()),
            "::dep" => self.deps = Some(es[2..].to_vec()),
            "::node" => {
                if es.len() != 5 {
                    bail!("::node line with {} columns: {line}", es.len());
                }
                let span = es[4].clone();
                let span_from = span
                    .split('-')
                    .next()
                    .unwrap_or("")
                    .parse::<usize>()
                    .with_context(|| format!("bad span '{span}'"))?;
                self.nodes.push(BlockNode {
                    key: es[2].clone(),
                    name: es[3].clone(),
                    span,
                    span_from,
                });
            }
            "::edge" => {
                if es.len() != 7 {
                    bail!("::edge line with {} columns: {line}", es.len());
                }
                self.edges.push(BlockEdge {
                    label: es[3].clone(),
                    head: es[5].clone(),
                    tail: es[6].clone(),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

/// Loads an alignment corpus, registering edge labels and concept-table
/// entries into `lex` as a side effect. The caller seals the lexicon
/// afterwards.
pub fn load_alignment(path: &Path, lex: &mut Lexicon) -> Result<Vec<Vec<Token>>> {
    let file =
        File::open(path).with_context(|| format!("opening corpus {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    let mut block = Block::default();
    for line in reader.lines() {
        let line = line?;
        if line.starts_with(EXCEPTION_SENTINEL) {
            block.ignore = true;
            continue;
        }
        if line.starts_with('#') {
            if !block.ignore {
                if let Err(err) = block.feed(&line) {
                    warn!("skipping record: {err:#}");
                    block.ignore = true;
                }
            }
        } else if block.words.is_some() || block.ignore {
            flush_block(&mut block, lex, &mut out);
        }
    }
    if block.words.is_some() || block.ignore {
        flush_block(&mut block, lex, &mut out);
    }
    Ok(out)
}

fn flush_block(block: &mut Block, lex: &mut Lexicon, out: &mut Vec<Vec<Token>>) {
    let block = std::mem::take(block);
    if block.ignore {
        return;
    }
    match build_example(&block, lex) {
        Ok(toks) => out.push(toks),
        Err(err) => warn!(
            "skipping record '{}': {err:#}",
            block.words.as_deref().unwrap_or(&[]).join(" ")
        ),
    }
}

fn build_example(block: &Block, lex: &mut Lexicon) -> Result<Vec<Token>> {
    let words = block.words.as_ref().context("record without ::tok")?;
    let n = words.len();
    let annotation = |xs: &Option<Vec<String>>, what: &str| -> Result<Option<Vec<String>>> {
        match xs {
            Some(v) if v.len() != n => {
                bail!("{what} annotation has {} entries for {n} tokens", v.len())
            }
            other => Ok(other.clone()),
        }
    };
    let lemmas = annotation(&block.lemmas, "lemma")?.unwrap_or_else(|| words.clone());
    let poss = annotation(&block.poss, "pos")?
        .unwrap_or_else(|| vec![UNKNOWN_POS.to_string(); n]);
    let deps = annotation(&block.deps, "dep")?;

    // Group aligned nodes by span, in order of first appearance.
    let mut spans: Vec<(&str, Vec<usize>)> = Vec::new();
    for (i, node) in block.nodes.iter().enumerate() {
        match spans.iter_mut().find(|(s, _)| *s == node.span) {
            Some((_, members)) => members.push(i),
            None => spans.push((&node.span, vec![i])),
        }
    }

    let names: HashMap<&str, Sym> = block
        .nodes
        .iter()
        .map(|nd| (nd.key.as_str(), lex.interner.intern(&nd.name)))
        .collect();
    let node_span: HashMap<&str, &str> = block
        .nodes
        .iter()
        .map(|nd| (nd.key.as_str(), nd.span.as_str()))
        .collect();

    for edge in &block.edges {
        for key in [&edge.head, &edge.tail] {
            if !names.contains_key(key.as_str()) {
                bail!("::edge references unknown node '{key}'");
            }
        }
    }

    // Assemble one concept fragment per span and remember each node's
    // pre-order position within its fragment.
    let mut fragments: HashMap<usize, Concept> = HashMap::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut span_from_of: HashMap<&str, usize> = HashMap::new();
    for (span, members) in &spans {
        let member_keys: Vec<&str> = members
            .iter()
            .map(|&i| block.nodes[i].key.as_str())
            .collect();
        let mut children: HashMap<&str, Vec<(Sym, &str)>> = HashMap::new();
        let mut tails: Vec<&str> = Vec::new();
        for edge in &block.edges {
            let head = edge.head.as_str();
            let tail = edge.tail.as_str();
            if member_keys.contains(&head) && member_keys.contains(&tail) {
                let label = lex.interner.intern(&edge.label);
                children.entry(head).or_default().push((label, tail));
                tails.push(tail);
            }
        }
        let mut roots = member_keys.iter().filter(|k| !tails.contains(*k));
        let root = *roots
            .next()
            .with_context(|| format!("span {span} has no fragment root"))?;
        if roots.next().is_some() {
            bail!("span {span} has multiple fragment roots");
        }

        let mut counter = 0;
        let fragment = assemble(root, &children, &names, &mut positions, &mut counter)?;
        let span_from = block.nodes[members[0]].span_from;
        for &i in members.iter() {
            span_from_of.insert(block.nodes[i].key.as_str(), span_from);
        }
        if fragments.insert(span_from, fragment).is_some() {
            bail!("two fragments aligned to token {span_from}");
        }
    }

    // Register labels and collect gold attachments from edges that cross
    // fragment boundaries.
    let mut gold_edges: HashMap<usize, (usize, Sym, usize)> = HashMap::new();
    for edge in &block.edges {
        let label = lex.interner.intern(&edge.label);
        lex.add_label(label);
        let head = edge.head.as_str();
        let tail = edge.tail.as_str();
        if node_span[head] == node_span[tail] {
            continue;
        }
        let head_span = span_from_of[head];
        let tail_span = span_from_of[tail];
        gold_edges.insert(tail_span, (head_span, label, positions[head]));
    }

    // Fragments feed the concept table under the lemma of their first
    // aligned token.
    for (&span_from, fragment) in &fragments {
        if span_from >= n {
            bail!("span start {span_from} beyond the {n}-token sentence");
        }
        let lemma = lex.interner.intern(&lemmas[span_from]);
        lex.add_concept_mapping(lemma, fragment.clone());
    }

    let root_label = lex.root_label();
    let mut toks = vec![Token::root(&lex.interner)];
    for i in 0..n {
        let (dep_head, dep_rel) = match deps.as_ref().map(|d| d[i].as_str()) {
            None | Some("-") => (None, None),
            Some(spec) => {
                let (h, rel) = spec
                    .split_once(':')
                    .with_context(|| format!("bad ::dep entry '{spec}'"))?;
                let h: usize = h
                    .parse()
                    .with_context(|| format!("bad ::dep head in '{spec}'"))?;
                // Token indices shift by one for the ROOT slot.
                (Some(h + 1), Some(lex.interner.intern(rel)))
            }
        };
        let mut tok = Token::new(
            &lex.interner,
            lex.interner.intern(&words[i]),
            lex.interner.intern(&lemmas[i]),
            lex.interner.intern(&poss[i]),
            dep_head,
            dep_rel,
        );
        if let Some(fragment) = fragments.get(&i) {
            let (head, label, position) = match gold_edges.get(&i) {
                Some(&(head_span, label, position)) => (head_span + 1, label, position),
                // A fragment with no incoming edge is the graph root.
                None => (0, root_label, 0),
            };
            tok = tok.with_gold(Gold {
                concept: fragment.clone(),
                head,
                label,
                position,
            });
        }
        toks.push(tok);
    }
    Ok(toks)
}

fn assemble<'a>(
    key: &'a str,
    children: &HashMap<&'a str, Vec<(Sym, &'a str)>>,
    names: &HashMap<&str, Sym>,
    positions: &mut HashMap<&'a str, usize>,
    counter: &mut usize,
) -> Result<Concept> {
    if positions.contains_key(key) {
        bail!("cycle through node '{key}'");
    }
    positions.insert(key, *counter);
    *counter += 1;
    let mut concept = Concept::new(names[key]);
    if let Some(kids) = children.get(key) {
        for &(label, tail) in kids {
            concept.add_child(label, assemble(tail, children, names, positions, counter)?);
        }
    }
    Ok(concept)
}

/// Reads the `# ::snt`/`# ::tok` token lines of a test file.
pub fn load_tokens(path: &Path) -> Result<Vec<Vec<String>>> {
    let file =
        File::open(path).with_context(|| format!("opening input {}", path.display()))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.starts_with("# ::snt") || line.starts_with("# ::tok") {
            let es = split_line(&line);
            out.push(es[2..].to_vec());
        }
    }
    Ok(out)
}

/// Tokens for raw, unannotated input: surface form doubles as lemma, the
/// POS tag is unknown.
pub fn plain_tokens(lex: &Lexicon, words: &[String]) -> Vec<Token> {
    let mut toks = vec![Token::root(&lex.interner)];
    for w in words {
        let id = lex.interner.intern(w);
        toks.push(Token::new(
            &lex.interner,
            id,
            id,
            lex.interner.intern(UNKNOWN_POS),
            None,
            None,
        ));
    }
    toks
}
