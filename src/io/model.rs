// src/io/model.rs

//! Model-directory layout and the lexical mapping files.
//!
//! A trained model directory holds `config.json` (run metadata), the
//! interner dump (`strings`), the label vocabulary (`labels`), the
//! harvested concept table (`concept_table`), copies of the four lexical
//! mapping files, and one weights checkpoint per epoch.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;

use crate::config::TrainConfig;
use crate::graph::sexp;
use crate::intern::{Interner, Sym};
use crate::lexicon::{Lexicon, Predicate};

pub const CONFIG_FILE: &str = "config.json";
pub const STRINGS_FILE: &str = "strings";
pub const LABELS_FILE: &str = "labels";
pub const CONCEPT_TABLE_FILE: &str = "concept_table";
pub const NOUN2VERB_FILE: &str = "noun2verb";
pub const ADJ2VERB_FILE: &str = "adj2verb";
pub const ADJ2NOUN_FILE: &str = "adj2noun";
pub const PREDICATES_FILE: &str = "predicates";

const MAPPING_FILES: [&str; 4] = [
    NOUN2VERB_FILE,
    ADJ2VERB_FILE,
    ADJ2NOUN_FILE,
    PREDICATES_FILE,
];

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading {}", path.display()))
}

/// Tab-separated `word \t target` pairs, one mapping per line; a word may
/// repeat to map to several targets.
fn load_word_mapping(path: &Path, interner: &Interner) -> Result<HashMap<Sym, Vec<Sym>>> {
    let mut out: HashMap<Sym, Vec<Sym>> = HashMap::new();
    for line in read_lines(path)? {
        let Some((word, target)) = line.split_once('\t') else {
            bail!("malformed mapping line in {}: '{line}'", path.display());
        };
        out.entry(interner.intern(word))
            .or_default()
            .push(interner.intern(target));
    }
    Ok(out)
}

/// The predicate table: `word \t pred-name \t n0,n1,...` per line. Lines
/// with a different column count are ignored, matching the upstream data
/// which mixes in comment rows.
fn load_predicates(
    path: &Path,
    interner: &Interner,
) -> Result<(HashMap<Sym, Vec<Sym>>, Vec<Predicate>)> {
    let mut word2pred: HashMap<Sym, Vec<Sym>> = HashMap::new();
    let mut preds = Vec::new();
    for line in read_lines(path)? {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != 3 {
            continue;
        }
        let args: Result<Vec<u32>, _> = cols[2].split(',').map(str::parse).collect();
        let Ok(args) = args else {
            warn!("bad argument list in {}: '{line}'", path.display());
            continue;
        };
        let id = interner.intern(cols[1]);
        preds.push(Predicate { id, args });
        word2pred.entry(interner.intern(cols[0])).or_default().push(id);
    }
    Ok((word2pred, preds))
}

/// Loads the four mapping files from `dir` into the lexicon. Noun and
/// adjective tables map through verbs into the predicate table.
pub fn load_mappings(dir: &Path, lex: &mut Lexicon) -> Result<()> {
    let adj_nouns = load_word_mapping(&dir.join(ADJ2NOUN_FILE), &lex.interner)?;
    let (verb_preds, preds) = load_predicates(&dir.join(PREDICATES_FILE), &lex.interner)?;
    let noun2verb = load_word_mapping(&dir.join(NOUN2VERB_FILE), &lex.interner)?;
    let adj2verb = load_word_mapping(&dir.join(ADJ2VERB_FILE), &lex.interner)?;

    let compose = |via: HashMap<Sym, Vec<Sym>>| -> HashMap<Sym, Vec<Sym>> {
        via.into_iter()
            .map(|(word, verbs)| {
                let targets = verbs
                    .iter()
                    .flat_map(|v| verb_preds.get(v).into_iter().flatten().copied())
                    .collect();
                (word, targets)
            })
            .collect()
    };

    lex.noun_preds = compose(noun2verb);
    lex.adj_preds = compose(adj2verb);
    lex.verb_preds = verb_preds;
    lex.adj_nouns = adj_nouns;
    for pred in preds {
        lex.register_predicate(pred);
    }
    Ok(())
}

fn write_lines<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for line in lines {
        out.write_all(line.as_ref().as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Persists the lexicon and run metadata into `dir`, copying the mapping
/// files over from `data_dir`.
pub fn save_model(
    dir: &Path,
    data_dir: &Path,
    lex: &Lexicon,
    config: &TrainConfig,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating model directory {}", dir.display()))?;

    let strings = lex.interner.snapshot();
    write_lines(
        &dir.join(STRINGS_FILE),
        strings.iter().enumerate().map(|(i, s)| format!("{i}\t{s}")),
    )?;

    write_lines(
        &dir.join(LABELS_FILE),
        lex.labels().iter().map(|&l| lex.interner.resolve(l)),
    )?;

    let mut table_lines = Vec::new();
    for (lemma, concepts) in lex.concept_entries() {
        let word = lex.interner.resolve(lemma);
        for concept in concepts {
            table_lines.push(format!("{word}\t{}", sexp::render(concept, &lex.interner)));
        }
    }
    table_lines.sort_unstable();
    write_lines(&dir.join(CONCEPT_TABLE_FILE), &table_lines)?;

    let json = serde_json::to_string_pretty(config).context("serializing config")?;
    fs::write(dir.join(CONFIG_FILE), json + "\n")?;

    for name in MAPPING_FILES {
        fs::copy(data_dir.join(name), dir.join(name))
            .with_context(|| format!("copying {name}"))?;
    }
    Ok(())
}

/// Loads a model directory back into a sealed lexicon plus its config.
pub fn load_model(dir: &Path) -> Result<(Lexicon, TrainConfig)> {
    let config_text = fs::read_to_string(dir.join(CONFIG_FILE))
        .with_context(|| format!("reading {}", dir.join(CONFIG_FILE).display()))?;
    let config: TrainConfig =
        serde_json::from_str(&config_text).context("parsing config.json")?;

    let mut strings = Vec::new();
    for (i, line) in read_lines(&dir.join(STRINGS_FILE))?.into_iter().enumerate() {
        let Some((id, s)) = line.split_once('\t') else {
            bail!("malformed interner dump line: '{line}'");
        };
        if id.parse::<usize>().ok() != Some(i) {
            bail!("interner dump ids out of order at line {}", i + 1);
        }
        strings.push(s.to_string());
    }
    let mut lex = Lexicon::new(Interner::from_strings(strings));

    for line in read_lines(&dir.join(LABELS_FILE))? {
        let label = lex.interner.intern(&line);
        lex.add_label(label);
    }

    for line in read_lines(&dir.join(CONCEPT_TABLE_FILE))? {
        let Some((word, s)) = line.split_once('\t') else {
            warn!("skipping malformed concept-table line: '{line}'");
            continue;
        };
        match sexp::parse(s, &lex.interner) {
            Some(concept) => {
                let lemma = lex.interner.intern(word);
                lex.add_concept_mapping(lemma, concept);
            }
            None => warn!("skipping unparseable concept for '{word}': {s}"),
        }
    }

    load_mappings(dir, &mut lex)?;
    lex.seal();
    Ok((lex, config))
}
