// src/main.rs

pub mod config;
pub mod decoder;
pub mod features;
pub mod graph;
pub mod intern;
pub mod io;
pub mod lexicon;
pub mod parser;
pub mod perceptron;
pub mod scorer;
pub mod token;
pub mod weights;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::{TrainConfig, WeightsKind};
use crate::decoder::BeamDecoder;
use crate::features::FeatureTemplate;
use crate::graph::{sexp, Concept};
use crate::intern::Interner;
use crate::io::{corpus, model};
use crate::lexicon::Lexicon;
use crate::parser::ParseSession;
use crate::perceptron::Perceptron;
use crate::scorer::{LinearScorer, Scorer};
use crate::token::Token;
use crate::weights::{ArrayWeights, MapWeights, Weights};

const USAGE: &str = "\
usage: amrparse <command> [options]

commands:
  train --corpus FILE --data DIR --model DIR
        [--iter N] [--beam K] [--feat-bits B] [--feature NAME]...
  parse --model DIR --weights NAME [--beam K] [--input FILE]
";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("train") => train(&args[1..]),
        Some("parse") => parse(&args[1..]),
        _ => {
            eprint!("{USAGE}");
            std::process::exit(2);
        }
    }
}

fn flag_value<'a>(flag: &str, it: &mut std::slice::Iter<'a, String>) -> Result<&'a str> {
    it.next()
        .map(String::as_str)
        .with_context(|| format!("{flag} needs a value"))
}

fn train(args: &[String]) -> Result<()> {
    let mut corpus_path: Option<PathBuf> = None;
    let mut data_dir: Option<PathBuf> = None;
    let mut model_dir: Option<PathBuf> = None;
    let mut feature_names: Vec<String> = Vec::new();
    let mut config = TrainConfig::default();

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--corpus" => corpus_path = Some(PathBuf::from(flag_value(arg, &mut it)?)),
            "--data" => data_dir = Some(PathBuf::from(flag_value(arg, &mut it)?)),
            "--model" => model_dir = Some(PathBuf::from(flag_value(arg, &mut it)?)),
            "--iter" => {
                config.iterations =
                    flag_value(arg, &mut it)?.parse().context("--iter expects a number")?
            }
            "--beam" => {
                config.beam_size =
                    flag_value(arg, &mut it)?.parse().context("--beam expects a number")?
            }
            "--feat-bits" => {
                config.feature_bits = flag_value(arg, &mut it)?
                    .parse()
                    .context("--feat-bits expects a number")?
            }
            "--feature" => feature_names.push(flag_value(arg, &mut it)?.to_string()),
            other => bail!("unknown train option '{other}'"),
        }
    }
    let corpus_path = corpus_path.context("train requires --corpus")?;
    let data_dir = data_dir.context("train requires --data")?;
    let model_dir = model_dir.context("train requires --model")?;
    if !feature_names.is_empty() {
        config.features = feature_names;
    }
    let templates = crate::features::create_set(&config.features)?;

    let mut lex = Lexicon::new(Interner::new());
    model::load_mappings(&data_dir, &mut lex)
        .with_context(|| format!("loading lexical data from {}", data_dir.display()))?;

    info!("loading corpus {}", corpus_path.display());
    let examples = corpus::load_alignment(&corpus_path, &mut lex)?;
    info!(
        "{} training examples, {} edge labels",
        examples.len(),
        lex.labels().len()
    );
    lex.seal();

    let mut perceptron = Perceptron::new(
        templates,
        BeamDecoder::new(config.beam_size),
        config.feat_size(),
    );
    perceptron.train(&lex, &examples, config.iterations, Some(&model_dir))?;

    model::save_model(&model_dir, &data_dir, &lex, &config)?;
    info!("model written to {}", model_dir.display());
    Ok(())
}

fn parse(args: &[String]) -> Result<()> {
    let mut model_dir: Option<PathBuf> = None;
    let mut weights_name: Option<String> = None;
    let mut beam: Option<usize> = None;
    let mut input: Option<PathBuf> = None;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--model" => model_dir = Some(PathBuf::from(flag_value(arg, &mut it)?)),
            "--weights" => weights_name = Some(flag_value(arg, &mut it)?.to_string()),
            "--beam" => {
                beam = Some(flag_value(arg, &mut it)?.parse().context("--beam expects a number")?)
            }
            "--input" => input = Some(PathBuf::from(flag_value(arg, &mut it)?)),
            other => bail!("unknown parse option '{other}'"),
        }
    }
    let model_dir = model_dir.context("parse requires --model")?;
    let weights_name = weights_name.context("parse requires --weights (e.g. iter5)")?;

    let (lex, mut config) = model::load_model(&model_dir)?;
    if let Some(k) = beam {
        config.beam_size = k;
    }
    let templates = crate::features::create_set(&config.features)?;

    let weights_path = model_dir.join(&weights_name);
    info!("loading weights {}", weights_path.display());
    match config.weights {
        WeightsKind::Array => {
            let ws = ArrayWeights::load(&weights_path)?;
            run_parse(&lex, &config, &templates, &ws, input.as_deref())
        }
        WeightsKind::Map => {
            let ws = MapWeights::load(&weights_path)?;
            run_parse(&lex, &config, &templates, &ws, input.as_deref())
        }
    }
}

fn run_parse<W: Weights>(
    lex: &Lexicon,
    config: &TrainConfig,
    templates: &[Box<dyn FeatureTemplate>],
    ws: &W,
    input: Option<&Path>,
) -> Result<()> {
    let scorer = LinearScorer::new(templates, ws);
    let decoder = BeamDecoder::new(config.beam_size);

    match input {
        Some(path) => {
            let sentences = corpus::load_tokens(path)?;
            info!("{} sentences from {}", sentences.len(), path.display());
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for words in &sentences {
                let toks = corpus::plain_tokens(lex, words);
                let graph = parse_tokens(lex, &decoder, &scorer, &toks)?;
                writeln!(out, "# ::snt {}", words.join(" "))?;
                writeln!(out, "{}", sexp::render(&graph, &lex.interner))?;
                writeln!(out)?;
            }
        }
        None => {
            // Interactive mode: one whitespace-tokenized sentence per line.
            let stdin = std::io::stdin();
            let mut out = std::io::stdout();
            loop {
                write!(out, "> ")?;
                out.flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let words: Vec<String> =
                    line.split_whitespace().map(str::to_string).collect();
                let toks = corpus::plain_tokens(lex, &words);
                let graph = parse_tokens(lex, &decoder, &scorer, &toks)?;
                writeln!(out, "{}", sexp::render(&graph, &lex.interner))?;
            }
        }
    }
    Ok(())
}

fn parse_tokens(
    lex: &Lexicon,
    decoder: &BeamDecoder,
    scorer: &dyn Scorer,
    toks: &[Token],
) -> Result<Concept> {
    let mut sess = ParseSession::new(toks, lex);
    let best = decoder.decode(&mut sess, scorer)?;
    sess.to_graph(best)
}
