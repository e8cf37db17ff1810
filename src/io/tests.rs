// src/io/tests.rs

use std::fs;
use std::path::Path;

use test_log::test;

use crate::config::TrainConfig;
use crate::graph::sexp;
use crate::intern::Interner;
use crate::lexicon::Lexicon;

use super::corpus::{self, split_line};
use super::model;

fn fresh_lexicon() -> Lexicon {
    Lexicon::new(Interner::new())
}

fn write_file(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture file");
}

fn write_data_dir(dir: &Path) {
    write_file(dir, model::NOUN2VERB_FILE, "worker\twork\n");
    write_file(dir, model::ADJ2VERB_FILE, "hot\theat\n");
    write_file(dir, model::ADJ2NOUN_FILE, "industrial\tindustry\n");
    write_file(
        dir,
        model::PREDICATES_FILE,
        "work\twork-01\t0,1\nheat\theat-01\t0,1,2\nnot a predicate row\n",
    );
}

#[test]
fn split_line_joins_quoted_segments() {
    assert_eq!(
        split_line(r#"# ::node 0 "New York" 0-2"#),
        vec!["#", "::node", "0", "\"New York\"", "0-2"]
    );
    // Unterminated quote: the tail is kept as one element.
    assert_eq!(split_line(r#"a "b c"#), vec!["a", "\"b c"]);
}

#[test]
fn alignment_blocks_become_annotated_tokens() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus_path = dir.path().join("train.txt");
    fs::write(
        &corpus_path,
        "# ::tok earthquake workers\n\
         # ::lemma earthquake worker\n\
         # ::pos NN NNS\n\
         # ::dep 1:amod -\n\
         # ::node 0 person 1-2\n\
         # ::node 0.0 work-01 1-2\n\
         # ::node 1 earthquake 0-1\n\
         # ::root 0 person\n\
         # ::edge person ARG0-of work-01 0 0.0\n\
         # ::edge person mod earthquake 0 1\n\
         (p / person)\n",
    )
    .expect("write corpus");

    let mut lex = fresh_lexicon();
    let examples = corpus::load_alignment(&corpus_path, &mut lex).expect("load");
    assert_eq!(examples.len(), 1);

    let toks = &examples[0];
    assert_eq!(toks.len(), 3); // ROOT slot plus two words.
    assert_eq!(lex.interner.resolve(toks[1].lemma), "earthquake");
    assert_eq!(toks[1].dep_head, Some(2)); // 1:amod shifted past ROOT.
    assert_eq!(
        toks[1].dep_rel.map(|r| lex.interner.resolve(r)),
        Some("amod".to_string())
    );
    assert_eq!(toks[2].dep_head, None);

    let g1 = toks[1].gold.as_ref().expect("earthquake gold");
    assert_eq!(sexp::render(&g1.concept, &lex.interner), "(e / earthquake)");
    assert_eq!(g1.head, 2); // attaches under the workers fragment
    assert_eq!(lex.interner.resolve(g1.label), "mod");
    assert_eq!(g1.position, 0);

    // The fragment with no incoming edge attaches to ROOT.
    let g2 = toks[2].gold.as_ref().expect("workers gold");
    assert_eq!(
        sexp::render(&g2.concept, &lex.interner),
        "(p / person :ARG0-of (w / work-01))"
    );
    assert_eq!(g2.head, 0);
    assert_eq!(lex.interner.resolve(g2.label), "root");
    assert_eq!(g2.position, 0);

    // Fragments feed the concept table under their first token's lemma.
    let worker = lex.interner.intern("worker");
    assert_eq!(lex.concepts_for(worker).len(), 1);
    let labels: Vec<String> = lex
        .labels()
        .iter()
        .map(|&l| lex.interner.resolve(l))
        .collect();
    assert!(labels.iter().any(|l| l == "ARG0-of"));
    assert!(labels.iter().any(|l| l == "mod"));
}

#[test]
fn bad_records_are_skipped_and_good_ones_kept() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus_path = dir.path().join("train.txt");
    fs::write(
        &corpus_path,
        // Record flagged by the upstream parser.
        "# THERE WAS AN EXCEPTION IN THE PARSER.\n\
         # ::tok broken one\n\
         (b / broken)\n\
         # ::tok short\n\
         # ::pos NN NN\n\
         (s / short)\n\
         # ::tok fine\n\
         # ::node 0 fine-01 0-1\n",
    )
    .expect("write corpus");

    let mut lex = fresh_lexicon();
    let examples = corpus::load_alignment(&corpus_path, &mut lex).expect("load");
    // Only the last record survives: the first carries the exception
    // sentinel, the second has a POS row of the wrong length, and the
    // third is flushed by end of file rather than a following line.
    assert_eq!(examples.len(), 1);
    assert_eq!(lex.interner.resolve(examples[0][1].surf), "fine");
    assert!(examples[0][1].gold.is_some());
}

#[test]
fn unannotated_blocks_fall_back_to_surface_forms() {
    let dir = tempfile::tempdir().expect("tempdir");
    let corpus_path = dir.path().join("train.txt");
    fs::write(
        &corpus_path,
        "# ::tok dogs bark\n# ::node 0 dog 0-1\n(d / dog)\n",
    )
    .expect("write corpus");

    let mut lex = fresh_lexicon();
    let examples = corpus::load_alignment(&corpus_path, &mut lex).expect("load");
    let toks = &examples[0];
    assert_eq!(toks[1].surf, toks[1].lemma);
    assert_eq!(lex.interner.resolve(toks[1].pos), "UNK");
    assert!(toks[2].gold.is_none());
}

#[test]
fn load_tokens_reads_snt_and_tok_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.txt");
    fs::write(
        &path,
        "# ::id 42\n# ::snt The dog barked\n(d / dog)\n# ::tok A cat\n",
    )
    .expect("write input");
    let sentences = corpus::load_tokens(&path).expect("load");
    assert_eq!(
        sentences,
        vec![vec!["The", "dog", "barked"], vec!["A", "cat"]]
    );
}

#[test]
fn plain_tokens_start_with_the_root_slot() {
    let lex = fresh_lexicon();
    let toks = corpus::plain_tokens(&lex, &["dogs".to_string(), "bark".to_string()]);
    assert_eq!(toks.len(), 3);
    assert_eq!(lex.interner.resolve(toks[1].surf), "dogs");
    assert_eq!(toks[1].surf, toks[1].lemma);
}

#[test]
fn mappings_compose_words_through_verbs_into_predicates() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_data_dir(dir.path());

    let mut lex = fresh_lexicon();
    model::load_mappings(dir.path(), &mut lex).expect("load mappings");

    let worker = lex.interner.intern("worker");
    let work_01 = lex.interner.intern("work-01");
    assert_eq!(lex.noun_preds.get(&worker), Some(&vec![work_01]));

    let hot = lex.interner.intern("hot");
    let heat_01 = lex.interner.intern("heat-01");
    assert_eq!(lex.adj_preds.get(&hot), Some(&vec![heat_01]));

    let industrial = lex.interner.intern("industrial");
    let industry = lex.interner.intern("industry");
    assert_eq!(lex.adj_nouns.get(&industrial), Some(&vec![industry]));

    let pred = lex.predicate(work_01).expect("registered predicate");
    assert_eq!(pred.args, vec![0, 1]);
    // The malformed row contributes nothing.
    assert!(lex.predicate(lex.interner.intern("not")).is_none());
}

#[test]
fn model_directory_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    let model_dir = dir.path().join("model");
    fs::create_dir_all(&data_dir).expect("mkdir");
    write_data_dir(&data_dir);

    let mut lex = fresh_lexicon();
    model::load_mappings(&data_dir, &mut lex).expect("load mappings");
    let mod_label = lex.interner.intern("mod");
    lex.add_label(mod_label);
    let worker = lex.interner.intern("worker");
    let fragment = sexp::parse("(p / person :ARG0-of (w / work-01))", &lex.interner)
        .expect("parse fixture");
    lex.add_concept_mapping(worker, fragment);
    lex.seal();

    let mut config = TrainConfig::default();
    config.beam_size = 3;
    config.features = vec!["lemma".to_string(), "dep".to_string()];
    model::save_model(&model_dir, &data_dir, &lex, &config).expect("save");

    let (loaded, loaded_config) = model::load_model(&model_dir).expect("load");
    assert_eq!(loaded_config, config);

    let labels: Vec<String> = loaded
        .labels()
        .iter()
        .map(|&l| loaded.interner.resolve(l))
        .collect();
    assert!(labels.iter().any(|l| l == "mod"));

    let worker = loaded.interner.intern("worker");
    let concepts = loaded.concepts_for(worker);
    assert_eq!(concepts.len(), 1);
    assert_eq!(
        sexp::render(&concepts[0], &loaded.interner),
        "(p / person :ARG0-of (w / work-01))"
    );

    // Mapping files travelled with the model.
    let work_01 = loaded.interner.intern("work-01");
    assert!(loaded.is_predicate(work_01));
    assert_eq!(loaded.noun_preds.get(&worker), Some(&vec![work_01]));
}

#[test]
fn load_model_rejects_a_corrupt_interner_dump() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    let model_dir = dir.path().join("model");
    fs::create_dir_all(&data_dir).expect("mkdir");
    write_data_dir(&data_dir);

    let lex = fresh_lexicon();
    model::save_model(&model_dir, &data_dir, &lex, &TrainConfig::default())
        .expect("save");
    fs::write(model_dir.join(model::STRINGS_FILE), "5\tout-of-order\n")
        .expect("corrupt dump");

    assert!(model::load_model(&model_dir).is_err());
}
