// src/features/tests.rs

use std::rc::Rc;

use crate::features::{self, FeatureTemplate, TokenFeature};
use crate::graph::Concept;
use crate::intern::Interner;
use crate::lexicon::{Lexicon, ShiftRule};
use crate::parser::{Action, ParseSession, StateId};
use crate::token::Token;

fn fixture() -> (Lexicon, Vec<Token>) {
    let mut lex = Lexicon::new(Interner::new());
    let mod_l = lex.interner.intern("mod");
    lex.add_label(mod_l);
    lex.seal();
    let i = &lex.interner;
    let toks = vec![
        Token::root(i),
        Token::new(
            i,
            i.intern("heavy"),
            i.intern("heavy"),
            i.intern("JJ"),
            Some(2),
            Some(i.intern("amod")),
        ),
        Token::new(
            i,
            i.intern("industries"),
            i.intern("industry"),
            i.intern("NNS"),
            None,
            None,
        ),
        Token::new(
            i,
            i.intern("grew"),
            i.intern("grow"),
            i.intern("VBD"),
            None,
            None,
        ),
    ];
    (lex, toks)
}

fn shift(sess: &mut ParseSession, id: StateId, name: &str) -> StateId {
    let concept = Concept::new(sess.lexicon().interner.intern(name));
    sess.advance(
        id,
        Action::Shift {
            rule: ShiftRule::LeaveAsIs,
            concept: Rc::new(concept),
        },
        0.0,
    )
    .expect("advance")
}

#[test]
fn registry_knows_every_template() {
    for name in features::known_features() {
        let t = features::create(name).expect("create");
        assert_eq!(t.name(), name);
    }
    assert!(features::create("wordnet").is_err());
    let set = features::create_set(&["lemma", "dep", "between"]).expect("set");
    assert_eq!(set.len(), 3);
}

#[test]
fn output_is_parallel_to_actions() {
    let (lex, toks) = fixture();
    let mut sess = ParseSession::new(&toks, &lex);
    let init = sess.initial();
    let id = shift(&mut sess, init, "heavy");
    let actions = sess.valid_actions(id);
    assert!(actions.len() > 1);
    let t = TokenFeature::lemma();
    let sets = t.extract(&sess, id, &actions);
    assert_eq!(sets.len(), actions.len());
    for (action, set) in actions.iter().zip(&sets) {
        // 5 context slots crossed with each identity feature.
        assert_eq!(set.len(), 5 * action.identity_features().len());
        assert_eq!(t.extract_one(&sess, id, action), *set);
    }
}

#[test]
fn context_distinguishes_states() {
    let (lex, toks) = fixture();
    let mut sess = ParseSession::new(&toks, &lex);
    let init = sess.initial();
    let a = shift(&mut sess, init, "heavy");
    let b = shift(&mut sess, a, "industry");
    let t = TokenFeature::lemma();
    let action = Action::Empty;
    assert_ne!(
        t.extract_one(&sess, a, &action),
        t.extract_one(&sess, b, &action)
    );
}

#[test]
fn identity_distinguishes_actions() {
    let (lex, toks) = fixture();
    let mut sess = ParseSession::new(&toks, &lex);
    let init = sess.initial();
    let id = shift(&mut sess, init, "heavy");
    let t = TokenFeature::pos();
    assert_ne!(
        t.extract_one(&sess, id, &Action::Empty),
        t.extract_one(&sess, id, &Action::Dummy)
    );
}

#[test]
fn suffixes_are_interned_lemma_tails() {
    let (lex, toks) = fixture();
    let sess = ParseSession::new(&toks, &lex);
    let t = TokenFeature::suffix(3);
    // Two lookups exercise the memoized path.
    let first = t.extract_one(&sess, sess.initial(), &Action::Empty);
    let second = t.extract_one(&sess, sess.initial(), &Action::Empty);
    assert_eq!(first, second);
    assert!(!first.is_empty());
    let interner = &lex.interner;
    let before = interner.len();
    // b0 is "heavy": its 3-char tail is interned on first use.
    let _ = interner.intern("avy");
    assert_eq!(interner.len(), before);
}

#[test]
fn between_is_empty_without_s1() {
    let (lex, toks) = fixture();
    let mut sess = ParseSession::new(&toks, &lex);
    let init = sess.initial();
    let id = shift(&mut sess, init, "heavy");
    let t = features::BetweenTokensFeature;
    // s1 is ROOT and s0 is token 1: nothing lies between them.
    assert!(t.extract_one(&sess, id, &Action::Empty).is_empty());

    let id2 = sess.advance(id, Action::Empty, 0.0).expect("advance");
    let id2 = sess.advance(id2, Action::Dummy, 0.0).expect("advance");
    let id3 = shift(&mut sess, id2, "grow");
    // Token 2 sits strictly between s1 (token 1) and s0 (token 3).
    let feats = t.extract_one(&sess, id3, &Action::Empty);
    assert_eq!(feats.len(), 2);
}

#[test]
fn dep_features_reflect_annotation() {
    let (lex, toks) = fixture();
    let i = &lex.interner;
    // Same sentence, but the buffer head loses its dependency arc.
    let mut bare = toks.clone();
    bare[1] = Token::new(
        i,
        i.intern("heavy"),
        i.intern("heavy"),
        i.intern("JJ"),
        None,
        None,
    );

    let sess = ParseSession::new(&toks, &lex);
    let sess_bare = ParseSession::new(&bare, &lex);
    let t = features::DepFeature;
    let annotated = t.extract_one(&sess, sess.initial(), &Action::Empty);
    let plain = t.extract_one(&sess_bare, sess_bare.initial(), &Action::Empty);
    assert_eq!(annotated.len(), 6);
    // s0 and s1 agree across the sessions; only b0's rel/offset differ.
    assert_ne!(annotated, plain);
}
