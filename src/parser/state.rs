// src/parser/state.rs

//! Parse states, the oracle, and graph recovery.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, Context, Result};

use crate::graph::{Concept, EMPTY_CONCEPT};
use crate::intern::Sym;
use crate::lexicon::Lexicon;
use crate::parser::{Action, ReduceDir};
use crate::token::Token;

/// Arena index of a parse state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u32);

/// One immutable parse state.
///
/// The stack is the chain of `left` links: `top` is the token index whose
/// fragment sits on top, `left` the state holding the element below it.
/// `right` is the index of the next unconsumed buffer token. `lmost` and
/// `rmost` are the token indices of the leftmost and rightmost dependents
/// attached to the top fragment so far. `prev` links the full derivation
/// history, one action per state.
#[derive(Debug, Clone)]
pub struct StateNode {
    pub top: usize,
    pub concept: Option<Rc<Concept>>,
    pub lmost: Option<usize>,
    pub rmost: Option<usize>,
    pub left: Option<StateId>,
    pub right: usize,
    pub prev: Option<StateId>,
    pub prev_act: Option<Action>,
    pub score: f32,
}

/// All states explored while parsing one sentence.
///
/// Gold replay and every beam hypothesis share the arena, so common
/// prefixes are stored once and a [`StateId`] is enough to recover a full
/// derivation.
pub struct ParseSession<'a> {
    states: Vec<StateNode>,
    toks: &'a [Token],
    lex: &'a Lexicon,
}

impl<'a> ParseSession<'a> {
    /// Starts a session over `toks`, whose index 0 must be the ROOT token.
    pub fn new(toks: &'a [Token], lex: &'a Lexicon) -> Self {
        let initial = StateNode {
            top: 0,
            concept: None,
            lmost: None,
            rmost: None,
            left: None,
            right: 1,
            prev: None,
            prev_act: None,
            score: 0.0,
        };
        ParseSession {
            states: vec![initial],
            toks,
            lex,
        }
    }

    pub fn initial(&self) -> StateId {
        StateId(0)
    }

    pub fn node(&self, id: StateId) -> &StateNode {
        &self.states[id.0 as usize]
    }

    pub fn tokens(&self) -> &[Token] {
        self.toks
    }

    pub fn lexicon(&self) -> &Lexicon {
        self.lex
    }

    /// Token index of the stack top.
    pub fn s0(&self, id: StateId) -> usize {
        self.node(id).top
    }

    /// Token index of the element below the top, if any.
    pub fn s1(&self, id: StateId) -> Option<usize> {
        self.node(id).left.map(|l| self.node(l).top)
    }

    /// Index of the next buffer token, if the buffer is non-empty.
    pub fn b0(&self, id: StateId) -> Option<usize> {
        let st = self.node(id);
        (st.right < self.toks.len()).then_some(st.right)
    }

    pub fn concept(&self, id: StateId) -> Option<&Rc<Concept>> {
        self.node(id).concept.as_ref()
    }

    pub fn left_concept(&self, id: StateId) -> Option<&Rc<Concept>> {
        self.node(id).left.and_then(|l| self.node(l).concept.as_ref())
    }

    /// Applies `action` to the state `id`, appending and returning the
    /// successor. Reduces require a non-empty `left`.
    pub fn advance(&mut self, id: StateId, action: Action, score: f32) -> Result<StateId> {
        let st = self.node(id);
        let next = match &action {
            Action::Shift { concept, .. } => StateNode {
                top: st.right,
                concept: Some(Rc::clone(concept)),
                lmost: None,
                rmost: None,
                left: Some(id),
                right: st.right + 1,
                prev: Some(id),
                prev_act: Some(action.clone()),
                score,
            },
            Action::Empty => StateNode {
                right: st.right + 1,
                prev: Some(id),
                prev_act: Some(action.clone()),
                score,
                ..st.clone()
            },
            Action::Dummy => StateNode {
                prev: Some(id),
                prev_act: Some(action.clone()),
                score,
                ..st.clone()
            },
            Action::Reduce { dir, .. } => {
                let left_id = st
                    .left
                    .context("reduce applied to a state with an empty stack")?;
                let left = self.node(left_id);
                match dir {
                    ReduceDir::Left => StateNode {
                        top: st.top,
                        concept: st.concept.clone(),
                        lmost: Some(left.top),
                        rmost: st.rmost,
                        left: left.left,
                        right: st.right,
                        prev: Some(id),
                        prev_act: Some(action.clone()),
                        score,
                    },
                    ReduceDir::Right => StateNode {
                        top: left.top,
                        concept: left.concept.clone(),
                        lmost: left.lmost,
                        rmost: Some(st.top),
                        left: left.left,
                        right: st.right,
                        prev: Some(id),
                        prev_act: Some(action.clone()),
                        score,
                    },
                }
            }
        };
        self.states.push(next);
        Ok(StateId((self.states.len() - 1) as u32))
    }

    /// A state is terminal when the stack holds only ROOT, the buffer is
    /// exhausted, and the state does not owe a Dummy for a preceding
    /// Empty.
    pub fn is_final(&self, id: StateId) -> bool {
        let st = self.node(id);
        st.left.is_none()
            && st.right == self.toks.len()
            && !matches!(st.prev_act, Some(Action::Empty))
    }

    /// The action leading toward the gold parse, or `None` when the gold
    /// attachments are non-projective and no such action exists. Fails if
    /// an aligned token's gold fragment is missing from its shift
    /// candidates.
    pub fn gold_action(&self, id: StateId) -> Result<Option<Action>> {
        let st = self.node(id);
        if matches!(st.prev_act, Some(Action::Empty)) {
            // Dummy is the only follower of Empty.
            return Ok(Some(Action::Dummy));
        }

        if st.right < self.toks.len() && self.toks[st.right].gold.is_none() {
            // Discard unaligned tokens as soon as they surface.
            return Ok(Some(Action::Empty));
        }

        if let Some(left_id) = st.left {
            let left_top = self.node(left_id).top;
            let s0 = &self.toks[st.top];
            let s1 = &self.toks[left_top];

            if let Some(g1) = s1.gold.as_ref().filter(|g| g.head == st.top) {
                return Ok(Some(Action::Reduce {
                    dir: ReduceDir::Left,
                    label: g1.label,
                    position: g1.position,
                }));
            }
            if let Some(g0) = s0.gold.as_ref().filter(|g| g.head == left_top) {
                // Right-reducing buries the top fragment, so every token
                // still wanting it as head must already be attached.
                let reducible = !self.toks[st.right..]
                    .iter()
                    .any(|t| t.gold.as_ref().is_some_and(|g| g.head == st.top));
                if reducible {
                    return Ok(Some(Action::Reduce {
                        dir: ReduceDir::Right,
                        label: g0.label,
                        position: g0.position,
                    }));
                }
            }
        } else if st.right < self.toks.len() {
            return Ok(Some(self.gold_shift(st.right)?));
        } else {
            bail!("gold action requested on a terminal state");
        }

        if st.right < self.toks.len() {
            Ok(Some(self.gold_shift(st.right)?))
        } else {
            Ok(None)
        }
    }

    fn gold_shift(&self, right: usize) -> Result<Action> {
        let tok = &self.toks[right];
        let gold = tok
            .gold
            .as_ref()
            .with_context(|| format!("token {right} has no gold fragment"))?;
        for (rule, concept) in self.lex.identify_concepts(tok) {
            if concept == gold.concept {
                return Ok(Action::Shift {
                    rule,
                    concept: Rc::new(concept),
                });
            }
        }
        bail!(
            "no shift candidate for '{}' matches its gold fragment",
            self.lex.interner.resolve(tok.lemma)
        );
    }

    /// Enumerates every action applicable at `id`, reduces filtered by the
    /// label constraints.
    pub fn valid_actions(&self, id: StateId) -> Vec<Action> {
        let st = self.node(id);
        if matches!(st.prev_act, Some(Action::Empty)) {
            return vec![Action::Dummy];
        }

        let mut out = Vec::new();

        if st.right < self.toks.len() {
            if !matches!(st.prev_act, Some(Action::Reduce { .. })) {
                out.push(Action::Empty);
            }
            for (rule, concept) in self.lex.identify_concepts(&self.toks[st.right]) {
                out.push(Action::Shift {
                    rule,
                    concept: Rc::new(concept),
                });
            }
        }

        if let Some(left_id) = st.left {
            let left = self.node(left_id);
            let size = st.concept.as_ref().map_or(1, |c| c.size());
            let left_size = left.concept.as_ref().map_or(1, |c| c.size());
            for &label in self.lex.labels() {
                if left.top != 0 {
                    for position in 0..size {
                        if self.check_label_constraints(id, ReduceDir::Left, label, position) {
                            out.push(Action::Reduce {
                                dir: ReduceDir::Left,
                                label,
                                position,
                            });
                        }
                    }
                }
                // Attaching to ROOT is only legal once the buffer is empty.
                if left.top != 0 || st.right == self.toks.len() {
                    for position in 0..left_size {
                        if self.check_label_constraints(id, ReduceDir::Right, label, position) {
                            out.push(Action::Reduce {
                                dir: ReduceDir::Right,
                                label,
                                position,
                            });
                        }
                    }
                }
            }
        }

        out
    }

    /// Hard label constraints on a reduce at state `id`: ROOT accepts only
    /// a right attachment at position 0 under the root label; predicates
    /// accept ARG labels only for their licensed slots; non-predicates
    /// accept no ARG labels. Reversed labels are checked against the
    /// fragment that ends up as the semantic head.
    pub fn check_label_constraints(
        &self,
        id: StateId,
        dir: ReduceDir,
        label: Sym,
        position: usize,
    ) -> bool {
        let st = self.node(id);
        let Some(left_id) = st.left else {
            return false;
        };
        let Some(left_concept) = self.node(left_id).concept.as_ref() else {
            return dir == ReduceDir::Right
                && position == 0
                && label == self.lex.root_label();
        };
        let Some(concept) = st.concept.as_ref() else {
            return false;
        };

        let (tail, head) = match dir {
            ReduceDir::Right => (concept.as_ref(), left_concept.at_position(position)),
            ReduceDir::Left => (left_concept.as_ref(), concept.at_position(position)),
        };
        let Some(head) = head else {
            return false;
        };

        let (label, pred) = match self.lex.reverse_of(label) {
            Some(base) => (base, tail.id),
            None => (label, head.id),
        };

        if self.lex.is_predicate(pred) {
            self.lex.allows_label(pred, label)
        } else {
            !self.lex.is_arg_label(label)
        }
    }

    /// Derivation history of `id`, oldest first, excluding the initial
    /// state.
    pub fn state_sequence(&self, id: StateId) -> Vec<StateId> {
        let mut chain = self.chain(id);
        chain.remove(0);
        chain
    }

    fn chain(&self, id: StateId) -> Vec<StateId> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            out.push(c);
            cur = self.node(c).prev;
        }
        out.reverse();
        out
    }

    /// Assembles the concept graph encoded by the terminal state `id` by
    /// replaying its reduces over mutable fragment handles. Attachment
    /// positions are resolved at replay time, newest reduce first, which
    /// reproduces positions taken relative to fragments that later
    /// reduces have already grown. Yields the `amr-empty` concept when
    /// nothing was shifted.
    pub fn to_graph(&self, id: StateId) -> Result<Concept> {
        let chain = self.chain(id);
        // The terminal action only attaches the finished fragment to
        // ROOT; the fragment itself is the graph, so that action is not
        // replayed.
        let replayed = chain
            .get(1..chain.len().saturating_sub(1))
            .unwrap_or_default();

        let mut stack: Vec<Handle> = Vec::new();
        let mut ops: Vec<ReduceOp> = Vec::new();
        for &sid in replayed {
            let act = self
                .node(sid)
                .prev_act
                .as_ref()
                .context("non-initial state without an action")?;
            match act {
                Action::Shift { concept, .. } => stack.push(thaw(concept)),
                Action::Empty | Action::Dummy => {}
                Action::Reduce { dir, label, position } => {
                    if stack.len() < 2 {
                        bail!("reduce replay on a stack of {} fragments", stack.len());
                    }
                    let s0 = Rc::clone(&stack[stack.len() - 1]);
                    let s1 = Rc::clone(&stack[stack.len() - 2]);
                    ops.push(ReduceOp {
                        dir: *dir,
                        label: *label,
                        position: *position,
                        s0,
                        s1,
                    });
                    match dir {
                        ReduceDir::Left => {
                            let below = stack.len() - 2;
                            stack.remove(below);
                        }
                        ReduceDir::Right => {
                            stack.pop();
                        }
                    }
                }
            }
        }

        for op in ops.iter().rev() {
            let (tail, head_root) = match op.dir {
                ReduceDir::Left => (&op.s1, &op.s0),
                ReduceDir::Right => (&op.s0, &op.s1),
            };
            let head = node_at(head_root, op.position).with_context(|| {
                format!("attachment position {} out of range", op.position)
            })?;
            head.borrow_mut().children.push((op.label, Rc::clone(tail)));
        }

        match stack.last() {
            Some(root) => Ok(freeze(root)),
            None => Ok(Concept::new(self.lex.interner.intern(EMPTY_CONCEPT))),
        }
    }
}

/// Mutable fragment node used during graph recovery.
struct MutNode {
    id: Sym,
    children: Vec<(Sym, Handle)>,
}

type Handle = Rc<RefCell<MutNode>>;

struct ReduceOp {
    dir: ReduceDir,
    label: Sym,
    position: usize,
    s0: Handle,
    s1: Handle,
}

fn thaw(c: &Concept) -> Handle {
    let children = c
        .children
        .iter()
        .map(|(label, child)| (*label, thaw(child)))
        .collect();
    Rc::new(RefCell::new(MutNode { id: c.id, children }))
}

/// Pre-order lookup over handles; mirrors [`Concept::at_position`].
fn node_at(root: &Handle, position: usize) -> Option<Handle> {
    fn walk(node: &Handle, remaining: &mut usize) -> Option<Handle> {
        if *remaining == 0 {
            return Some(Rc::clone(node));
        }
        *remaining -= 1;
        for (_, child) in node.borrow().children.iter() {
            if let Some(found) = walk(child, remaining) {
                return Some(found);
            }
        }
        None
    }
    let mut remaining = position;
    walk(root, &mut remaining)
}

fn freeze(node: &Handle) -> Concept {
    let inner = node.borrow();
    let mut out = Concept::new(inner.id);
    for (label, child) in inner.children.iter() {
        out.add_child(*label, freeze(child));
    }
    out
}
