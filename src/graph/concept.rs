// src/graph/concept.rs

//! The concept tree data structure and its pre-order addressing scheme.

use crate::intern::Sym;

/// A node in a rooted, ordered concept tree.
///
/// Equality and hashing are structural: two concepts are equal when their
/// identifiers match and their child lists are pairwise equal, labels
/// included, in order. Ownership of children is exclusive; a node belongs
/// to exactly one parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Concept {
    pub id: Sym,
    pub children: Vec<(Sym, Concept)>,
}

impl Concept {
    pub fn new(id: Sym) -> Self {
        Concept {
            id,
            children: Vec::new(),
        }
    }

    /// Appends `child` under this node with the given edge label.
    pub fn add_child(&mut self, label: Sym, child: Concept) {
        self.children.push((label, child));
    }

    /// Number of nodes in the fragment rooted here.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|(_, c)| c.size()).sum::<usize>()
    }

    /// Pre-order traversal over the fragment, root first, children
    /// left to right. Traversal order matches serialization order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// The node at 0-indexed pre-order rank `position`, if in bounds.
    pub fn at_position(&self, position: usize) -> Option<&Concept> {
        self.preorder().nth(position)
    }

    /// Pre-order rank of `target` within this fragment, located by node
    /// identity (address), not structural equality.
    pub fn position_of(&self, target: &Concept) -> Option<usize> {
        self.preorder()
            .position(|node| std::ptr::eq(node, target))
    }

    /// An order-sensitive structural hash used as the concept's
    /// contribution to action-identity features.
    pub fn feature_hash(&self) -> i32 {
        let mut h: i32 = 7;
        h = h.wrapping_mul(97).wrapping_add(self.id.feat());
        for (label, child) in &self.children {
            h = h.wrapping_mul(97).wrapping_add(label.feat());
            h = h.wrapping_mul(97).wrapping_add(child.feature_hash());
        }
        h
    }
}

/// Iterator produced by [`Concept::preorder`].
pub struct Preorder<'a> {
    stack: Vec<&'a Concept>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Concept;

    fn next(&mut self) -> Option<&'a Concept> {
        let node = self.stack.pop()?;
        for (_, child) in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}
