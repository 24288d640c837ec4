//! Declaration tree grammar.
//!
//! A [`Declaration`] is the ephemeral tree a caller rebuilds on every pass.
//! The grammar is closed: one tagged variant and a single recursive
//! flattening function over it, no trait objects. Recursive positions are
//! boxed to break the size recursion.
//!
//! Constructors are pure; nothing touches the element graph until
//! [`reconcile`](crate::activator::reconcile) runs.

use crate::anchors::Anchors;
use crate::item::ItemRef;

/// One node of a declaration tree.
#[derive(Clone)]
pub enum Declaration {
    /// A concrete element, its anchors, and its declared children.
    Leaf {
        item: ItemRef,
        anchors: Anchors,
        children: Vec<Declaration>,
    },

    /// Ordered run of sub-declarations sharing the current parent.
    Sequence(Vec<Declaration>),

    /// A sub-declaration that is present or absent, selected once per pass.
    Optional(Option<Box<Declaration>>),

    /// Exactly one of two mutually exclusive alternatives. Both branches are
    /// kept so the unselected one remains structurally distinct from absence.
    Either {
        condition: bool,
        primary: Box<Declaration>,
        secondary: Box<Declaration>,
    },

    /// Homogeneous sub-declarations mapped from external data, input order
    /// preserved.
    Repeated(Vec<Declaration>),

    /// Nothing.
    Empty,
}

impl Declaration {
    pub fn leaf(item: &ItemRef) -> Self {
        Declaration::Leaf {
            item: item.clone(),
            anchors: Anchors::default(),
            children: Vec::new(),
        }
    }

    pub fn sequence(children: impl IntoIterator<Item = Declaration>) -> Self {
        Declaration::Sequence(children.into_iter().collect())
    }

    pub fn optional(inner: Option<Declaration>) -> Self {
        Declaration::Optional(inner.map(Box::new))
    }

    pub fn either(condition: bool, primary: Declaration, secondary: Declaration) -> Self {
        Declaration::Either {
            condition,
            primary: Box::new(primary),
            secondary: Box::new(secondary),
        }
    }

    pub fn repeated(children: impl IntoIterator<Item = Declaration>) -> Self {
        Declaration::Repeated(children.into_iter().collect())
    }

    pub fn empty() -> Self {
        Declaration::Empty
    }

    /// Declare anchors on a leaf. Repeated calls accumulate in order.
    pub fn anchors(mut self, anchors: Anchors) -> Self {
        match &mut self {
            Declaration::Leaf { anchors: own, .. } => {
                *own = std::mem::take(own).union(anchors);
            }
            _ => debug_assert!(false, "anchors can only be declared on a leaf"),
        }
        self
    }

    /// Append one child declaration to a leaf or a sequence.
    pub fn child(mut self, child: Declaration) -> Self {
        match &mut self {
            Declaration::Leaf { children, .. } => children.push(child),
            Declaration::Sequence(children) => children.push(child),
            Declaration::Repeated(children) => children.push(child),
            _ => debug_assert!(false, "children can only be appended to a leaf or sequence"),
        }
        self
    }

    /// Append every child declaration in order.
    pub fn children(self, children: impl IntoIterator<Item = Declaration>) -> Self {
        children.into_iter().fold(self, Declaration::child)
    }
}
