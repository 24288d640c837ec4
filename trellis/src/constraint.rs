//! Concrete constraint handles.
//!
//! A [`ConstraintHandle`] is the activatable form of one resolved
//! single-attribute relationship. Handles hold only weak references to their
//! items; an activation on a dead item is silently skipped. The engine
//! rebuilds the full handle set on every reconciliation instead of diffing
//! it, which keeps repeated passes trivially idempotent.

use std::cell::Cell;
use std::rc::Rc;

use crate::anchors::{Attribute, Relation};
use crate::item::{LayoutItem, WeakItem};

/// A fully resolved single-attribute relationship, ready to become a handle.
#[derive(Clone, Debug)]
pub struct ResolvedConstraint {
    pub item: WeakItem,
    pub attribute: Attribute,
    pub relation: Relation,
    /// `None` for fixed-constant dimension constraints.
    pub target: Option<WeakItem>,
    pub target_attribute: Attribute,
    pub constant: f64,
    pub multiplier: f64,
}

/// An activatable constraint. Active handles are installed into their first
/// item's bookkeeping so the debug printer can read them back off the graph.
#[derive(Debug)]
pub struct ConstraintHandle {
    resolved: ResolvedConstraint,
    user_created: bool,
    active: Cell<bool>,
}

pub type ConstraintRef = Rc<ConstraintHandle>;

impl ConstraintHandle {
    pub fn new(resolved: ResolvedConstraint) -> ConstraintRef {
        Rc::new(Self {
            resolved,
            user_created: true,
            active: Cell::new(false),
        })
    }

    /// Platform-generated handle; the debug printer hides these by default.
    pub fn system(resolved: ResolvedConstraint) -> ConstraintRef {
        Rc::new(Self {
            resolved,
            user_created: false,
            active: Cell::new(false),
        })
    }

    pub fn resolved(&self) -> &ResolvedConstraint {
        &self.resolved
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_user_created(&self) -> bool {
        self.user_created
    }

    pub fn activate(this: &ConstraintRef) {
        if this.active.get() {
            return;
        }
        if let Some(item) = this.resolved.item.upgrade() {
            item.install(Rc::clone(this));
            this.active.set(true);
        }
    }

    pub fn deactivate(this: &ConstraintRef) {
        if !this.active.get() {
            return;
        }
        if let Some(item) = this.resolved.item.upgrade() {
            item.uninstall(this);
        }
        this.active.set(false);
    }
}

/// Activate a batch of handles in order.
pub fn activate_all(handles: &[ConstraintRef]) {
    for handle in handles {
        ConstraintHandle::activate(handle);
    }
}

/// Deactivate a batch of handles in order.
pub fn deactivate_all(handles: &[ConstraintRef]) {
    for handle in handles {
        ConstraintHandle::deactivate(handle);
    }
}
