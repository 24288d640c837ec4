//! Retained state and the caller-facing activation handle.

use tracing::debug;

use crate::constraint::{self, ConstraintRef};
use crate::flatten::{FlattenedElement, NameTable};
use crate::item::{self, ItemRef};

/// Everything carried between reconciliation passes: the previous flattened
/// sequence, the constraint handles activated for it, and the identifier
/// table it produced. Elements appear only as weak references.
#[derive(Default)]
pub struct RetainedState {
    pub(crate) elements: Vec<FlattenedElement>,
    pub(crate) constraints: Vec<ConstraintRef>,
    pub(crate) names: NameTable,
}

/// Handle returned by [`reconcile`](crate::activator::reconcile).
///
/// Holds the retained state for the next pass and answers identifier
/// lookups. Dropping the handle tears the layout down: every tracked
/// constraint is deactivated and every tracked element whose recorded parent
/// still matches is detached. Elements themselves are never deallocated by
/// the engine; their external owner controls that.
#[derive(Default)]
pub struct Activation {
    state: RetainedState,
}

impl Activation {
    pub(crate) fn new(state: RetainedState) -> Self {
        Self { state }
    }

    /// Identifier to element lookup against the table captured at the end
    /// of the last reconciliation. Returns `None` for unknown identifiers
    /// and for elements that have since been released.
    pub fn find(&self, identifier: &str) -> Option<ItemRef> {
        self.state.names.resolve(identifier)
    }

    /// The flattened `(parent, item)` sequence of the last pass, in
    /// declaration order.
    pub fn elements(&self) -> &[FlattenedElement] {
        &self.state.elements
    }

    /// The constraint handles activated by the last pass.
    pub fn constraints(&self) -> &[ConstraintRef] {
        &self.state.constraints
    }

    /// Explicit shutdown: deactivate every tracked constraint, then detach
    /// every tracked element whose recorded parent still matches its actual
    /// parent. Roots (recorded without a parent) are never touched.
    pub fn teardown(&mut self) {
        if self.state.elements.is_empty() && self.state.constraints.is_empty() {
            return;
        }
        constraint::deactivate_all(&self.state.constraints);
        let mut detached = 0usize;
        for element in &self.state.elements {
            if item::detach_guarded(&element.parent, &element.item) {
                detached += 1;
            }
        }
        debug!(
            constraints = self.state.constraints.len(),
            detached, "activation torn down"
        );
        self.state = RetainedState::default();
    }

    pub(crate) fn into_state(mut self) -> RetainedState {
        std::mem::take(&mut self.state)
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.teardown();
    }
}
