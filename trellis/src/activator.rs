//! The reconciler.
//!
//! One reconciliation is a single atomic transition from the previous
//! retained state to a freshly flattened declaration:
//!
//! 1. detach elements that left the declaration, guarded against external
//!    re-parenting;
//! 2. deactivate the entire previous constraint set (the new set is rebuilt
//!    fresh rather than diffed);
//! 3. attach the new sequence in declared order, skipping elements already
//!    under the right parent;
//! 4. optionally assign identifiers to unnamed elements;
//! 5. build and activate the new constraint handles as one batch;
//! 6. optionally run the animation pass for elements that were already
//!    attached before this call.
//!
//! Every step is best-effort: released elements and unresolved references
//! are skipped, never reported.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::constraint::{self, ConstraintHandle, ConstraintRef};
use crate::declaration::Declaration;
use crate::flatten::{self, FlattenedElement, NameTable};
use crate::item::{self, ItemRef, LayoutItem, WeakItem};
use crate::primitives::Rect;
use crate::retained::{Activation, RetainedState};

/// Per-element animation callback: `(element, before, after)`.
pub type AnimationCallback = Rc<dyn Fn(&ItemRef, Rect, Rect)>;

/// Options for one reconciliation pass.
#[derive(Default)]
pub struct ReconcileOptions {
    /// Assign identifiers from `identifier_table` to elements that lack one.
    pub automatic_identifier_assignment: bool,
    /// Caller-supplied name to element table used by identifier assignment.
    pub identifier_table: Vec<(String, WeakItem)>,
    /// Capture pre-pass geometry and invoke `on_animation` for elements that
    /// survive the pass.
    pub animated: bool,
    pub on_animation: Option<AnimationCallback>,
}

impl ReconcileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign_identifiers(mut self, table: Vec<(String, WeakItem)>) -> Self {
        self.automatic_identifier_assignment = true;
        self.identifier_table = table;
        self
    }

    pub fn animated(mut self, callback: AnimationCallback) -> Self {
        self.animated = true;
        self.on_animation = Some(callback);
        self
    }
}

/// First activation: reconcile against empty retained state.
pub fn activate(declaration: &Declaration, options: ReconcileOptions) -> Activation {
    reconcile(declaration, None, options)
}

/// Reconcile a declaration against the previous activation, returning the
/// activation that becomes "previous" on the next call.
pub fn reconcile(
    declaration: &Declaration,
    previous: Option<Activation>,
    options: ReconcileOptions,
) -> Activation {
    let new = flatten::flatten(declaration);
    let previous = previous.map(Activation::into_state).unwrap_or_default();

    // Step 1: structural removal, guarded against external re-parenting.
    let keep: HashSet<_> = new.elements.iter().map(FlattenedElement::key).collect();
    let mut removed = 0usize;
    for element in &previous.elements {
        if keep.contains(&element.key()) {
            continue;
        }
        if item::detach_guarded(&element.parent, &element.item) {
            removed += 1;
        }
    }

    // Step 2: the previous constraints go away wholesale.
    constraint::deactivate_all(&previous.constraints);

    // Pre-capture for step 6: only elements attached before this pass have a
    // meaningful "before" state.
    let captured: Vec<(WeakItem, Rect)> = if options.animated {
        new.elements
            .iter()
            .filter_map(|element| {
                let item = element.item.upgrade()?;
                item.parent()
                    .is_some()
                    .then(|| (element.item.clone(), item.frame()))
            })
            .collect()
    } else {
        Vec::new()
    };

    // Step 3: attach in declared order. An element already under the right
    // parent is a no-op; attaching implicitly detaches from a wrong one.
    let mut attached = 0usize;
    for element in &new.elements {
        let Some(item) = element.item.upgrade() else {
            continue;
        };
        let Some(parent) = element.parent.as_ref().and_then(WeakItem::upgrade) else {
            continue;
        };
        let already = item
            .parent()
            .is_some_and(|current| current.id() == parent.id());
        if !already {
            parent.add_child(&item);
            attached += 1;
        }
    }

    // Step 4: identifier assignment. Declared identifiers always win.
    if options.automatic_identifier_assignment {
        assign_identifiers(&options.identifier_table);
    }
    let names = NameTable::from_elements(&new.elements);

    // Step 5: fresh handles, activated as one batch.
    let handles: Vec<ConstraintRef> = new
        .constraints
        .iter()
        .cloned()
        .map(ConstraintHandle::new)
        .collect();
    constraint::activate_all(&handles);

    debug!(
        elements = new.elements.len(),
        removed,
        attached,
        constraints = handles.len(),
        "reconciled"
    );

    // Step 6: layout request plus before/after callbacks, fire-and-forget.
    if options.animated {
        animate(&new.elements, &captured, options.on_animation.as_ref());
    }

    Activation::new(RetainedState {
        elements: new.elements,
        constraints: handles,
        names,
    })
}

/// Owner-side convenience that stores the current [`Activation`] and
/// re-reconciles a freshly built declaration on demand. Dropping the host
/// tears the tracked layout down.
#[derive(Default)]
pub struct LayoutHost {
    activation: Option<Activation>,
}

impl LayoutHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the layout from `declaration`, carrying the previous pass as
    /// retained state.
    pub fn update_layout(&mut self, declaration: &Declaration, options: ReconcileOptions) {
        let previous = self.activation.take();
        self.activation = Some(reconcile(declaration, previous, options));
    }

    pub fn activation(&self) -> Option<&Activation> {
        self.activation.as_ref()
    }

    pub fn find(&self, identifier: &str) -> Option<ItemRef> {
        self.activation
            .as_ref()
            .and_then(|activation| activation.find(identifier))
    }

    pub fn teardown(&mut self) {
        self.activation = None;
    }
}

fn assign_identifiers(table: &[(String, WeakItem)]) {
    for (name, weak) in table {
        let Some(item) = weak.upgrade() else {
            continue;
        };
        if item.identifier().is_none() {
            item.set_identifier(name);
        }
    }
}

fn animate(
    elements: &[FlattenedElement],
    captured: &[(WeakItem, Rect)],
    callback: Option<&AnimationCallback>,
) {
    if let Some(root) = elements
        .iter()
        .find(|element| element.parent.is_none())
        .and_then(|element| element.item.upgrade())
    {
        root.layout_if_needed();
    }
    let Some(callback) = callback else {
        return;
    };
    for (weak, before) in captured {
        if let Some(item) = weak.upgrade() {
            let after = item.frame();
            let tag = item.tag();
            trace!(item = %tag, "animation callback");
            callback(&item, *before, after);
        }
    }
}
