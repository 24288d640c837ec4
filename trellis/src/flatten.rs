//! Two-pass flattening of a declaration tree.
//!
//! Pass one walks the selected shape of the tree and collects every
//! explicitly identified element into a [`NameTable`], so that constraints
//! may name elements declared later (forward references). Pass two
//! linearizes the tree depth-first into an ordered `(parent, item)` sequence,
//! carrying the current parent explicitly as traversal state, and resolves
//! every anchor target while it still knows that parent.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::anchors::{AnchorSpec, AnchorTarget, Attribute};
use crate::constraint::ResolvedConstraint;
use crate::declaration::Declaration;
use crate::item::{ItemId, ItemRef, LayoutItem, WeakItem};

/// One ordered `(parent, item)` pair produced by linearization.
///
/// Two pairs are equal iff both references are identity-equal; a flattened
/// sequence never contains the same pair twice.
#[derive(Clone, Debug)]
pub struct FlattenedElement {
    pub parent: Option<WeakItem>,
    pub item: WeakItem,
}

impl FlattenedElement {
    pub(crate) fn key(&self) -> (Option<ItemId>, ItemId) {
        (self.parent.as_ref().map(WeakItem::id), self.item.id())
    }
}

impl PartialEq for FlattenedElement {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FlattenedElement {}

/// Identifier to element table. When two elements declare the same
/// identifier, the later-visited one wins.
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    entries: IndexMap<String, WeakItem>,
}

impl NameTable {
    /// Look up an identifier; dead references resolve to `None`.
    pub fn resolve(&self, identifier: &str) -> Option<ItemRef> {
        self.entries.get(identifier).and_then(WeakItem::upgrade)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, identifier: String, item: WeakItem) {
        self.entries.insert(identifier, item);
    }

    /// Rebuild the table from an already-flattened sequence. Used after
    /// identifier assignment so auto-assigned names are visible to
    /// [`Activation::find`](crate::retained::Activation::find).
    pub(crate) fn from_elements(elements: &[FlattenedElement]) -> NameTable {
        let mut table = NameTable::default();
        for element in elements {
            if let Some(item) = element.item.upgrade() {
                if let Some(identifier) = item.identifier() {
                    table.insert(identifier, element.item.clone());
                }
            }
        }
        table
    }
}

/// Result of flattening one declaration tree.
pub struct FlattenedLayout {
    pub elements: Vec<FlattenedElement>,
    pub constraints: Vec<ResolvedConstraint>,
    pub names: NameTable,
}

/// Flatten a declaration tree into ordered elements and resolved
/// constraints. Output order is declaration order.
pub fn flatten(declaration: &Declaration) -> FlattenedLayout {
    let mut names = NameTable::default();
    collect_names(declaration, &mut names);

    let mut elements = Vec::new();
    let mut constraints = Vec::new();
    let mut seen = HashSet::new();
    linearize(
        declaration,
        None,
        &names,
        &mut elements,
        &mut constraints,
        &mut seen,
    );

    FlattenedLayout {
        elements,
        constraints,
        names,
    }
}

fn collect_names(declaration: &Declaration, table: &mut NameTable) {
    match declaration {
        Declaration::Leaf { item, children, .. } => {
            if let Some(identifier) = item.identifier() {
                table.insert(identifier, WeakItem::new(item));
            }
            for child in children {
                collect_names(child, table);
            }
        }
        Declaration::Sequence(children) | Declaration::Repeated(children) => {
            for child in children {
                collect_names(child, table);
            }
        }
        Declaration::Optional(Some(inner)) => collect_names(inner, table),
        Declaration::Optional(None) | Declaration::Empty => {}
        Declaration::Either {
            condition,
            primary,
            secondary,
        } => {
            collect_names(if *condition { primary } else { secondary }, table);
        }
    }
}

fn linearize(
    declaration: &Declaration,
    parent: Option<&ItemRef>,
    names: &NameTable,
    elements: &mut Vec<FlattenedElement>,
    constraints: &mut Vec<ResolvedConstraint>,
    seen: &mut HashSet<(Option<ItemId>, ItemId)>,
) {
    match declaration {
        Declaration::Leaf {
            item,
            anchors,
            children,
        } => {
            let element = FlattenedElement {
                parent: parent.map(WeakItem::new),
                item: WeakItem::new(item),
            };
            if seen.insert(element.key()) {
                elements.push(element);
            }
            for spec in anchors.normalized() {
                resolve_spec(item, &spec, parent, names, constraints);
            }
            for child in children {
                linearize(child, Some(item), names, elements, constraints, seen);
            }
        }
        Declaration::Sequence(children) | Declaration::Repeated(children) => {
            for child in children {
                linearize(child, parent, names, elements, constraints, seen);
            }
        }
        Declaration::Optional(Some(inner)) => {
            linearize(inner, parent, names, elements, constraints, seen);
        }
        Declaration::Optional(None) | Declaration::Empty => {}
        Declaration::Either {
            condition,
            primary,
            secondary,
        } => {
            let selected = if *condition { primary } else { secondary };
            linearize(selected, parent, names, elements, constraints, seen);
        }
    }
}

fn resolve_spec(
    item: &ItemRef,
    spec: &AnchorSpec,
    parent: Option<&ItemRef>,
    names: &NameTable,
    constraints: &mut Vec<ResolvedConstraint>,
) {
    for &attribute in &spec.attributes {
        let target = resolve_target(&spec.target, attribute, parent, names);
        debug_assert!(
            target.is_some() || attribute.is_dimension(),
            "non-dimension attribute {attribute:?} resolved without a target item"
        );
        constraints.push(ResolvedConstraint {
            item: WeakItem::new(item),
            attribute,
            relation: spec.relation,
            target,
            target_attribute: spec.target_attribute.unwrap_or(attribute),
            constant: spec.constant,
            multiplier: spec.multiplier,
        });
    }
}

/// Target resolution: explicit items pass through, identifiers resolve via
/// the name table and fall back to the implicit parent, `Deny` yields no
/// second item for dimensions and the parent otherwise.
fn resolve_target(
    target: &AnchorTarget,
    attribute: Attribute,
    parent: Option<&ItemRef>,
    names: &NameTable,
) -> Option<WeakItem> {
    match target {
        AnchorTarget::Item(weak) => Some(weak.clone()),
        AnchorTarget::Identifier(name) => names
            .resolve(name)
            .map(|item| WeakItem::new(&item))
            .or_else(|| parent.map(WeakItem::new)),
        AnchorTarget::ImplicitParent => parent.map(WeakItem::new),
        AnchorTarget::Deny => {
            if attribute.is_dimension() {
                None
            } else {
                parent.map(WeakItem::new)
            }
        }
    }
}
