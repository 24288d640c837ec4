//! Anchor specifications and per-node normalization.
//!
//! An [`Anchors`] value is the ordered list of layout relationships declared
//! under one node. Before resolution the list is normalized: specs sharing
//! the same (relation, target, target attribute, constant, multiplier) key
//! merge their attribute sets, and a later mention of the same single
//! attribute under a different key wins over the earlier one.

use std::collections::HashMap;
use std::ops::Add;

use indexmap::IndexMap;

use crate::item::{ItemId, ItemRef, WeakItem};

/// Layout attribute of an element edge or dimension.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Attribute {
    Top,
    Bottom,
    Leading,
    Trailing,
    Left,
    Right,
    CenterX,
    CenterY,
    Width,
    Height,
    FirstBaseline,
    LastBaseline,
}

impl Attribute {
    /// Width and height constrain the element itself; every other attribute
    /// relates two items.
    pub fn is_dimension(self) -> bool {
        matches!(self, Attribute::Width | Attribute::Height)
    }

    pub(crate) fn token(self) -> &'static str {
        match self {
            Attribute::Top => "top",
            Attribute::Bottom => "bottom",
            Attribute::Leading => "leading",
            Attribute::Trailing => "trailing",
            Attribute::Left => "left",
            Attribute::Right => "right",
            Attribute::CenterX => "centerX",
            Attribute::CenterY => "centerY",
            Attribute::Width => "width",
            Attribute::Height => "height",
            Attribute::FirstBaseline => "firstBaseline",
            Attribute::LastBaseline => "lastBaseline",
        }
    }
}

/// Relation between the source attribute and its target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Relation {
    #[default]
    Equal,
    GreaterOrEqual,
    LessOrEqual,
}

/// Second item of a relationship, before resolution.
#[derive(Clone, Debug, Default)]
pub enum AnchorTarget {
    /// Explicit element reference.
    Item(WeakItem),
    /// Named reference, resolved against the identifier table collected in
    /// the flattener's first pass. Unresolvable names fall back to the
    /// implicit parent.
    Identifier(String),
    /// The parent carried by the flattening traversal.
    #[default]
    ImplicitParent,
    /// No second item for dimension attributes (fixed-constant constraints);
    /// the implicit parent for everything else.
    Deny,
}

impl AnchorTarget {
    fn key(&self) -> TargetKey {
        match self {
            AnchorTarget::Item(item) => TargetKey::Item(item.id()),
            AnchorTarget::Identifier(name) => TargetKey::Identifier(name.clone()),
            AnchorTarget::ImplicitParent => TargetKey::Parent,
            AnchorTarget::Deny => TargetKey::Deny,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum TargetKey {
    Item(ItemId),
    Identifier(String),
    Parent,
    Deny,
}

/// One declared relationship: a set of attributes sharing the same relation,
/// target, constant and multiplier.
#[derive(Clone, Debug)]
pub struct AnchorSpec {
    pub attributes: Vec<Attribute>,
    pub relation: Relation,
    pub target: AnchorTarget,
    /// Attribute on the target item; `None` mirrors the source attribute.
    pub target_attribute: Option<Attribute>,
    pub constant: f64,
    pub multiplier: f64,
}

impl AnchorSpec {
    fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            relation: Relation::Equal,
            target: AnchorTarget::ImplicitParent,
            target_attribute: None,
            constant: 0.0,
            multiplier: 1.0,
        }
    }

    /// Merge key used by normalization and by the debug printer's grouping.
    /// Floats are keyed by bit pattern.
    fn key(&self) -> SpecKey {
        SpecKey {
            relation: self.relation,
            target: self.target.key(),
            target_attribute: self.target_attribute,
            constant: self.constant.to_bits(),
            multiplier: self.multiplier.to_bits(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct SpecKey {
    relation: Relation,
    target: TargetKey,
    target_attribute: Option<Attribute>,
    constant: u64,
    multiplier: u64,
}

/// Ordered collection of anchor specs declared under one node.
///
/// Every builder method applies to all specs currently in the collection, so
/// `Anchors::new([Top, Leading]).equal_to(&friend).constant(8.0)` declares
/// both attributes against `friend` with the same constant. Collections are
/// combined in declaration order with [`Anchors::union`] or `+`.
#[derive(Clone, Debug, Default)]
pub struct Anchors {
    specs: Vec<AnchorSpec>,
}

impl Anchors {
    pub fn new<I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = Attribute>,
    {
        Self {
            specs: vec![AnchorSpec::new(attributes.into_iter().collect())],
        }
    }

    /// Top, bottom, leading and trailing, each equal to the parent.
    pub fn all_sides() -> Self {
        Self::new([
            Attribute::Top,
            Attribute::Bottom,
            Attribute::Leading,
            Attribute::Trailing,
        ])
    }

    /// Top, leading and trailing.
    pub fn cap() -> Self {
        Self::new([Attribute::Top, Attribute::Leading, Attribute::Trailing])
    }

    /// Bottom, leading and trailing.
    pub fn shoe() -> Self {
        Self::new([Attribute::Bottom, Attribute::Leading, Attribute::Trailing])
    }

    pub fn center() -> Self {
        Self::new([Attribute::CenterX, Attribute::CenterY])
    }

    pub fn size() -> Self {
        Self::new([Attribute::Width, Attribute::Height])
    }

    fn to(mut self, relation: Relation, target: AnchorTarget) -> Self {
        for spec in &mut self.specs {
            spec.relation = relation;
            spec.target = target.clone();
        }
        self
    }

    pub fn equal_to(self, item: &ItemRef) -> Self {
        self.to(Relation::Equal, AnchorTarget::Item(WeakItem::new(item)))
    }

    pub fn equal_to_named(self, identifier: impl Into<String>) -> Self {
        self.to(Relation::Equal, AnchorTarget::Identifier(identifier.into()))
    }

    pub fn equal_to_parent(self) -> Self {
        self.to(Relation::Equal, AnchorTarget::ImplicitParent)
    }

    /// Fixed-constant form: no target item for dimension attributes.
    pub fn equal_to_constant(self, constant: f64) -> Self {
        self.to(Relation::Equal, AnchorTarget::Deny).constant(constant)
    }

    pub fn greater_or_equal_to(self, item: &ItemRef) -> Self {
        self.to(
            Relation::GreaterOrEqual,
            AnchorTarget::Item(WeakItem::new(item)),
        )
    }

    pub fn greater_or_equal_to_named(self, identifier: impl Into<String>) -> Self {
        self.to(
            Relation::GreaterOrEqual,
            AnchorTarget::Identifier(identifier.into()),
        )
    }

    pub fn greater_or_equal_to_parent(self) -> Self {
        self.to(Relation::GreaterOrEqual, AnchorTarget::ImplicitParent)
    }

    pub fn greater_or_equal_to_constant(self, constant: f64) -> Self {
        self.to(Relation::GreaterOrEqual, AnchorTarget::Deny)
            .constant(constant)
    }

    pub fn less_or_equal_to(self, item: &ItemRef) -> Self {
        self.to(
            Relation::LessOrEqual,
            AnchorTarget::Item(WeakItem::new(item)),
        )
    }

    pub fn less_or_equal_to_named(self, identifier: impl Into<String>) -> Self {
        self.to(
            Relation::LessOrEqual,
            AnchorTarget::Identifier(identifier.into()),
        )
    }

    pub fn less_or_equal_to_parent(self) -> Self {
        self.to(Relation::LessOrEqual, AnchorTarget::ImplicitParent)
    }

    pub fn less_or_equal_to_constant(self, constant: f64) -> Self {
        self.to(Relation::LessOrEqual, AnchorTarget::Deny)
            .constant(constant)
    }

    /// Attribute on the target item, when it differs from the source
    /// attribute (e.g. own top equal to a sibling's bottom).
    pub fn target_attribute(mut self, attribute: Attribute) -> Self {
        for spec in &mut self.specs {
            spec.target_attribute = Some(attribute);
        }
        self
    }

    pub fn constant(mut self, constant: f64) -> Self {
        for spec in &mut self.specs {
            spec.constant = constant;
        }
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        for spec in &mut self.specs {
            spec.multiplier = multiplier;
        }
        self
    }

    /// Append `other`'s specs after this collection's, preserving order.
    pub fn union(mut self, other: Anchors) -> Self {
        self.specs.extend(other.specs);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[AnchorSpec] {
        &self.specs
    }

    /// Deduplicated, order-stable spec list: no attribute appears in more
    /// than one emitted spec.
    pub fn normalized(&self) -> Vec<AnchorSpec> {
        normalize(&self.specs).0
    }

    pub(crate) fn normalized_with_overwrites(&self) -> (Vec<AnchorSpec>, Vec<Attribute>) {
        normalize(&self.specs)
    }
}

impl Add for Anchors {
    type Output = Anchors;

    fn add(self, rhs: Anchors) -> Anchors {
        self.union(rhs)
    }
}

/// Spec merge. Groups are keyed by [`AnchorSpec::key`] in first-seen order;
/// within a group, attributes keep insertion order. An attribute reappearing
/// under the same key collapses silently; reappearing under a different key
/// moves it to the later group and records an overwrite.
fn normalize(specs: &[AnchorSpec]) -> (Vec<AnchorSpec>, Vec<Attribute>) {
    let mut groups: IndexMap<SpecKey, AnchorSpec> = IndexMap::new();
    let mut owner: HashMap<Attribute, SpecKey> = HashMap::new();
    let mut overwrites: Vec<Attribute> = Vec::new();

    for spec in specs {
        let key = spec.key();
        for &attribute in &spec.attributes {
            match owner.get(&attribute) {
                Some(previous) if *previous == key => continue,
                Some(previous) => {
                    if let Some(group) = groups.get_mut(previous) {
                        group.attributes.retain(|a| *a != attribute);
                    }
                    overwrites.push(attribute);
                }
                None => {}
            }
            groups
                .entry(key.clone())
                .or_insert_with(|| AnchorSpec {
                    attributes: Vec::new(),
                    ..spec.clone()
                })
                .attributes
                .push(attribute);
            owner.insert(attribute, key.clone());
        }
    }

    let merged = groups
        .into_values()
        .filter(|group| !group.attributes.is_empty())
        .collect();
    (merged, overwrites)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_attributes_collapse_into_one_spec() {
        let anchors = Anchors::all_sides()
            + Anchors::cap()
            + Anchors::shoe()
            + Anchors::new([Attribute::Height])
            + Anchors::new([Attribute::Width])
            + Anchors::new([Attribute::Width]);

        let normalized = anchors.normalized();
        assert_eq!(normalized.len(), 1);
        assert_eq!(
            normalized[0].attributes,
            vec![
                Attribute::Top,
                Attribute::Bottom,
                Attribute::Leading,
                Attribute::Trailing,
                Attribute::Height,
                Attribute::Width,
            ]
        );
    }

    #[test]
    fn identical_keyed_specs_stay_grouped() {
        let anchors = Anchors::cap()
            + Anchors::new([Attribute::Height]).equal_to_constant(44.0)
            + Anchors::new([Attribute::Height]).equal_to_constant(44.0);

        let normalized = anchors.normalized();
        assert_eq!(normalized.len(), 2);
        assert_eq!(
            normalized[0].attributes,
            vec![Attribute::Top, Attribute::Leading, Attribute::Trailing]
        );
        assert_eq!(normalized[1].attributes, vec![Attribute::Height]);
        assert_eq!(normalized[1].constant, 44.0);
    }

    #[test]
    fn later_spec_for_same_attribute_wins() {
        let anchors = Anchors::cap() + Anchors::new([Attribute::Top]).constant(8.0);

        let (normalized, overwrites) = anchors.normalized_with_overwrites();
        assert_eq!(overwrites, vec![Attribute::Top]);
        assert_eq!(normalized.len(), 2);
        assert_eq!(
            normalized[0].attributes,
            vec![Attribute::Leading, Attribute::Trailing]
        );
        assert_eq!(normalized[1].attributes, vec![Attribute::Top]);
        assert_eq!(normalized[1].constant, 8.0);
    }

    #[test]
    fn overwrite_dropping_a_whole_group_keeps_remaining_order() {
        let anchors = Anchors::new([Attribute::Width]).equal_to_constant(10.0)
            + Anchors::cap()
            + Anchors::new([Attribute::Width]).equal_to_constant(20.0);

        let normalized = anchors.normalized();
        assert_eq!(normalized.len(), 2);
        assert_eq!(
            normalized[0].attributes,
            vec![Attribute::Top, Attribute::Leading, Attribute::Trailing]
        );
        assert_eq!(normalized[1].attributes, vec![Attribute::Width]);
        assert_eq!(normalized[1].constant, 20.0);
    }

    #[test]
    fn named_and_parent_targets_do_not_merge() {
        let anchors = Anchors::new([Attribute::Top])
            + Anchors::new([Attribute::Bottom]).equal_to_named("friend");

        let normalized = anchors.normalized();
        assert_eq!(normalized.len(), 2);
        assert!(matches!(normalized[0].target, AnchorTarget::ImplicitParent));
        assert!(matches!(normalized[1].target, AnchorTarget::Identifier(_)));
    }

    #[test]
    fn target_attribute_override_separates_groups() {
        let anchors = Anchors::new([Attribute::Top])
            .equal_to_named("label")
            .target_attribute(Attribute::Bottom)
            + Anchors::new([Attribute::Bottom]).equal_to_named("label");

        assert_eq!(anchors.normalized().len(), 2);
    }
}
