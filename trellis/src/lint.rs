//! Advisory conflict diagnostics.
//!
//! Reconciliation resolves ambiguous declarations with deterministic
//! last-write-wins rules and never reports them. Callers that would rather
//! fail loudly run [`lint`] over the declaration first and treat a non-empty
//! result however they like; the engine's behavior is unaffected.

use indexmap::IndexMap;
use thiserror::Error;

use crate::anchors::Attribute;
use crate::declaration::Declaration;

/// An ambiguity the reconciler would resolve silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationConflict {
    #[error("identifier `{identifier}` is declared by more than one element; the later one wins")]
    DuplicateIdentifier { identifier: String },

    #[error("attribute `{attribute:?}` on `{tag}` is redeclared with different terms; the later declaration wins")]
    AttributeOverwrite { tag: String, attribute: Attribute },
}

/// Walk the selected shape of a declaration (the same shape flattening would
/// see) and report every conflict in traversal order.
pub fn lint(declaration: &Declaration) -> Vec<DeclarationConflict> {
    let mut conflicts = Vec::new();
    let mut identifiers: IndexMap<String, usize> = IndexMap::new();
    walk(declaration, &mut identifiers, &mut conflicts);

    for (identifier, count) in identifiers {
        if count > 1 {
            conflicts.push(DeclarationConflict::DuplicateIdentifier { identifier });
        }
    }
    conflicts
}

fn walk(
    declaration: &Declaration,
    identifiers: &mut IndexMap<String, usize>,
    conflicts: &mut Vec<DeclarationConflict>,
) {
    match declaration {
        Declaration::Leaf {
            item,
            anchors,
            children,
        } => {
            if let Some(identifier) = item.identifier() {
                *identifiers.entry(identifier).or_insert(0) += 1;
            }
            let (_, overwrites) = anchors.normalized_with_overwrites();
            for attribute in overwrites {
                conflicts.push(DeclarationConflict::AttributeOverwrite {
                    tag: item.tag(),
                    attribute,
                });
            }
            for child in children {
                walk(child, identifiers, conflicts);
            }
        }
        Declaration::Sequence(children) | Declaration::Repeated(children) => {
            for child in children {
                walk(child, identifiers, conflicts);
            }
        }
        Declaration::Optional(Some(inner)) => walk(inner, identifiers, conflicts),
        Declaration::Optional(None) | Declaration::Empty => {}
        Declaration::Either {
            condition,
            primary,
            secondary,
        } => {
            walk(
                if *condition { primary } else { secondary },
                identifiers,
                conflicts,
            );
        }
    }
}
