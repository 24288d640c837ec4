//! Trellis: declarative layout reconciliation for retained element graphs.
//!
//! Callers describe the tree of elements they want, plus the constraint
//! relationships between them, as a cheap immutable [`Declaration`] rebuilt
//! on every pass. The engine flattens that declaration, diffs it against the
//! previously retained state, and applies the minimal structural mutations
//! plus a fresh batch of constraint activations.
//!
//! # Architecture
//!
//! ```text
//! Declaration tree -> flatten() -> ordered (parent, item) pairs + resolved
//! constraints -> reconcile() -> detach/attach + deactivate/activate ->
//! Activation (retained state for the next pass)
//! ```
//!
//! The engine never owns elements: the platform side implements
//! [`LayoutItem`] and keeps ownership (typically a parent owning its
//! children); retained state holds only weak handles. Reconciling the same
//! declaration twice performs no structural mutation the second time, and
//! dropping the [`Activation`] tears the tracked layout down without
//! deallocating anything.
//!
//! # Usage
//!
//! ```ignore
//! use trellis::{activate, Anchors, Declaration};
//!
//! let declaration = Declaration::leaf(&root).child(
//!     Declaration::leaf(&child).anchors(Anchors::all_sides()),
//! );
//! let activation = activate(&declaration, Default::default());
//! // later, after state changes:
//! let activation = trellis::reconcile(&build(), Some(activation), Default::default());
//! ```

// Core primitives
pub mod item;
pub mod primitives;

// Specification model
pub mod anchors;
pub mod declaration;

// Flattening and activation
pub mod activator;
pub mod constraint;
pub mod flatten;
pub mod retained;

// Diagnostics
pub mod lint;
pub mod printer;

// Re-export core types
pub use activator::{AnimationCallback, LayoutHost, ReconcileOptions, activate, reconcile};
pub use anchors::{AnchorSpec, AnchorTarget, Anchors, Attribute, Relation};
pub use constraint::{
    ConstraintHandle, ConstraintRef, ResolvedConstraint, activate_all, deactivate_all,
};
pub use declaration::Declaration;
pub use flatten::{FlattenedElement, FlattenedLayout, NameTable, flatten};
pub use item::{ItemId, ItemRef, LayoutItem, WeakItem};
pub use lint::{DeclarationConflict, lint};
pub use printer::TreePrinter;
pub use primitives::{Point, Rect, Size};
pub use retained::Activation;
