//! The element seam.
//!
//! Trellis reconciles structure onto elements it does not own. The platform
//! side implements [`LayoutItem`] for its element type; the engine works
//! exclusively through `Rc<dyn LayoutItem>` handles and keeps nothing but
//! [`WeakItem`]s in retained state, so dropping the last external owner of
//! an element reclaims it even while the engine still names it.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constraint::ConstraintRef;
use crate::primitives::Rect;

/// Stable identity for a layout item.
///
/// Monotonic and process-wide. Identity comparisons between weak handles go
/// through the id, so a dead handle still compares correctly against the
/// element it used to point at even if its address is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    /// Allocate the next process-wide id. Platform implementations call this
    /// once per element at construction.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

/// An externally owned element that can participate in reconciliation.
///
/// All methods take `&self`; implementations are expected to use interior
/// mutability, matching the single-owner-thread model. `add_child` must
/// implicitly detach the child from any different prior parent.
pub trait LayoutItem {
    fn id(&self) -> ItemId;

    /// Display name used by the debug printer when no identifier or override
    /// is available.
    fn tag(&self) -> String;

    fn identifier(&self) -> Option<String>;
    fn set_identifier(&self, identifier: &str);

    fn parent(&self) -> Option<ItemRef>;
    fn children(&self) -> Vec<ItemRef>;

    /// Attach `child` as the last child of this element, reparenting it away
    /// from any previous parent.
    fn add_child(&self, child: &ItemRef);

    /// Remove `child` from this element's children. Must be a no-op when
    /// `child` is not actually a child.
    fn remove_child(&self, child: &ItemRef);

    /// Constraint bookkeeping for handles anchored at this element.
    fn install(&self, constraint: ConstraintRef);
    fn uninstall(&self, constraint: &ConstraintRef);
    fn installed(&self) -> Vec<ConstraintRef>;

    /// Current geometry, captured by the animation pass.
    fn frame(&self) -> Rect {
        Rect::ZERO
    }

    /// Request a layout pass; invoked on the root after an animated
    /// reconciliation.
    fn layout_if_needed(&self) {}

    /// Concrete-type escape hatch for platform implementations that need to
    /// reach their own element type from an `ItemRef` (e.g. inside
    /// `add_child`).
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an externally owned element.
pub type ItemRef = Rc<dyn LayoutItem>;

/// Non-owning handle to an element.
///
/// Equality and hashing use the element's [`ItemId`], never the allocation,
/// so comparisons stay meaningful after the element dies.
#[derive(Clone)]
pub struct WeakItem {
    id: ItemId,
    inner: Weak<dyn LayoutItem>,
}

impl WeakItem {
    pub fn new(item: &ItemRef) -> Self {
        Self {
            id: item.id(),
            inner: Rc::downgrade(item),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn upgrade(&self) -> Option<ItemRef> {
        self.inner.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl PartialEq for WeakItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WeakItem {}

impl Hash for WeakItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for WeakItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_alive() {
            write!(f, "WeakItem({:?})", self.id)
        } else {
            write!(f, "WeakItem({:?}, dead)", self.id)
        }
    }
}

/// Detach `item` from `recorded`, but only while the element graph still
/// agrees that `recorded` is the parent. Externally re-parented elements and
/// elements whose owner already released them are left alone.
///
/// Returns whether a detach actually happened.
pub(crate) fn detach_guarded(recorded: &Option<WeakItem>, item: &WeakItem) -> bool {
    let Some(item) = item.upgrade() else {
        return false;
    };
    let Some(recorded) = recorded.as_ref() else {
        return false;
    };
    match item.parent() {
        Some(current) if current.id() == recorded.id() => {
            current.remove_child(&item);
            true
        }
        _ => false,
    }
}
