//! Mock element graph for exercising the reconciler.
//!
//! [`TestView`] is an in-memory stand-in for a platform element: it owns its
//! children (the usual platform ownership direction), tracks its installed
//! constraint handles, and counts every real mutation so tests can assert
//! that a repeated reconciliation touches nothing.
//!
//! The harness executes reconciliations through the same public entry points
//! an application would use; nothing here reaches into engine internals.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Once;

use tracing::trace;

use trellis::{
    Attribute, ConstraintHandle, ConstraintRef, ItemId, ItemRef, LayoutItem, Rect, Relation,
    ResolvedConstraint, WeakItem,
};

/// Mutation counters shared by every view created from one [`TestBench`].
#[derive(Default)]
pub struct Counters {
    pub attaches: Cell<usize>,
    pub detaches: Cell<usize>,
    pub installs: Cell<usize>,
    pub uninstalls: Cell<usize>,
}

impl Counters {
    pub fn reset(&self) {
        self.attaches.set(0);
        self.detaches.set(0);
        self.installs.set(0);
        self.uninstalls.set(0);
    }

    /// Attach plus detach count: the structural mutations a pass performed.
    pub fn structural(&self) -> usize {
        self.attaches.get() + self.detaches.get()
    }
}

/// In-memory stand-in for a platform view.
pub struct TestView {
    id: ItemId,
    tag: String,
    identifier: RefCell<Option<String>>,
    parent: RefCell<Option<WeakItem>>,
    children: RefCell<Vec<ItemRef>>,
    installed: RefCell<Vec<ConstraintRef>>,
    frame: Cell<Rect>,
    pub layout_passes: Cell<usize>,
    this: Weak<TestView>,
    counters: Rc<Counters>,
}

impl TestView {
    pub fn new(tag: &str, counters: Rc<Counters>) -> Rc<TestView> {
        Rc::new_cyclic(|this| TestView {
            id: ItemId::next(),
            tag: tag.to_owned(),
            identifier: RefCell::new(None),
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            installed: RefCell::new(Vec::new()),
            frame: Cell::new(Rect::ZERO),
            layout_passes: Cell::new(0),
            this: this.clone(),
            counters,
        })
    }

    /// This view as an engine-facing handle.
    pub fn item(self: &Rc<Self>) -> ItemRef {
        self.clone()
    }

    pub fn set_frame(&self, frame: Rect) {
        self.frame.set(frame);
    }
}

impl LayoutItem for TestView {
    fn id(&self) -> ItemId {
        self.id
    }

    fn tag(&self) -> String {
        self.tag.clone()
    }

    fn identifier(&self) -> Option<String> {
        self.identifier.borrow().clone()
    }

    fn set_identifier(&self, identifier: &str) {
        *self.identifier.borrow_mut() = Some(identifier.to_owned());
    }

    fn parent(&self) -> Option<ItemRef> {
        self.parent.borrow().as_ref().and_then(WeakItem::upgrade)
    }

    fn children(&self) -> Vec<ItemRef> {
        self.children.borrow().clone()
    }

    fn add_child(&self, child: &ItemRef) {
        if let Some(current) = child.parent() {
            if current.id() == self.id {
                return;
            }
            current.remove_child(child);
        }
        let this: ItemRef = self.this.upgrade().expect("parent alive during add_child");
        if let Some(view) = child.as_any().downcast_ref::<TestView>() {
            *view.parent.borrow_mut() = Some(WeakItem::new(&this));
        }
        self.children.borrow_mut().push(child.clone());
        self.counters.attaches.set(self.counters.attaches.get() + 1);
        trace!(parent = %self.tag, child = %child.tag(), "attach");
    }

    fn remove_child(&self, child: &ItemRef) {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|candidate| candidate.id() != child.id());
        if children.len() == before {
            return;
        }
        drop(children);
        if let Some(view) = child.as_any().downcast_ref::<TestView>() {
            *view.parent.borrow_mut() = None;
        }
        self.counters.detaches.set(self.counters.detaches.get() + 1);
        trace!(parent = %self.tag, child = %child.tag(), "detach");
    }

    fn install(&self, constraint: ConstraintRef) {
        self.installed.borrow_mut().push(constraint);
        self.counters.installs.set(self.counters.installs.get() + 1);
    }

    fn uninstall(&self, constraint: &ConstraintRef) {
        let mut installed = self.installed.borrow_mut();
        let before = installed.len();
        installed.retain(|candidate| !Rc::ptr_eq(candidate, constraint));
        if installed.len() != before {
            self.counters
                .uninstalls
                .set(self.counters.uninstalls.get() + 1);
        }
    }

    fn installed(&self) -> Vec<ConstraintRef> {
        self.installed.borrow().clone()
    }

    fn frame(&self) -> Rect {
        self.frame.get()
    }

    fn layout_if_needed(&self) {
        self.layout_passes.set(self.layout_passes.get() + 1);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Test harness: creates views wired to shared counters and initializes
/// tracing once per process.
pub struct TestBench {
    counters: Rc<Counters>,
}

impl TestBench {
    pub fn new() -> Self {
        init_tracing();
        Self {
            counters: Rc::new(Counters::default()),
        }
    }

    pub fn view(&self, tag: &str) -> Rc<TestView> {
        TestView::new(tag, self.counters.clone())
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

impl Default for TestBench {
    fn default() -> Self {
        Self::new()
    }
}

/// Install an already-active platform constraint on `item`, the way a
/// platform autogenerates sizing constraints outside the engine. The printer
/// hides these by default.
pub fn install_system_constraint(item: &ItemRef, attribute: Attribute, constant: f64) -> ConstraintRef {
    let handle = ConstraintHandle::system(ResolvedConstraint {
        item: WeakItem::new(item),
        attribute,
        relation: Relation::Equal,
        target: None,
        target_attribute: attribute,
        constant,
        multiplier: 1.0,
    });
    ConstraintHandle::activate(&handle);
    handle
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
