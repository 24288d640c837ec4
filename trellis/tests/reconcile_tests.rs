//! Reconciliation behavior: idempotence, scoping, conditional switching,
//! weak retention, identifier assignment, teardown, animation.

use std::cell::RefCell;
use std::rc::Rc;

use trellis::{
    Anchors, Attribute, Declaration, ItemId, LayoutItem, Rect, ReconcileOptions, WeakItem,
    activate, reconcile,
};
use trellis_testkit::TestBench;

fn element_keys(activation: &trellis::Activation) -> Vec<(Option<ItemId>, ItemId)> {
    activation
        .elements()
        .iter()
        .map(|element| {
            (
                element.parent.as_ref().map(|parent| parent.id()),
                element.item.id(),
            )
        })
        .collect()
}

#[test]
fn nested_tree_activates_and_repeats_without_mutation() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let a = bench.view("a");
    let b = bench.view("b");

    let build = || {
        Declaration::leaf(&root.item()).child(
            Declaration::leaf(&a.item())
                .anchors(Anchors::all_sides())
                .child(Declaration::leaf(&b.item()).anchors(Anchors::all_sides())),
        )
    };

    let first = activate(&build(), ReconcileOptions::default());
    let expected = vec![
        (None, root.id()),
        (Some(root.id()), a.id()),
        (Some(a.id()), b.id()),
    ];
    assert_eq!(element_keys(&first), expected);
    assert_eq!(first.constraints().len(), 8);
    assert_eq!(bench.counters().attaches.get(), 2);
    assert_eq!(a.parent().expect("a attached").id(), root.id());
    assert_eq!(b.parent().expect("b attached").id(), a.id());

    bench.counters().reset();
    let second = reconcile(&build(), Some(first), ReconcileOptions::default());

    assert_eq!(bench.counters().structural(), 0);
    assert_eq!(element_keys(&second), expected);
    assert_eq!(second.constraints().len(), 8);
}

#[test]
fn removing_a_subtree_detaches_only_that_subtree() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let a = bench.view("a");
    let b = bench.view("b");

    let full = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&a.item()).anchors(Anchors::all_sides()))
        .child(Declaration::leaf(&b.item()).anchors(Anchors::all_sides()));
    let activation = activate(&full, ReconcileOptions::default());

    bench.counters().reset();
    let trimmed = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&a.item()).anchors(Anchors::all_sides()));
    let activation = reconcile(&trimmed, Some(activation), ReconcileOptions::default());

    assert!(b.parent().is_none());
    assert!(b.installed().is_empty());
    assert_eq!(bench.counters().detaches.get(), 1);
    assert_eq!(bench.counters().attaches.get(), 0);
    assert_eq!(a.parent().expect("a untouched").id(), root.id());
    assert_eq!(a.installed().len(), 4);
    assert_eq!(activation.constraints().len(), 4);
}

#[test]
fn conditional_switch_moves_structure_and_constraints() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let leading = bench.view("leading");
    let trailing = bench.view("trailing");

    let build = |flag: bool| {
        Declaration::leaf(&root.item()).child(Declaration::either(
            flag,
            Declaration::leaf(&leading.item()).anchors(Anchors::cap()),
            Declaration::leaf(&trailing.item()).anchors(Anchors::shoe()),
        ))
    };

    let activation = activate(&build(true), ReconcileOptions::default());
    assert_eq!(
        element_keys(&activation),
        vec![(None, root.id()), (Some(root.id()), leading.id())]
    );
    assert_eq!(activation.constraints().len(), 3);
    assert_eq!(leading.installed().len(), 3);

    let activation = reconcile(&build(false), Some(activation), ReconcileOptions::default());
    assert!(leading.parent().is_none());
    assert!(leading.installed().is_empty());
    assert_eq!(trailing.parent().expect("trailing attached").id(), root.id());
    assert_eq!(trailing.installed().len(), 3);
    assert_eq!(activation.constraints().len(), 3);
}

#[test]
fn duplicate_declarations_activate_one_constraint_per_attribute() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let child = bench.view("child");

    let declaration = Declaration::leaf(&root.item()).child(
        Declaration::leaf(&child.item()).anchors(Anchors::all_sides() + Anchors::cap()),
    );
    let activation = activate(&declaration, ReconcileOptions::default());

    assert_eq!(activation.constraints().len(), 4);
    assert_eq!(child.installed().len(), 4);
}

#[test]
fn later_attribute_declaration_overwrites_earlier_one() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let child = bench.view("child");

    let declaration = Declaration::leaf(&root.item()).child(
        Declaration::leaf(&child.item())
            .anchors(Anchors::cap() + Anchors::new([Attribute::Top]).constant(8.0)),
    );
    let activation = activate(&declaration, ReconcileOptions::default());

    let tops: Vec<_> = activation
        .constraints()
        .iter()
        .filter(|handle| handle.resolved().attribute == Attribute::Top)
        .collect();
    assert_eq!(tops.len(), 1);
    assert_eq!(tops[0].resolved().constant, 8.0);
    assert_eq!(activation.constraints().len(), 3);
}

#[test]
fn released_elements_are_skipped_silently() {
    let bench = TestBench::new();
    let root = bench.view("root");

    let activation = {
        let child = bench.view("child");
        let declaration = Declaration::leaf(&root.item())
            .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
        let activation = activate(&declaration, ReconcileOptions::default());

        // The platform releases the subtree: detached externally, then the
        // last owner goes away.
        root.remove_child(&child.item());
        activation
    };
    assert!(!activation.elements()[1].item.is_alive());

    bench.counters().reset();
    let declaration = Declaration::leaf(&root.item());
    let activation = reconcile(&declaration, Some(activation), ReconcileOptions::default());

    assert_eq!(bench.counters().structural(), 0);
    assert_eq!(activation.elements().len(), 1);
    assert_eq!(activation.constraints().len(), 0);
}

#[test]
fn externally_reparented_elements_are_not_detached() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let other = bench.view("other");
    let child = bench.view("child");

    let declaration = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
    let activation = activate(&declaration, ReconcileOptions::default());

    // Someone else moved the child; the recorded parent no longer matches.
    other.item().add_child(&child.item());

    let trimmed = Declaration::leaf(&root.item());
    let _activation = reconcile(&trimmed, Some(activation), ReconcileOptions::default());

    assert_eq!(child.parent().expect("still with other").id(), other.id());
}

#[test]
fn teardown_detaches_tracked_elements_and_deactivates_constraints() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let child = bench.view("child");

    let declaration = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
    let mut activation = activate(&declaration, ReconcileOptions::default());

    activation.teardown();

    assert!(child.parent().is_none());
    assert!(child.installed().is_empty());
    assert_eq!(activation.elements().len(), 0);
    assert!(activation.find("anything").is_none());
}

#[test]
fn teardown_leaves_externally_reparented_elements_alone() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let other = bench.view("other");
    let child = bench.view("child");

    let declaration = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
    let mut activation = activate(&declaration, ReconcileOptions::default());

    other.item().add_child(&child.item());
    activation.teardown();

    assert_eq!(child.parent().expect("still with other").id(), other.id());
    assert!(child.installed().is_empty());
}

#[test]
fn dropping_the_activation_tears_down() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let child = bench.view("child");

    {
        let declaration = Declaration::leaf(&root.item())
            .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
        let _activation = activate(&declaration, ReconcileOptions::default());
        assert!(child.parent().is_some());
    }

    assert!(child.parent().is_none());
    assert!(child.installed().is_empty());
}

#[test]
fn identifier_assignment_names_unnamed_elements_only() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let content = bench.view("contentView");
    let label = bench.view("nameLabel");
    label.set_identifier("label");

    let declaration = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&content.item()).anchors(Anchors::all_sides()))
        .child(Declaration::leaf(&label.item()).anchors(Anchors::cap()));

    let options = ReconcileOptions::default().assign_identifiers(vec![
        ("content".to_owned(), WeakItem::new(&content.item())),
        ("renamed".to_owned(), WeakItem::new(&label.item())),
    ]);
    let activation = activate(&declaration, options);

    assert_eq!(content.identifier().as_deref(), Some("content"));
    assert_eq!(label.identifier().as_deref(), Some("label"));
    assert_eq!(activation.find("content").expect("assigned").id(), content.id());
    assert_eq!(activation.find("label").expect("declared").id(), label.id());
    assert!(activation.find("renamed").is_none());
}

#[test]
fn find_reflects_the_latest_pass() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let child = bench.view("child");
    child.set_identifier("child");

    let declaration = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
    let activation = activate(&declaration, ReconcileOptions::default());
    assert_eq!(activation.find("child").expect("present").id(), child.id());

    let trimmed = Declaration::leaf(&root.item());
    let activation = reconcile(&trimmed, Some(activation), ReconcileOptions::default());
    assert!(activation.find("child").is_none());
}

#[test]
fn layout_host_flips_a_conditional_across_updates() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let true_view = bench.view("trueView");
    let false_view = bench.view("falseView");

    let build = |flag: bool| {
        Declaration::leaf(&root.item()).child(Declaration::either(
            flag,
            Declaration::leaf(&true_view.item()).anchors(Anchors::all_sides()),
            Declaration::leaf(&false_view.item()).anchors(Anchors::all_sides()),
        ))
    };

    let mut host = trellis::LayoutHost::new();
    host.update_layout(&build(true), ReconcileOptions::default());
    assert_eq!(true_view.parent().expect("true attached").id(), root.id());
    assert!(false_view.parent().is_none());

    host.update_layout(&build(false), ReconcileOptions::default());
    assert_eq!(false_view.parent().expect("false attached").id(), root.id());
    assert!(true_view.parent().is_none());

    host.teardown();
    assert!(false_view.parent().is_none());
}

#[test]
fn animation_pass_reports_surviving_elements_only() {
    let bench = TestBench::new();
    let root = bench.view("root");
    let child = bench.view("child");
    let late = bench.view("late");

    let first = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()));
    let activation = activate(&first, ReconcileOptions::default());
    child.set_frame(Rect::new(0.0, 0.0, 100.0, 50.0));

    let animated: Rc<RefCell<Vec<(String, Rect, Rect)>>> = Rc::new(RefCell::new(Vec::new()));
    let recorder = animated.clone();
    let options = ReconcileOptions::default().animated(Rc::new(move |item, before, after| {
        recorder.borrow_mut().push((item.tag(), before, after));
    }));

    let second = Declaration::leaf(&root.item())
        .child(Declaration::leaf(&child.item()).anchors(Anchors::all_sides()))
        .child(Declaration::leaf(&late.item()).anchors(Anchors::cap()));
    let _activation = reconcile(&second, Some(activation), options);

    let animated = animated.borrow();
    assert_eq!(animated.len(), 1);
    assert_eq!(animated[0].0, "child");
    assert_eq!(animated[0].1, Rect::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(root.layout_passes.get(), 1);
}
