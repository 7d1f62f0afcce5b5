// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios driven through [`MemorySurface`].

use alloc::rc::Rc;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::deadline::{Steps, Unbounded};
use crate::describe::{Event, Node, NodeBuilder, Props, component, element};
use crate::error::Error;
use crate::fiber::{Effect, FiberId};
use crate::hooks::{RenderContext, StateSetter};
use crate::scheduler::{Phase, Scheduler, SchedulerConfig, SliceOutcome};
use crate::surface::SurfaceError;
use crate::surface::memory::{MemoryNodeId, MemorySurface, SurfaceOp};

type Slot<T> = Rc<RefCell<Option<StateSetter<T>>>>;

fn setup() -> (Scheduler<MemorySurface>, MemorySurface, MemoryNodeId) {
    let mut surface = MemorySurface::new();
    let root = surface.create_container("root");
    (Scheduler::new(SchedulerConfig::headless()), surface, root)
}

fn setter<T>(slot: &Slot<T>) -> StateSetter<T> {
    slot.borrow().clone().expect("component rendered")
}

/// `<h1><button onclick>+</button><span>{count}</span></h1>`
fn counter(slot: &Slot<i32>, renders: &Rc<Cell<u32>>) -> NodeBuilder {
    let slot = Rc::clone(slot);
    let renders = Rc::clone(renders);
    component(move |cx: &mut RenderContext<'_>, _: &Props<'_>| {
        renders.set(renders.get() + 1);
        let (count, set) = cx.use_state(0_i32);
        *slot.borrow_mut() = Some(set.clone());
        element("h1")
            .child(
                element("button")
                    .on("click", move |_| set.update(|c| c + 1))
                    .child("+"),
            )
            .child(element("span").child(count))
    })
}

fn committed_order(scheduler: &Scheduler<MemorySurface>) -> Vec<FiberId> {
    let root = scheduler.committed_root().expect("committed");
    scheduler.fibers().preorder(root).collect()
}

fn visible(ops: &[SurfaceOp]) -> usize {
    ops.iter().filter(|op| op.is_visible()).count()
}

// ---------------------------------------------------------------------------
// Diff properties
// ---------------------------------------------------------------------------

#[test]
fn rendering_the_same_tree_twice_changes_nothing() {
    let (mut scheduler, mut surface, root) = setup();
    let tree = || {
        element("div")
            .attr("id", "a")
            .child(element("span").child("hi"))
            .build()
    };
    scheduler.render(tree(), root);
    scheduler.flush(&mut surface).unwrap();
    surface.take_ops();

    scheduler.render(tree(), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!(summary.inserted, 0, "no inserts");
    assert_eq!(summary.deleted, 0, "no deletes");
    assert_eq!(summary.updated, 3, "div, span, text all update");
    assert!(summary.is_noop(), "no attribute changed: {summary:?}");
    assert!(surface.ops().is_empty(), "surface untouched: {:?}", surface.ops());
    for id in committed_order(&scheduler) {
        assert_eq!(scheduler.fibers().effect(id), Effect::None, "effects cleared");
    }
}

#[test]
fn removing_one_of_three_children_removes_one_node() {
    fn list(items: &[&str]) -> Node {
        element("ul")
            .children(items.iter().map(|i| element("li").child(*i)))
            .build()
    }

    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(list(&["a", "b", "c"]), root);
    scheduler.flush(&mut surface).unwrap();
    let ul = surface.find(root, "ul").unwrap();
    let lis = surface.find_all(root, "li");
    surface.take_ops();

    scheduler.render(list(&["a", "b"]), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    let removals: Vec<_> = surface
        .ops()
        .iter()
        .filter(|op| matches!(op, SurfaceOp::Remove { .. }))
        .collect();
    assert_eq!(
        removals,
        [&SurfaceOp::Remove {
            parent: ul,
            node: lis[2]
        }],
        "exactly the last item"
    );
    assert_eq!(summary.inserted, 0, "survivors are not reinserted");
    assert_eq!(summary.deleted, 1, "one deletion");
    assert_eq!(summary.updated, 5, "ul, two items, two texts");
    assert!(surface.is_released(lis[2]), "deleted item released");
    assert_eq!(surface.markup(root), "<ul><li>a</li><li>b</li></ul>", "markup");
}

#[test]
fn same_kind_swap_updates_attributes_in_place() {
    let (mut scheduler, mut surface, root) = setup();
    let pair = |first: &str, second: &str| {
        element("div")
            .child(element("span").attr("id", first))
            .child(element("span").attr("id", second))
            .build()
    };
    scheduler.render(pair("a", "b"), root);
    scheduler.flush(&mut surface).unwrap();
    let spans = surface.find_all(root, "span");
    surface.take_ops();

    scheduler.render(pair("b", "a"), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!((summary.inserted, summary.deleted), (0, 0), "no remount");
    assert_eq!(summary.updated, 3, "div and both spans");
    assert_eq!(summary.attributes_set, 2, "ids swapped in place");
    assert_eq!(surface.find_all(root, "span"), spans, "same nodes, same order");
    assert_eq!(
        surface.markup(root),
        r#"<div><span id="b"></span><span id="a"></span></div>"#,
        "markup"
    );
}

#[test]
fn kind_change_remounts_at_the_same_position() {
    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(
        element("div").child(element("span")).child(element("p")),
        root,
    );
    scheduler.flush(&mut surface).unwrap();
    let div = surface.find(root, "div").unwrap();
    let span = surface.find(root, "span").unwrap();
    let p = surface.find(root, "p").unwrap();
    surface.take_ops();

    scheduler.render(element("div").child(element("em")).child(element("p")), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!((summary.inserted, summary.deleted), (1, 1), "one out, one in");
    let em = surface.find(root, "em").unwrap();
    assert!(
        surface.ops().contains(&SurfaceOp::Remove {
            parent: div,
            node: span
        }),
        "span removed"
    );
    assert!(
        surface.ops().contains(&SurfaceOp::Insert {
            parent: div,
            node: em,
            before: Some(p)
        }),
        "em placed before the surviving p"
    );
    assert_eq!(surface.markup(root), "<div><em></em><p></p></div>", "order kept");
}

#[test]
fn component_child_inserts_before_later_siblings() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<bool> = Rc::default();
    let toggle = {
        let slot = Rc::clone(&slot);
        component(move |cx: &mut RenderContext<'_>, _: &Props<'_>| {
            let (shown, set) = cx.use_state(false);
            *slot.borrow_mut() = Some(set);
            shown.then(|| element("b").build())
        })
    };
    scheduler.render(element("div").child(toggle).child(element("i")), root);
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.markup(root), "<div><i></i></div>", "hidden");
    let div = surface.find(root, "div").unwrap();
    let i = surface.find(root, "i").unwrap();
    surface.take_ops();

    setter(&slot).set(true);
    scheduler.flush(&mut surface).unwrap();
    let b = surface.find(root, "b").unwrap();
    assert!(
        surface.ops().contains(&SurfaceOp::Insert {
            parent: div,
            node: b,
            before: Some(i)
        }),
        "anchored on the next host sibling: {:?}",
        surface.ops()
    );
    assert_eq!(surface.markup(root), "<div><b></b><i></i></div>", "order kept");
}

#[test]
fn fresh_subtree_appends_in_order() {
    let (mut scheduler, mut surface, root) = setup();
    let items: Vec<Node> = (0..64).map(|n| element("li").child(n).build()).collect();
    scheduler.render(element("ul").children(items), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!(summary.inserted, 1 + 64 * 2, "ul, items, texts");

    let ul = surface.find(root, "ul").unwrap();
    let lis = surface.find_all(root, "li");
    let item_inserts: Vec<_> = surface
        .ops()
        .iter()
        .filter_map(|op| match op {
            SurfaceOp::Insert { parent, node, before } if *parent == ul => Some((*node, *before)),
            _ => None,
        })
        .collect();
    assert_eq!(item_inserts.len(), 64, "every item attached once");
    assert!(
        item_inserts.iter().all(|(_, before)| before.is_none()),
        "items under a new parent are appended"
    );
    assert_eq!(
        item_inserts.iter().map(|(node, _)| *node).collect::<Vec<_>>(),
        lis,
        "attached in document order"
    );
    assert_eq!(surface.text_content(ul).len(), "0123456789".len() + 54 * 2, "all texts present");
}

#[test]
fn empty_placeholder_holds_its_position() {
    fn view(show: bool) -> Node {
        element("div")
            .child(show.then(|| element("b").build()))
            .child(element("i"))
            .child(element("u"))
            .build()
    }

    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(view(false), root);
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.markup(root), "<div><i></i><u></u></div>", "placeholder renders nothing");
    let div = surface.find(root, "div").unwrap();
    let i = surface.find(root, "i").unwrap();
    let u = surface.find(root, "u").unwrap();
    surface.take_ops();

    scheduler.render(view(true), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    let b = surface.find(root, "b").unwrap();
    assert_eq!((summary.inserted, summary.deleted), (1, 1), "placeholder swapped for b");
    assert_eq!(summary.updated, 3, "div, i, u keep their nodes");
    assert!(
        surface.ops().contains(&SurfaceOp::Insert {
            parent: div,
            node: b,
            before: Some(i)
        }),
        "b anchored on i: {:?}",
        surface.ops()
    );
    assert!(
        !surface.ops().iter().any(|op| matches!(op, SurfaceOp::Remove { .. })),
        "deleting a placeholder detaches nothing"
    );
    assert_eq!(surface.markup(root), "<div><b></b><i></i><u></u></div>", "shown");
    surface.take_ops();

    scheduler.render(view(false), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!((summary.inserted, summary.deleted), (1, 1), "b swapped for a placeholder");
    assert!(
        surface.ops().contains(&SurfaceOp::Remove { parent: div, node: b }),
        "b detached"
    );
    assert!(surface.is_released(b), "b released");
    assert_eq!(surface.markup(root), "<div><i></i><u></u></div>", "hidden again");
    assert_eq!(surface.find_all(root, "i"), [i], "i never remounted");
    assert_eq!(surface.find_all(root, "u"), [u], "u never remounted");
}

#[test]
fn reordering_different_kinds_remounts_both() {
    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(element("div").child(element("span")).child(element("p")), root);
    scheduler.flush(&mut surface).unwrap();
    let span = surface.find(root, "span").unwrap();
    let p = surface.find(root, "p").unwrap();
    surface.take_ops();

    scheduler.render(element("div").child(element("p")).child(element("span")), root);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!((summary.inserted, summary.deleted), (2, 2), "no moves, only remounts");
    assert_eq!(summary.updated, 1, "only the div is reused");
    assert!(surface.is_released(span) && surface.is_released(p), "old nodes released");
    let new_span = surface.find(root, "span").unwrap();
    let new_p = surface.find(root, "p").unwrap();
    assert!(new_span != span && new_p != p, "fresh nodes");
    assert_eq!(surface.markup(root), "<div><p></p><span></span></div>", "new order");
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[test]
fn state_survives_a_render_triggered_by_a_sibling() {
    let (mut scheduler, mut surface, root) = setup();
    let a: Slot<i32> = Rc::default();
    let b: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(
        element("div")
            .child(counter(&a, &renders))
            .child({
                let b = Rc::clone(&b);
                component(move |cx: &mut RenderContext<'_>, _: &Props<'_>| {
                    let (n, set) = cx.use_state(100_i32);
                    *b.borrow_mut() = Some(set);
                    element("em").child(n)
                })
            }),
        root,
    );
    scheduler.flush(&mut surface).unwrap();

    setter(&a).set(5);
    scheduler.flush(&mut surface).unwrap();
    let span = surface.find(root, "span").unwrap();
    assert_eq!(surface.text_content(span), "5", "own update applied");

    setter(&b).update(|n| n + 1);
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.text_content(span), "5", "kept across sibling render");
    let em = surface.find(root, "em").unwrap();
    assert_eq!(surface.text_content(em), "101", "sibling updated");
}

#[test]
fn queued_updates_all_apply_in_order() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();
    let generation = scheduler.generation();

    let set = setter(&slot);
    set.update(|c| c + 1);
    set.update(|c| c + 1);
    set.update(|c| c * 10);
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.markup(root), "<h1><button>+</button><span>20</span></h1>", "(0+1+1)*10");
    assert_eq!(scheduler.generation(), generation + 1, "one generation for the batch");
}

#[test]
fn text_change_sets_node_value_without_remount() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();
    surface.take_ops();

    setter(&slot).set(3);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!(summary.inserted, 0, "no remount");
    assert_eq!(summary.attributes_set, 1, "only the text changed");
    assert!(
        surface.ops().iter().any(|op| matches!(
            op,
            SurfaceOp::SetAttribute { key, .. } if key == crate::describe::TEXT_KEY
        )),
        "text set through nodeValue"
    );
}

#[test]
fn click_listener_updates_state() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();
    let button = surface.find(root, "button").unwrap();
    assert_eq!(surface.listener_count(button, "click"), 1, "attached at insert");

    assert_eq!(surface.dispatch(button, &Event::new("click")), 1, "one handler");
    assert_eq!(surface.dispatch(button, &Event::new("click")), 1, "one handler");
    assert!(scheduler.has_pending_work(), "listener scheduled work");
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();

    let span = surface.find(root, "span").unwrap();
    assert_eq!(surface.text_content(span), "2", "both clicks applied");
    assert_eq!(surface.listener_count(button, "click"), 1, "handler swapped, not stacked");
    assert_eq!(
        (summary.listeners_removed, summary.listeners_added),
        (1, 1),
        "fresh closure replaces the old one"
    );
}

#[test]
fn render_phase_update_settles() {
    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(
        component(|cx: &mut RenderContext<'_>, _: &Props<'_>| {
            let (n, set) = cx.use_state(0_u32);
            if n < 3 {
                set.update(|n| n + 1);
            }
            element("p").child(n)
        }),
        root,
    );
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.markup(root), "<p>3</p>", "converged");
    assert_eq!(scheduler.generation(), 4, "one generation per step");
}

#[test]
fn endless_render_phase_updates_are_reported() {
    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(
        component(|cx: &mut RenderContext<'_>, _: &Props<'_>| {
            let (n, set) = cx.use_state(0_u32);
            set.update(|n| n + 1);
            element("p").child(n)
        }),
        root,
    );
    let err = scheduler.flush(&mut surface).unwrap_err();
    assert!(
        matches!(err, Error::Unsettled { generations: 32 }),
        "gave up at the limit: {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[test]
fn slices_resume_at_the_next_fiber() {
    let (mut scheduler, mut surface, root) = setup();
    let renders = Rc::new(Cell::new(0));
    let log = Rc::clone(&renders);
    scheduler.render(
        element("div")
            .child(element("span").child("a"))
            .child(component(move |_: &mut RenderContext<'_>, _: &Props<'_>| {
                log.set(log.get() + 1);
                element("p").child("b")
            }))
            .child("c"),
        root,
    );

    let mut resumed_at = Vec::new();
    let mut slices = 0;
    loop {
        slices += 1;
        match scheduler.run_slice(&mut surface, &Steps::new(1)).unwrap() {
            SliceOutcome::Yielded { units } => {
                assert_eq!(units, 1, "one fiber per step budget");
                assert_eq!(visible(surface.ops()), 0, "nothing visible mid-build");
                resumed_at.push(scheduler.pending_unit().unwrap());
            }
            SliceOutcome::Committed { units, .. } => {
                assert_eq!(units, 1, "last fiber");
                break;
            }
            SliceOutcome::Idle => panic!("work was pending"),
        }
    }

    let order = committed_order(&scheduler);
    assert_eq!(order.len(), 8, "root, div, span, a, component, p, b, c");
    assert_eq!(slices, 8, "one slice per fiber");
    assert_eq!(&order[1..], &resumed_at[..], "resumed in pre-order");
    assert_eq!(renders.get(), 1, "component rendered exactly once");
    assert_eq!(surface.markup(root), "<div><span>a</span><p>b</p>c</div>", "markup");
}

#[test]
fn update_commit_is_all_or_nothing() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();
    surface.take_ops();

    setter(&slot).set(9);
    let before = surface.markup(root);
    loop {
        match scheduler.run_slice(&mut surface, &Steps::new(2)).unwrap() {
            SliceOutcome::Yielded { .. } => {
                assert_eq!(visible(surface.ops()), 0, "no partial effects");
                assert_eq!(surface.markup(root), before, "old tree still shown");
                assert_eq!(scheduler.phase(), Phase::Building, "suspended in build");
            }
            SliceOutcome::Committed { .. } => break,
            SliceOutcome::Idle => panic!("work was pending"),
        }
    }
    assert_eq!(surface.markup(root), "<h1><button>+</button><span>9</span></h1>", "applied");
}

#[test]
fn update_during_build_restarts_without_losing_updates() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();
    let live = scheduler.fibers().live_count();

    let set = setter(&slot);
    set.update(|c| c + 1);
    let outcome = scheduler.run_slice(&mut surface, &Steps::new(3)).unwrap();
    assert_eq!(outcome, SliceOutcome::Yielded { units: 3 }, "component already rendered");
    set.update(|c| c + 1);
    scheduler.flush(&mut surface).unwrap();

    assert_eq!(
        surface.markup(root),
        "<h1><button>+</button><span>2</span></h1>",
        "both updates applied"
    );
    assert_eq!(scheduler.fibers().live_count(), live, "abandoned fibers freed");
    for id in committed_order(&scheduler) {
        assert_eq!(scheduler.fibers().effect(id), Effect::None, "no stray effects");
    }
}

#[test]
fn state_update_keeps_a_pending_render_request() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    let app = |version: &str| element("main").attr("v", version).child(counter(&slot, &renders));
    scheduler.render(app("1"), root);
    scheduler.flush(&mut surface).unwrap();

    scheduler.render(app("2"), root);
    let outcome = scheduler.run_slice(&mut surface, &Steps::new(1)).unwrap();
    assert_eq!(outcome, SliceOutcome::Yielded { units: 1 }, "v2 in flight");
    setter(&slot).set(4);
    scheduler.flush(&mut surface).unwrap();

    assert_eq!(
        surface.markup(root),
        r#"<main v="2"><h1><button>+</button><span>4</span></h1></main>"#,
        "newest request and the update both landed"
    );
}

// ---------------------------------------------------------------------------
// Errors and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn rejected_kind_keeps_the_committed_tree() {
    let (mut scheduler, mut surface, root) = setup();
    surface.reject_tag("blink");
    scheduler.render(element("div").child(element("p").child("ok")), root);
    scheduler.flush(&mut surface).unwrap();
    let before = surface.markup(root);
    let live = scheduler.fibers().live_count();
    surface.take_ops();

    scheduler.render(element("div").child(element("blink")), root);
    let err = scheduler.flush(&mut surface).unwrap_err();
    assert!(
        matches!(
            &err,
            Error::Surface { source: SurfaceError::UnknownKind(kind), .. } if kind == "blink"
        ),
        "unknown kind reported: {err:?}"
    );
    assert!(err.to_string().contains("surface rejected"), "display: {err}");
    assert_eq!(surface.markup(root), before, "previous tree intact");
    assert_eq!(visible(surface.ops()), 0, "nothing applied");
    assert_eq!(scheduler.phase(), Phase::Idle, "generation dropped");
    assert!(!scheduler.has_pending_work(), "no retry loop");
    assert_eq!(scheduler.fibers().live_count(), live, "failed fibers freed");
    for id in committed_order(&scheduler) {
        assert_eq!(scheduler.fibers().effect(id), Effect::None, "delete marks reset");
    }

    scheduler.render(element("div").child(element("p").child("again")), root);
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.markup(root), "<div><p>again</p></div>", "recovered");
}

#[test]
fn rendering_into_another_container_moves_the_tree() {
    let (mut scheduler, mut surface, root) = setup();
    let other = surface.create_container("other");
    scheduler.render(element("p").child("x"), root);
    scheduler.flush(&mut surface).unwrap();

    scheduler.render(element("p").child("x"), other);
    let summary = scheduler.flush(&mut surface).unwrap().unwrap();
    assert_eq!(surface.markup(root), "", "old container emptied");
    assert_eq!(surface.markup(other), "<p>x</p>", "mounted fresh");
    assert_eq!((summary.deleted, summary.inserted), (1, 2), "remount");
}

#[test]
fn unmount_removes_everything() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();
    let set = setter(&slot);
    slot.borrow_mut().take();
    let h1 = surface.find(root, "h1").unwrap();

    scheduler.unmount();
    scheduler.flush(&mut surface).unwrap();
    assert_eq!(surface.markup(root), "", "container empty");
    assert!(surface.is_released(h1), "nodes released");
    assert_eq!(scheduler.fibers().live_count(), 1, "only the root anchor is left");

    assert!(!set.is_mounted(), "slot dropped with its fiber");
    set.set(1);
    assert!(!scheduler.has_pending_work(), "late updates are ignored");
    assert_eq!(
        scheduler.run_slice(&mut surface, &Unbounded).unwrap(),
        SliceOutcome::Idle,
        "idle"
    );
}

#[test]
fn committed_tree_is_inspectable() {
    let (mut scheduler, mut surface, root) = setup();
    let slot: Slot<i32> = Rc::default();
    let renders = Rc::new(Cell::new(0));
    scheduler.render(counter(&slot, &renders), root);
    scheduler.flush(&mut surface).unwrap();

    let anchor = scheduler.committed_root().unwrap();
    let fibers = scheduler.fibers();
    assert_eq!(fibers.kind(anchor), None, "anchor has no kind");
    assert_eq!(fibers.surface_node(anchor), Some(&root), "bound to the container");
    let component = fibers.children(anchor).next().unwrap();
    assert_eq!(fibers.hook_count(component), 1, "one use_state slot");
    let h1 = fibers.children(component).next().unwrap();
    assert_eq!(fibers.parent(h1), Some(component), "parent link");
    assert!(fibers.surface_node(component).is_none(), "components own no node");
    assert_eq!(
        fibers.surface_node(h1).copied(),
        surface.find(root, "h1"),
        "host fiber owns its node"
    );
    assert_eq!(fibers.alternate(h1), None, "links cleared after commit");
}

#[cfg(feature = "trace")]
#[test]
fn tracer_sees_slices_and_commit() {
    use alloc::format;
    use alloc::string::String;

    use crate::scheduler::CommitSummary;
    use crate::trace::{
        GenerationBeginEvent, GenerationSummary, SliceEndEvent, TraceSink, Tracer,
    };

    #[derive(Default)]
    struct Log(Vec<String>);
    impl TraceSink for Log {
        fn on_generation_begin(&mut self, e: &GenerationBeginEvent) {
            self.0.push(format!("begin {} {:?}", e.generation, e.cause));
        }
        fn on_slice_end(&mut self, e: &SliceEndEvent) {
            self.0.push(format!("slice {} units={} yielded={}", e.slice, e.units, e.yielded));
        }
        fn on_commit(&mut self, s: &CommitSummary) {
            self.0.push(format!("commit inserted={}", s.inserted));
        }
        fn on_generation_summary(&mut self, s: &GenerationSummary) {
            self.0.push(format!("summary slices={} units={}", s.slices, s.units));
        }
    }

    let (mut scheduler, mut surface, root) = setup();
    scheduler.render(element("p").child("x"), root);
    let mut log = Log::default();
    let mut tracer = Tracer::new(&mut log);
    scheduler
        .run_slice_traced(&mut surface, &Steps::new(2), &mut tracer)
        .unwrap();
    scheduler
        .run_slice_traced(&mut surface, &Steps::new(2), &mut tracer)
        .unwrap();
    drop(tracer);
    assert_eq!(
        log.0,
        [
            "begin 1 Render",
            "slice 0 units=2 yielded=true",
            "slice 1 units=1 yielded=false",
            "commit inserted=2",
            "summary slices=2 units=3",
        ],
        "event sequence"
    );
}

#[test]
fn description_equality_is_structural() {
    let a: Node = element("p").attr("id", 1).child("x").build();
    let b: Node = element("p").attr("id", 1).child("x").build();
    assert_eq!(a, b, "same shape and values");
}
