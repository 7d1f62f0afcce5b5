// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit phase: applies a finished generation to the surface in one
//! uninterrupted pass.

use alloc::vec::Vec;

use crate::describe::{Attributes, listener_event};
use crate::fiber::{Effect, FiberId, INVALID};
use crate::scheduler::{CommitSummary, Scheduler};
use crate::surface::Surface;

impl<S: Surface> Scheduler<S> {
    /// Applies deletions, then every effect of the work-in-progress tree in
    /// pre-order, and makes it the committed baseline.
    ///
    /// The previous committed tree (deleted subtrees included) is freed
    /// afterwards.
    pub(crate) fn commit_root(&mut self, surface: &mut S) -> CommitSummary {
        let mut summary = CommitSummary::default();
        let Some(root) = self.wip_root.take() else {
            return summary;
        };
        summary.generation = self.generation();

        for id in core::mem::take(&mut self.deletions) {
            self.commit_deletion(surface, id, &mut summary);
        }

        let order: Vec<FiberId> = self.fibers.preorder(root).skip(1).collect();
        for &id in &order {
            let i = id.idx as usize;
            let effect = self.fibers.effect[i];
            match effect {
                Effect::Insert => self.commit_insert(surface, i, &mut summary),
                Effect::Update => self.commit_update(surface, i, &mut summary),
                Effect::Delete | Effect::None => {}
            }
        }
        for &id in &order {
            let i = id.idx as usize;
            self.fibers.effect[i] = Effect::None;
            self.fibers.alternate[i] = None;
        }
        self.fibers.alternate[root.idx as usize] = None;

        if let Some(old) = self.current_root.replace(root) {
            self.fibers.release_subtree(old);
        }
        summary
    }

    /// Detaches a deleted subtree's top-level host nodes from their host
    /// parent, then releases every host node in it.
    fn commit_deletion(&mut self, surface: &mut S, id: FiberId, summary: &mut CommitSummary) {
        if !self.fibers.is_alive(id) {
            return;
        }
        summary.deleted += 1;
        let top = self.top_host_nodes(id);
        if let Some(parent) = self.fibers.host_parent(id.idx) {
            for node in &top {
                surface.remove_child(parent, node);
            }
        } else {
            tracing::warn!(fiber = %id, "deleted fiber has no host parent");
        }
        for fiber in self.fibers.preorder(id) {
            if let Some(node) = &self.fibers.surface[fiber.idx as usize] {
                surface.release(node);
            }
        }
        self.fibers.effect[id.idx as usize] = Effect::None;
    }

    /// Returns the outermost surface nodes of a subtree, in order. A host
    /// fiber's own descendants are attached to it and are skipped.
    fn top_host_nodes(&self, id: FiberId) -> Vec<S::Node> {
        let mut nodes = Vec::new();
        let stop = id.idx;
        let mut cur = stop;
        while cur != INVALID {
            cur = match &self.fibers.surface[cur as usize] {
                Some(node) => {
                    nodes.push(node.clone());
                    self.fibers.next_after_subtree(cur, stop)
                }
                None => self.fibers.next_in_preorder(cur, stop),
            };
        }
        nodes
    }

    fn commit_insert(&self, surface: &mut S, i: usize, summary: &mut CommitSummary) {
        summary.inserted += 1;
        // Components and empty placeholders own no node; their host
        // descendants are inserts of their own.
        let Some(node) = self.fibers.surface[i].as_ref() else {
            return;
        };
        let idx = u32::try_from(i).unwrap_or(INVALID);
        let p = self.fibers.host_parent_index(idx);
        let Some(parent) = self.fibers.surface.get(p as usize).and_then(Option::as_ref) else {
            tracing::warn!(fiber = idx, "inserted fiber has no host parent");
            return;
        };
        // A parent inserted in this commit holds only new nodes, attached in
        // pre-order, so appending keeps them in order.
        let before = if self.fibers.effect[p as usize] == Effect::Insert {
            None
        } else {
            self.host_sibling_after(idx)
        };
        surface.insert_child(parent, node, before);
        for (key, listener) in self.fibers.attributes[i].listeners() {
            if let Some(event) = listener_event(key) {
                surface.add_listener(node, &event, listener);
                summary.listeners_added += 1;
            }
        }
    }

    fn commit_update(&self, surface: &mut S, i: usize, summary: &mut CommitSummary) {
        summary.updated += 1;
        let (Some(node), Some(old)) = (&self.fibers.surface[i], self.fibers.alternate[i]) else {
            return;
        };
        let prev = &self.fibers.attributes[old.idx as usize];
        let next = &self.fibers.attributes[i];
        if !prev.ptr_eq(next) {
            diff_attributes(surface, node, prev, next, summary);
        }
    }

    /// Returns the surface node to insert fiber `idx` in front of: the first
    /// already-attached host node that follows it under the same host parent.
    ///
    /// Walks forward through siblings, descending into fibers that own no
    /// node and climbing out of them when their children run out. Fibers
    /// still waiting for their own insert are skipped.
    fn host_sibling_after(&self, idx: u32) -> Option<&S::Node> {
        let store = &self.fibers;
        let mut cur = idx;
        'siblings: loop {
            while store.next_sibling[cur as usize] == INVALID {
                let parent = store.parent[cur as usize];
                if parent == INVALID || store.surface[parent as usize].is_some() {
                    return None;
                }
                cur = parent;
            }
            cur = store.next_sibling[cur as usize];
            loop {
                let c = cur as usize;
                if let Some(node) = &store.surface[c] {
                    if store.effect[c] == Effect::Update {
                        return Some(node);
                    }
                    continue 'siblings;
                }
                let first = store.first_child[c];
                if first == INVALID {
                    continue 'siblings;
                }
                cur = first;
            }
        }
    }
}

/// Applies the difference between two attribute maps to one node.
///
/// Order: stale listeners come off, dropped attributes are removed, changed
/// attributes are set, then new listeners go on. Listeners compare by
/// identity, plain values by equality.
fn diff_attributes<S: Surface>(
    surface: &mut S,
    node: &S::Node,
    prev: &Attributes,
    next: &Attributes,
    summary: &mut CommitSummary,
) {
    for (key, listener) in prev.listeners() {
        if next.listener(key).is_none_or(|l| !l.ptr_eq(listener))
            && let Some(event) = listener_event(key)
        {
            surface.remove_listener(node, &event, listener);
            summary.listeners_removed += 1;
        }
    }
    for (key, _) in prev.plain() {
        if next.get(key).is_none() {
            surface.remove_attribute(node, key);
            summary.attributes_removed += 1;
        }
    }
    for (key, value) in next.plain() {
        if prev.get(key) != Some(value) {
            surface.set_attribute(node, key, value);
            summary.attributes_set += 1;
        }
    }
    for (key, listener) in next.listeners() {
        if prev.listener(key).is_none_or(|l| !l.ptr_eq(listener))
            && let Some(event) = listener_event(key)
        {
            surface.add_listener(node, &event, listener);
            summary.listeners_added += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{Listener, TEXT_KEY, Value};
    use crate::surface::memory::{MemorySurface, SurfaceOp};
    use crate::surface::HostKind;

    fn node(surface: &mut MemorySurface) -> crate::surface::memory::MemoryNodeId {
        surface
            .create_node(HostKind::Element("div"), &Attributes::new())
            .unwrap()
    }

    #[test]
    fn diff_sets_and_removes_plain_attributes() {
        let mut surface = MemorySurface::new();
        let n = node(&mut surface);
        surface.take_ops();
        let prev = Attributes::new().with("id", "a").with("title", "t");
        let next = Attributes::new().with("id", "b").with("class", "c");
        let mut summary = CommitSummary::default();
        diff_attributes(&mut surface, &n, &prev, &next, &mut summary);

        assert_eq!(summary.attributes_removed, 1, "title dropped");
        assert_eq!(summary.attributes_set, 2, "id changed, class added");
        assert_eq!(surface.attribute(n, "title"), None, "removed");
        assert_eq!(surface.attribute(n, "id"), Some(&Value::from("b")), "changed");
        assert_eq!(
            surface.ops()[0],
            SurfaceOp::RemoveAttribute {
                node: n,
                key: "title".into()
            },
            "removal precedes sets"
        );
    }

    #[test]
    fn unchanged_values_are_not_reapplied() {
        let mut surface = MemorySurface::new();
        let n = node(&mut surface);
        surface.take_ops();
        let prev = Attributes::new().with(TEXT_KEY, "hi").with("n", 1);
        let next = Attributes::new().with(TEXT_KEY, "hi").with("n", 1);
        let mut summary = CommitSummary::default();
        diff_attributes(&mut surface, &n, &prev, &next, &mut summary);
        assert!(summary.is_noop(), "equal maps: {summary:?}");
        assert!(surface.ops().is_empty(), "no surface calls");
    }

    #[test]
    fn listeners_compare_by_identity() {
        let mut surface = MemorySurface::new();
        let n = node(&mut surface);
        let kept = Listener::new(|_| {});
        let prev = Attributes::new()
            .with("onClick", kept.clone())
            .with("onInput", Listener::new(|_| {}));
        let next = Attributes::new()
            .with("onClick", kept)
            .with("onInput", Listener::new(|_| {}));
        let mut summary = CommitSummary::default();
        diff_attributes(&mut surface, &n, &prev, &next, &mut summary);
        assert_eq!(summary.listeners_removed, 1, "fresh closure replaces input");
        assert_eq!(summary.listeners_added, 1, "only input re-added");
        assert_eq!(summary.attributes_set, 0, "listeners are not attributes");
    }

    #[test]
    fn removed_listener_is_detached() {
        let mut surface = MemorySurface::new();
        let n = node(&mut surface);
        let click = Listener::new(|_| {});
        surface.add_listener(&n, "click", &click);
        let prev = Attributes::new().with("onClick", click);
        let mut summary = CommitSummary::default();
        diff_attributes(&mut surface, &n, &prev, &Attributes::new(), &mut summary);
        assert_eq!(surface.listener_count(n, "click"), 0, "detached");
        assert_eq!(summary.listeners_removed, 1, "counted");
    }
}
