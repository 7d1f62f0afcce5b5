// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays fiber storage with allocation, linking, and queries.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::describe::{Attributes, Node, NodeKind};
use crate::hooks::HookCell;

use super::id::{Effect, FiberId, INVALID};
use super::traverse::{Children, Preorder};

/// Struct-of-arrays storage for every fiber of every live generation.
///
/// Fibers are addressed by [`FiberId`] handles. The committed tree and the
/// work-in-progress tree share one store; a fiber's
/// [`alternate`](Self::alternate) points at its counterpart in the committed
/// tree. Freed slots are recycled via a free list, and generation counters
/// prevent stale handle access.
///
/// `N` is the surface node handle type of the [`Surface`](crate::surface::Surface)
/// the fibers render into.
#[derive(Debug)]
pub struct FiberStore<N> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,

    // -- Description (copied from the node that produced the fiber) --
    /// `None` marks a root anchor.
    pub(crate) kind: Vec<Option<NodeKind>>,
    pub(crate) attributes: Vec<Attributes>,
    pub(crate) children: Vec<Rc<[Node]>>,

    // -- Render state --
    pub(crate) surface: Vec<Option<N>>,
    pub(crate) alternate: Vec<Option<FiberId>>,
    pub(crate) effect: Vec<Effect>,
    pub(crate) hooks: Vec<Vec<HookCell>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl<N> Default for FiberStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FiberStore<N> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            kind: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            surface: Vec::new(),
            alternate: Vec::new(),
            effect: Vec::new(),
            hooks: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation --

    /// Allocates an unlinked fiber.
    pub(crate) fn allocate(
        &mut self,
        kind: Option<NodeKind>,
        attributes: Attributes,
        children: Rc<[Node]>,
    ) -> FiberId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; release() already reset it and bumped the generation.
            let i = idx as usize;
            self.kind[i] = kind;
            self.attributes[i] = attributes;
            self.children[i] = children;
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.kind.push(kind);
            self.attributes.push(attributes);
            self.children.push(children);
            self.surface.push(None);
            self.alternate.push(None);
            self.effect.push(Effect::None);
            self.hooks.push(Vec::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.id_at(idx)
    }

    /// Links `child` under `parent`, after `prev` (or as the first child when
    /// `prev` is `None`).
    pub(crate) fn link(&mut self, parent: FiberId, prev: Option<FiberId>, child: FiberId) {
        self.validate(parent);
        self.validate(child);
        let c = child.idx as usize;
        debug_assert!(self.parent[c] == INVALID, "fiber already linked");
        self.parent[c] = parent.idx;
        match prev {
            Some(prev) => self.next_sibling[prev.idx as usize] = child.idx,
            None => self.first_child[parent.idx as usize] = child.idx,
        }
    }

    /// Frees one slot, dropping its description, surface handle, and hook
    /// cells, and bumping the generation so outstanding handles go stale.
    fn release(&mut self, idx: u32) {
        let i = idx as usize;
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.kind[i] = None;
        self.attributes[i] = Attributes::new();
        self.children[i] = Rc::from([]);
        self.surface[i] = None;
        self.alternate[i] = None;
        self.effect[i] = Effect::None;
        self.hooks[i].clear();
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.alive[i] = false;
        self.free_list.push(idx);
    }

    /// Frees every fiber in the subtree rooted at `root`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn release_subtree(&mut self, root: FiberId) {
        self.validate(root);
        let order: Vec<u32> = Preorder::new(self, root.idx).map(|id| id.idx).collect();
        for idx in order {
            self.release(idx);
        }
    }

    /// Returns whether the given handle refers to a live fiber.
    #[must_use]
    pub fn is_alive(&self, id: FiberId) -> bool {
        id.idx < self.len
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Returns the number of live fibers across all generations.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology queries --

    /// Returns the parent of a fiber, or `None` for a root anchor.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn parent(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a fiber.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn children(&self, id: FiberId) -> Children<'_, N> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns a pre-order iterator over the subtree rooted at `id`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn preorder(&self, id: FiberId) -> Preorder<'_, N> {
        self.validate(id);
        Preorder::new(self, id.idx)
    }

    // -- Property queries --

    /// Returns the fiber's kind, or `None` for a root anchor.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn kind(&self, id: FiberId) -> Option<&NodeKind> {
        self.validate(id);
        self.kind[id.idx as usize].as_ref()
    }

    /// Returns the fiber's attributes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn attributes(&self, id: FiberId) -> &Attributes {
        self.validate(id);
        &self.attributes[id.idx as usize]
    }

    /// Returns the surface node owned by (or, for the root anchor, bound to)
    /// the fiber.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn surface_node(&self, id: FiberId) -> Option<&N> {
        self.validate(id);
        self.surface[id.idx as usize].as_ref()
    }

    /// Returns the fiber's pending effect.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn effect(&self, id: FiberId) -> Effect {
        self.validate(id);
        self.effect[id.idx as usize]
    }

    /// Returns the fiber's counterpart in the previous committed tree, if it
    /// is still alive.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn alternate(&self, id: FiberId) -> Option<FiberId> {
        self.validate(id);
        self.alternate[id.idx as usize].filter(|alt| self.is_alive(*alt))
    }

    /// Returns the number of hook slots the fiber holds.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn hook_count(&self, id: FiberId) -> usize {
        self.validate(id);
        self.hooks[id.idx as usize].len()
    }

    // -- Crate-internal helpers --

    /// Builds a handle for a slot from its current generation.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> FiberId {
        FiberId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the fiber after `idx` in pre-order, staying within the subtree
    /// rooted at `stop`, or [`INVALID`] once the subtree is exhausted.
    pub(crate) fn next_in_preorder(&self, idx: u32, stop: u32) -> u32 {
        let first = self.first_child[idx as usize];
        if first != INVALID {
            return first;
        }
        self.next_after_subtree(idx, stop)
    }

    /// Like [`next_in_preorder`](Self::next_in_preorder), but skips the
    /// descendants of `idx`.
    pub(crate) fn next_after_subtree(&self, idx: u32, stop: u32) -> u32 {
        let mut cur = idx;
        while cur != stop && cur != INVALID {
            let next = self.next_sibling[cur as usize];
            if next != INVALID {
                return next;
            }
            cur = self.parent[cur as usize];
        }
        INVALID
    }

    /// Returns the nearest ancestor of `idx` that holds a surface node.
    pub(crate) fn host_parent(&self, idx: u32) -> Option<&N> {
        let p = self.host_parent_index(idx);
        self.surface.get(p as usize).and_then(Option::as_ref)
    }

    /// Like [`host_parent`](Self::host_parent), returning the ancestor's slot
    /// index, or [`INVALID`].
    pub(crate) fn host_parent_index(&self, idx: u32) -> u32 {
        let mut cur = self.parent[idx as usize];
        while cur != INVALID && self.surface[cur as usize].is_none() {
            cur = self.parent[cur as usize];
        }
        cur
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: FiberId) {
        assert!(
            self.is_alive(id),
            "stale FiberId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
