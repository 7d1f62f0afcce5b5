// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{FiberId, INVALID};
use super::store::FiberStore;

/// An iterator over the direct children of a fiber.
///
/// Created by [`FiberStore::children`].
#[derive(Debug)]
pub struct Children<'a, N> {
    store: &'a FiberStore<N>,
    current: u32,
}

impl<'a, N> Children<'a, N> {
    pub(crate) fn new(store: &'a FiberStore<N>, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl<N> Iterator for Children<'_, N> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

/// A pre-order iterator over a subtree, root included.
///
/// Walks the same order the work loop uses: first child, else the next
/// sibling of the nearest ancestor that has one, never leaving the subtree.
///
/// Created by [`FiberStore::preorder`].
#[derive(Debug)]
pub struct Preorder<'a, N> {
    store: &'a FiberStore<N>,
    root: u32,
    current: u32,
}

impl<'a, N> Preorder<'a, N> {
    pub(crate) fn new(store: &'a FiberStore<N>, root: u32) -> Self {
        Self {
            store,
            root,
            current: root,
        }
    }
}

impl<N> Iterator for Preorder<'_, N> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_in_preorder(idx, self.root);
        Some(self.store.id_at(idx))
    }
}
