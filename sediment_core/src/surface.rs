// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface adapter contract.
//!
//! The reconciler never touches a rendering surface directly. Platform crates
//! implement [`Surface`] for their retained tree (DOM nodes, a native widget
//! tree, the in-memory [`MemorySurface`](memory::MemorySurface) used by tests)
//! and the scheduler calls it at two points:
//!
//! - **Building:** [`create_node`](Surface::create_node) for every host fiber
//!   that does not own a node yet. The node stays detached, so creating it is
//!   invisible.
//! - **Committing:** everything else, in one uninterrupted pass: removals and
//!   [`release`](Surface::release) for deleted subtrees, then insertions and
//!   attribute/listener diffs in tree order.
//!
//! # Crate boundaries
//!
//! `sediment_core` owns the description model, the fiber tree, the scheduler,
//! and this contract. Backend crates depend on `sediment_core` and provide a
//! `Surface` plus a host loop that calls
//! [`Scheduler::run_slice`](crate::scheduler::Scheduler::run_slice) from the
//! platform's scheduling primitive.

pub mod memory;

use alloc::string::String;
use core::fmt;

use crate::describe::{Attributes, Listener, Value};

/// The kind of surface node to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostKind<'a> {
    /// An element with the given tag.
    Element(&'a str),
    /// A text node; its content is the [`TEXT_KEY`](crate::describe::TEXT_KEY)
    /// attribute.
    Text,
}

/// An error reported by a surface adapter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The adapter has no mapping for the requested kind.
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
    /// The platform call failed.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Applies a committed generation to a retained rendering surface.
///
/// The adapter owns its nodes; the scheduler only holds cloned handles.
/// Handles must compare equal when they refer to the same node, since the
/// scheduler compares containers to detect a remount.
pub trait Surface {
    /// A handle to one surface node.
    type Node: Clone + PartialEq + fmt::Debug;

    /// Creates a detached node and applies its plain attributes.
    ///
    /// Listeners are not attached here; the commit phase adds them when the
    /// node is inserted, so no handler can fire for an uncommitted node.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] when the node cannot be created. The scheduler
    /// abandons the generation and keeps the committed tree.
    fn create_node(
        &mut self,
        kind: HostKind<'_>,
        attributes: &Attributes,
    ) -> Result<Self::Node, SurfaceError>;

    /// Sets a plain attribute. For text nodes the
    /// [`TEXT_KEY`](crate::describe::TEXT_KEY) attribute is the node's text.
    fn set_attribute(&mut self, node: &Self::Node, key: &str, value: &Value);

    /// Removes a plain attribute.
    fn remove_attribute(&mut self, node: &Self::Node, key: &str);

    /// Attaches a listener for `event` (already stripped of the `on` prefix
    /// and lowercased).
    fn add_listener(&mut self, node: &Self::Node, event: &str, listener: &Listener);

    /// Detaches a listener previously passed to
    /// [`add_listener`](Self::add_listener).
    fn remove_listener(&mut self, node: &Self::Node, event: &str, listener: &Listener);

    /// Inserts `child` under `parent` before `before`, or last when `before`
    /// is `None`.
    fn insert_child(&mut self, parent: &Self::Node, child: &Self::Node, before: Option<&Self::Node>);

    /// Detaches `child` from `parent`.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Called once for every node of a deleted subtree after it has been
    /// detached. Adapters that keep per-node state (listener closures, id
    /// maps) drop it here.
    fn release(&mut self, node: &Self::Node) {
        _ = node;
    }
}
