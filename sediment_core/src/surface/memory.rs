// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless in-memory surface.
//!
//! [`MemorySurface`] keeps a small retained tree in plain vectors and logs
//! every call it receives as a [`SurfaceOp`]. It backs the scenario tests and
//! the counter demo, and is handy for server-side or snapshot rendering.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Write as _};

use crate::describe::{Attributes, Event, Listener, TEXT_KEY, Value};

use super::{HostKind, Surface, SurfaceError};

/// A handle to a node in a [`MemorySurface`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNodeId(u32);

impl fmt::Debug for MemoryNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// One recorded call into the surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceOp {
    /// A node was created (`kind` is the tag, or `#text`).
    Create {
        /// The new node.
        node: MemoryNodeId,
        /// Tag name or `#text`.
        kind: String,
    },
    /// A plain attribute was set.
    SetAttribute {
        /// Target node.
        node: MemoryNodeId,
        /// Attribute key.
        key: String,
    },
    /// A plain attribute was removed.
    RemoveAttribute {
        /// Target node.
        node: MemoryNodeId,
        /// Attribute key.
        key: String,
    },
    /// A listener was attached.
    AddListener {
        /// Target node.
        node: MemoryNodeId,
        /// Event name.
        event: String,
    },
    /// A listener was detached.
    RemoveListener {
        /// Target node.
        node: MemoryNodeId,
        /// Event name.
        event: String,
    },
    /// A node was inserted.
    Insert {
        /// New parent.
        parent: MemoryNodeId,
        /// Inserted node.
        node: MemoryNodeId,
        /// Anchor the node was placed before, if any.
        before: Option<MemoryNodeId>,
    },
    /// A node was detached.
    Remove {
        /// Former parent.
        parent: MemoryNodeId,
        /// Detached node.
        node: MemoryNodeId,
    },
    /// A node was released.
    Release {
        /// Released node.
        node: MemoryNodeId,
    },
}

impl SurfaceOp {
    /// Returns `true` for operations that change what an observer of the
    /// attached tree can see. Creating a detached node does not.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Create { .. })
    }
}

#[derive(Clone, Debug)]
enum MemoryKind {
    Container(String),
    Element(String),
    Text,
}

#[derive(Clone, Debug)]
struct MemoryNode {
    kind: MemoryKind,
    attributes: BTreeMap<String, Value>,
    listeners: Vec<(String, Listener)>,
    parent: Option<MemoryNodeId>,
    children: Vec<MemoryNodeId>,
    released: bool,
}

impl MemoryNode {
    fn new(kind: MemoryKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            listeners: Vec::new(),
            parent: None,
            children: Vec::new(),
            released: false,
        }
    }
}

/// An in-memory [`Surface`] with an operation log.
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: Vec<MemoryNode>,
    ops: Vec<SurfaceOp>,
    rejected: Vec<String>,
}

impl MemorySurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container node to render into. Not logged.
    pub fn create_container(&mut self, name: &str) -> MemoryNodeId {
        self.push(MemoryNode::new(MemoryKind::Container(name.to_string())))
    }

    /// Returns the name given to [`create_container`](Self::create_container),
    /// or `None` if `id` is not a container.
    #[must_use]
    pub fn container_name(&self, id: MemoryNodeId) -> Option<&str> {
        match &self.node(id).kind {
            MemoryKind::Container(name) => Some(name),
            MemoryKind::Element(_) | MemoryKind::Text => None,
        }
    }

    /// Makes [`create_node`](Surface::create_node) fail for `tag`, simulating
    /// a kind the adapter has no mapping for.
    pub fn reject_tag(&mut self, tag: &str) {
        self.rejected.push(tag.to_string());
    }

    /// Returns the operations recorded since the last [`take_ops`](Self::take_ops).
    #[must_use]
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Returns and clears the operation log.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        core::mem::take(&mut self.ops)
    }

    /// Returns the parent of an attached node.
    #[must_use]
    pub fn parent(&self, id: MemoryNodeId) -> Option<MemoryNodeId> {
        self.node(id).parent
    }

    /// Returns the children of a node in order.
    #[must_use]
    pub fn children(&self, id: MemoryNodeId) -> &[MemoryNodeId] {
        &self.node(id).children
    }

    /// Returns a plain attribute of a node.
    #[must_use]
    pub fn attribute(&self, id: MemoryNodeId, key: &str) -> Option<&Value> {
        self.node(id).attributes.get(key)
    }

    /// Returns the number of listeners attached to a node for `event`.
    #[must_use]
    pub fn listener_count(&self, id: MemoryNodeId, event: &str) -> usize {
        self.node(id)
            .listeners
            .iter()
            .filter(|(e, _)| e == event)
            .count()
    }

    /// Returns `true` once [`release`](Surface::release) was called for a node.
    #[must_use]
    pub fn is_released(&self, id: MemoryNodeId) -> bool {
        self.node(id).released
    }

    /// Returns the first element with `tag` under `root`, in document order.
    #[must_use]
    pub fn find(&self, root: MemoryNodeId, tag: &str) -> Option<MemoryNodeId> {
        self.find_all(root, tag).into_iter().next()
    }

    /// Returns every element with `tag` under `root`, in document order.
    #[must_use]
    pub fn find_all(&self, root: MemoryNodeId, tag: &str) -> Vec<MemoryNodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<MemoryNodeId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if matches!(&node.kind, MemoryKind::Element(t) if t == tag) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    /// Returns the concatenated text of a subtree.
    #[must_use]
    pub fn text_content(&self, id: MemoryNodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    /// Serializes the children of `id` (or the node itself, if it is not a
    /// container) as HTML-like markup. Listeners are not shown.
    #[must_use]
    pub fn markup(&self, id: MemoryNodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    /// Invokes every listener attached to `id` for `event.name`, returning how
    /// many ran.
    pub fn dispatch(&self, id: MemoryNodeId, event: &Event) -> usize {
        let listeners: Vec<Listener> = self
            .node(id)
            .listeners
            .iter()
            .filter(|(e, _)| *e == event.name)
            .map(|(_, l)| l.clone())
            .collect();
        for listener in &listeners {
            listener.call(event);
        }
        listeners.len()
    }

    // -- internals --

    fn push(&mut self, node: MemoryNode) -> MemoryNodeId {
        let id = MemoryNodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    fn node(&self, id: MemoryNodeId) -> &MemoryNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: MemoryNodeId) -> &mut MemoryNode {
        &mut self.nodes[id.0 as usize]
    }

    fn detach(&mut self, id: MemoryNodeId) -> Option<MemoryNodeId> {
        let parent = self.node_mut(id).parent.take()?;
        self.node_mut(parent).children.retain(|c| *c != id);
        Some(parent)
    }

    fn collect_text(&self, id: MemoryNodeId, out: &mut String) {
        let node = self.node(id);
        if let MemoryKind::Text = node.kind {
            if let Some(v) = node.attributes.get(TEXT_KEY) {
                let _ = write!(out, "{v}");
            }
            return;
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    fn write_markup(&self, id: MemoryNodeId, out: &mut String) {
        let node = self.node(id);
        match &node.kind {
            MemoryKind::Container(_) => {
                for &child in &node.children {
                    self.write_markup(child, out);
                }
            }
            MemoryKind::Text => {
                if let Some(v) = node.attributes.get(TEXT_KEY) {
                    let _ = write!(out, "{v}");
                }
            }
            MemoryKind::Element(tag) => {
                let _ = write!(out, "<{tag}");
                for (k, v) in &node.attributes {
                    let _ = write!(out, " {k}=\"{v}\"");
                }
                out.push('>');
                for &child in &node.children {
                    self.write_markup(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

impl Surface for MemorySurface {
    type Node = MemoryNodeId;

    fn create_node(
        &mut self,
        kind: HostKind<'_>,
        attributes: &Attributes,
    ) -> Result<MemoryNodeId, SurfaceError> {
        let (kind, label) = match kind {
            HostKind::Element(tag) => {
                if self.rejected.iter().any(|r| r == tag) {
                    return Err(SurfaceError::UnknownKind(tag.to_string()));
                }
                (MemoryKind::Element(tag.to_string()), tag.to_string())
            }
            HostKind::Text => (MemoryKind::Text, "#text".to_string()),
        };
        let mut node = MemoryNode::new(kind);
        node.attributes = attributes
            .plain()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let id = self.push(node);
        self.ops.push(SurfaceOp::Create {
            node: id,
            kind: label,
        });
        Ok(id)
    }

    fn set_attribute(&mut self, node: &MemoryNodeId, key: &str, value: &Value) {
        self.node_mut(*node)
            .attributes
            .insert(key.to_string(), value.clone());
        self.ops.push(SurfaceOp::SetAttribute {
            node: *node,
            key: key.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: &MemoryNodeId, key: &str) {
        self.node_mut(*node).attributes.remove(key);
        self.ops.push(SurfaceOp::RemoveAttribute {
            node: *node,
            key: key.to_string(),
        });
    }

    fn add_listener(&mut self, node: &MemoryNodeId, event: &str, listener: &Listener) {
        self.node_mut(*node)
            .listeners
            .push((event.to_string(), listener.clone()));
        self.ops.push(SurfaceOp::AddListener {
            node: *node,
            event: event.to_string(),
        });
    }

    fn remove_listener(&mut self, node: &MemoryNodeId, event: &str, listener: &Listener) {
        let listeners = &mut self.node_mut(*node).listeners;
        if let Some(pos) = listeners
            .iter()
            .position(|(e, l)| e == event && l.ptr_eq(listener))
        {
            listeners.remove(pos);
        }
        self.ops.push(SurfaceOp::RemoveListener {
            node: *node,
            event: event.to_string(),
        });
    }

    fn insert_child(
        &mut self,
        parent: &MemoryNodeId,
        child: &MemoryNodeId,
        before: Option<&MemoryNodeId>,
    ) {
        self.detach(*child);
        let siblings = &self.node(*parent).children;
        let at = match before {
            Some(anchor) => siblings.iter().position(|c| c == anchor).unwrap_or_else(|| {
                tracing::warn!(?anchor, ?parent, "insertion anchor is not a child; appending");
                siblings.len()
            }),
            None => siblings.len(),
        };
        self.node_mut(*parent).children.insert(at, *child);
        self.node_mut(*child).parent = Some(*parent);
        self.ops.push(SurfaceOp::Insert {
            parent: *parent,
            node: *child,
            before: before.copied(),
        });
    }

    fn remove_child(&mut self, parent: &MemoryNodeId, child: &MemoryNodeId) {
        if self.node(*child).parent == Some(*parent) {
            self.detach(*child);
        } else {
            tracing::warn!(?child, ?parent, "removing a node that is not a child");
        }
        self.ops.push(SurfaceOp::Remove {
            parent: *parent,
            node: *child,
        });
    }

    fn release(&mut self, node: &MemoryNodeId) {
        let n = self.node_mut(*node);
        n.released = true;
        n.listeners.clear();
        self.ops.push(SurfaceOp::Release { node: *node });
    }
}
