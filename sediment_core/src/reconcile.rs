// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-fiber unit of work and the positional child diff.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::describe::{Component, Node, NodeKind, Props};
use crate::fiber::{Effect, FiberId, INVALID};
use crate::hooks::RenderContext;
use crate::scheduler::Scheduler;
use crate::surface::{HostKind, Surface, SurfaceError};

impl<S: Surface> Scheduler<S> {
    /// Processes one fiber and returns the next one in pre-order.
    ///
    /// Components render; host fibers get a detached surface node if they do
    /// not own one yet. Either way the resulting child descriptions are diffed
    /// against the committed children.
    pub(crate) fn perform_unit_of_work(
        &mut self,
        surface: &mut S,
        unit: FiberId,
    ) -> Result<Option<FiberId>, SurfaceError> {
        let i = unit.idx as usize;
        let children: Rc<[Node]> = match self.fibers.kind[i].clone() {
            None => Rc::clone(&self.fibers.children[i]),
            Some(NodeKind::Component(component)) => Rc::from(self.render_component(unit, &component)),
            Some(NodeKind::Element(tag)) => {
                self.ensure_surface_node(surface, i, HostKind::Element(tag.as_str()))?;
                Rc::clone(&self.fibers.children[i])
            }
            Some(NodeKind::Text) => {
                self.ensure_surface_node(surface, i, HostKind::Text)?;
                Rc::clone(&self.fibers.children[i])
            }
            Some(NodeKind::Empty) => Rc::from([]),
        };
        self.reconcile_children(unit, &children);

        let stop = self.wip_root.map_or(unit.idx, |root| root.idx);
        let next = self.fibers.next_in_preorder(unit.idx, stop);
        Ok((next != INVALID).then(|| self.fibers.id_at(next)))
    }

    /// Invokes a component with its fiber's hook slots.
    fn render_component(&mut self, unit: FiberId, component: &Component) -> Vec<Node> {
        let i = unit.idx as usize;
        let mut hooks = core::mem::take(&mut self.fibers.hooks[i]);
        let attributes = self.fibers.attributes[i].clone();
        let children = Rc::clone(&self.fibers.children[i]);
        let props = Props {
            attributes: &attributes,
            children: &children,
        };

        let was_pending = self.signal.is_pending();
        let nodes = {
            let mut cx = RenderContext::new(&mut hooks, &self.signal, unit);
            component.render(&mut cx, &props)
        };
        self.fibers.hooks[i] = hooks;
        if !was_pending && self.signal.take() {
            self.update_after_commit = true;
        }
        nodes
    }

    fn ensure_surface_node(
        &mut self,
        surface: &mut S,
        i: usize,
        kind: HostKind<'_>,
    ) -> Result<(), SurfaceError> {
        if self.fibers.surface[i].is_none() {
            let node = surface.create_node(kind, &self.fibers.attributes[i])?;
            self.fibers.surface[i] = Some(node);
        }
        Ok(())
    }

    /// Diffs `elements` against the committed children of `parent`'s
    /// alternate, position by position.
    ///
    /// A child whose kind matches the committed child at the same index
    /// becomes an [`Update`](Effect::Update) that inherits the surface node
    /// and hook slots. Anything else becomes an [`Insert`](Effect::Insert),
    /// and the displaced committed child is queued for deletion, as is every
    /// committed child past the end of `elements`.
    pub(crate) fn reconcile_children(&mut self, parent: FiberId, elements: &[Node]) {
        let mut old = self
            .fibers
            .alternate(parent)
            .map_or(INVALID, |alt| self.fibers.first_child[alt.idx as usize]);
        let mut prev: Option<FiberId> = None;

        for element in elements {
            let matched = old != INVALID
                && self.fibers.kind[old as usize].as_ref() == Some(&element.kind);
            let fiber = self.fibers.allocate(
                Some(element.kind.clone()),
                element.attributes.clone(),
                Rc::clone(&element.children),
            );
            let f = fiber.idx as usize;
            if matched {
                let o = old as usize;
                self.fibers.surface[f] = self.fibers.surface[o].clone();
                self.fibers.hooks[f] = self.fibers.hooks[o].clone();
                self.fibers.alternate[f] = Some(self.fibers.id_at(old));
                self.fibers.effect[f] = Effect::Update;
            } else {
                self.fibers.effect[f] = Effect::Insert;
                if old != INVALID {
                    self.mark_deletion(old);
                }
            }
            self.fibers.link(parent, prev, fiber);
            prev = Some(fiber);
            if old != INVALID {
                old = self.fibers.next_sibling[old as usize];
            }
        }

        while old != INVALID {
            self.mark_deletion(old);
            old = self.fibers.next_sibling[old as usize];
        }
    }

    fn mark_deletion(&mut self, idx: u32) {
        self.fibers.effect[idx as usize] = Effect::Delete;
        self.deletions.push(self.fibers.id_at(idx));
    }

    #[cfg(feature = "trace-rich")]
    pub(crate) fn unit_kind(&self, unit: FiberId) -> crate::trace::UnitKind {
        use crate::trace::UnitKind;
        match &self.fibers.kind[unit.idx as usize] {
            None => UnitKind::Root,
            Some(NodeKind::Component(_)) => UnitKind::Component,
            Some(NodeKind::Element(_)) => UnitKind::Element,
            Some(NodeKind::Text) => UnitKind::Text,
            Some(NodeKind::Empty) => UnitKind::Empty,
        }
    }
}
