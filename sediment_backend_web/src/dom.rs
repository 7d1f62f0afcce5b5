// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM surface.
//!
//! Maps surface calls onto `web_sys` node operations. Text nodes take their
//! content from the `nodeValue` attribute; every other plain attribute goes
//! through `setAttribute`. Listeners are wrapped in `wasm_bindgen` closures
//! which this surface keeps alive until the listener is removed or its node
//! is released.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;

use sediment_core::describe::{Attributes, Event, Listener, TEXT_KEY, Value};
use sediment_core::surface::{HostKind, Surface, SurfaceError};

type ListenerClosure = Closure<dyn FnMut(web_sys::Event)>;

/// One attached listener and the JS closure that forwards to it.
struct Attached {
    node: web_sys::Node,
    event: String,
    listener: Listener,
    closure: ListenerClosure,
}

/// A [`Surface`] over the live DOM of one document.
pub struct DomSurface {
    document: web_sys::Document,
    attached: Vec<Attached>,
}

impl core::fmt::Debug for DomSurface {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomSurface")
            .field("document", &"Document")
            .field("attached_listeners", &self.attached.len())
            .finish()
    }
}

impl DomSurface {
    /// Creates a surface that creates its nodes in `document`.
    #[must_use]
    pub fn new(document: web_sys::Document) -> Self {
        Self {
            document,
            attached: Vec::new(),
        }
    }

    /// Returns the number of listener closures currently kept alive.
    #[must_use]
    pub fn attached_listeners(&self) -> usize {
        self.attached.len()
    }

    fn detach(&mut self, index: usize) {
        let entry = self.attached.swap_remove(index);
        let target: &web_sys::EventTarget = entry.node.unchecked_ref();
        if let Err(err) = target
            .remove_event_listener_with_callback(&entry.event, entry.closure.as_ref().unchecked_ref())
        {
            tracing::warn!(event = %entry.event, ?err, "removeEventListener failed");
        }
    }
}

/// Converts a DOM event into the description-level [`Event`]. Input elements
/// contribute their current value.
fn to_event(e: &web_sys::Event) -> Event {
    let event = Event::new(e.type_());
    match e
        .target()
        .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
    {
        Some(input) => event.with_value(input.value()),
        None => event,
    }
}

fn set_element_attribute(element: &web_sys::Element, key: &str, value: &Value) {
    let result = match value {
        Value::Bool(false) => element.remove_attribute(key),
        Value::Bool(true) => element.set_attribute(key, ""),
        other => element.set_attribute(key, &other.to_string()),
    };
    if let Err(err) = result {
        tracing::warn!(key, ?err, "setAttribute failed");
    }
}

impl Surface for DomSurface {
    type Node = web_sys::Node;

    fn create_node(
        &mut self,
        kind: HostKind<'_>,
        attributes: &Attributes,
    ) -> Result<web_sys::Node, SurfaceError> {
        match kind {
            HostKind::Text => {
                let content = attributes
                    .get(TEXT_KEY)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                Ok(self.document.create_text_node(&content).into())
            }
            HostKind::Element(tag) => {
                let element = self
                    .document
                    .create_element(tag)
                    .map_err(|_| SurfaceError::UnknownKind(tag.to_string()))?;
                for (key, value) in attributes.plain() {
                    set_element_attribute(&element, key, value);
                }
                Ok(element.into())
            }
        }
    }

    fn set_attribute(&mut self, node: &web_sys::Node, key: &str, value: &Value) {
        if key == TEXT_KEY && node.node_type() == web_sys::Node::TEXT_NODE {
            node.set_node_value(Some(&value.to_string()));
        } else if let Some(element) = node.dyn_ref::<web_sys::Element>() {
            set_element_attribute(element, key, value);
        }
    }

    fn remove_attribute(&mut self, node: &web_sys::Node, key: &str) {
        if key == TEXT_KEY && node.node_type() == web_sys::Node::TEXT_NODE {
            node.set_node_value(None);
        } else if let Some(element) = node.dyn_ref::<web_sys::Element>()
            && let Err(err) = element.remove_attribute(key)
        {
            tracing::warn!(key, ?err, "removeAttribute failed");
        }
    }

    fn add_listener(&mut self, node: &web_sys::Node, event: &str, listener: &Listener) {
        let forward = listener.clone();
        let closure = Closure::wrap(Box::new(move |e: web_sys::Event| {
            forward.call(&to_event(&e));
        }) as Box<dyn FnMut(web_sys::Event)>);
        let target: &web_sys::EventTarget = node.unchecked_ref();
        if let Err(err) =
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            tracing::warn!(event, ?err, "addEventListener failed");
            return;
        }
        self.attached.push(Attached {
            node: node.clone(),
            event: event.to_string(),
            listener: listener.clone(),
            closure,
        });
    }

    fn remove_listener(&mut self, node: &web_sys::Node, event: &str, listener: &Listener) {
        if let Some(index) = self
            .attached
            .iter()
            .position(|a| a.node == *node && a.event == event && a.listener.ptr_eq(listener))
        {
            self.detach(index);
        }
    }

    fn insert_child(
        &mut self,
        parent: &web_sys::Node,
        child: &web_sys::Node,
        before: Option<&web_sys::Node>,
    ) {
        if let Err(err) = parent.insert_before(child, before) {
            tracing::warn!(?err, "insertBefore failed");
        }
    }

    fn remove_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) {
        if let Err(err) = parent.remove_child(child) {
            tracing::warn!(?err, "removeChild failed");
        }
    }

    fn release(&mut self, node: &web_sys::Node) {
        while let Some(index) = self.attached.iter().position(|a| a.node == *node) {
            self.detach(index);
        }
    }
}
