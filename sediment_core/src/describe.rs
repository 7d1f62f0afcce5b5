// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable node descriptions.
//!
//! A [`Node`] describes one node of the desired tree: its [`NodeKind`], its
//! [`Attributes`], and its ordered children. Descriptions are cheap to clone
//! (attributes and children are reference counted) and are never mutated by
//! the reconciler; a component produces a fresh set on every render.
//!
//! [`describe`] is the single factory. It normalizes loose children: strings
//! and numbers become [`NodeKind::Text`] nodes carrying their content under
//! [`TEXT_KEY`], and absent children (`None`, `()`, booleans) become
//! [`NodeKind::Empty`] placeholders that keep positions stable.
//!
//! ```rust,ignore
//! let tree = element("h1")
//!     .child(element("a").on("click", move |_| set.update(|c| c + 1)).child("Count: "))
//!     .child(element("span").child(count))
//!     .build();
//! ```

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;
use core::marker::PhantomData;

use crate::hooks::RenderContext;

/// Attribute key under which a text node stores its content.
pub const TEXT_KEY: &str = "nodeValue";

/// Attribute key prefix reserved for event listeners (`onClick` → `click`).
pub const LISTENER_PREFIX: &str = "on";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// A host element tag, such as `"div"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    /// Returns the tag name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Tag {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// What a node is: a host element, synthetic text, an empty placeholder, or a
/// component function.
///
/// Two kinds are equal when they are the same variant with the same tag, or
/// the same component function (see [`Component`]).
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A host element with the given tag.
    Element(Tag),
    /// A text node; its content lives under [`TEXT_KEY`].
    Text,
    /// A placeholder with no surface node and no children.
    Empty,
    /// A component function.
    Component(Component),
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Converts a component's return value into its child descriptions.
pub trait IntoNodes {
    /// Performs the conversion.
    fn into_nodes(self) -> Vec<Node>;
}

impl IntoNodes for Node {
    fn into_nodes(self) -> Vec<Node> {
        alloc::vec![self]
    }
}

impl IntoNodes for NodeBuilder {
    fn into_nodes(self) -> Vec<Node> {
        alloc::vec![self.build()]
    }
}

impl IntoNodes for Vec<Node> {
    fn into_nodes(self) -> Vec<Node> {
        self
    }
}

impl IntoNodes for Option<Node> {
    fn into_nodes(self) -> Vec<Node> {
        self.into_iter().collect()
    }
}

impl<const N: usize> IntoNodes for [Node; N] {
    fn into_nodes(self) -> Vec<Node> {
        self.into()
    }
}

/// Type-erased render function stored in a [`Component`].
trait Render {
    fn render(&self, cx: &mut RenderContext<'_>, props: &Props<'_>) -> Vec<Node>;
}

struct RenderFn<F, R> {
    f: F,
    _output: PhantomData<fn() -> R>,
}

impl<F, R> Render for RenderFn<F, R>
where
    F: Fn(&mut RenderContext<'_>, &Props<'_>) -> R,
    R: IntoNodes,
{
    fn render(&self, cx: &mut RenderContext<'_>, props: &Props<'_>) -> Vec<Node> {
        (self.f)(cx, props).into_nodes()
    }
}

/// A component function.
///
/// Identity is the Rust type of the function value: every description built
/// from the same `fn` item or the same closure expression has an equal kind,
/// so its fiber is reused across renders. The render function itself is
/// always taken from the newest description, so a closure may capture fresh
/// values on every render.
#[derive(Clone)]
pub struct Component {
    id: TypeId,
    name: &'static str,
    render: Rc<dyn Render>,
}

impl Component {
    /// Wraps a render function.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &Props<'_>) -> R + 'static,
        R: IntoNodes + 'static,
    {
        Self {
            id: TypeId::of::<F>(),
            name: core::any::type_name::<F>(),
            render: Rc::new(RenderFn {
                f,
                _output: PhantomData,
            }),
        }
    }

    /// Returns the type name of the render function (for diagnostics).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, cx: &mut RenderContext<'_>, props: &Props<'_>) -> Vec<Node> {
        self.render.render(cx, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// The input a component renders from.
#[derive(Clone, Copy, Debug)]
pub struct Props<'a> {
    /// The component node's attributes.
    pub attributes: &'a Attributes,
    /// The component node's children, as passed by the parent.
    pub children: &'a [Node],
}

impl Props<'_> {
    /// Returns the attribute stored under `key`.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

// ---------------------------------------------------------------------------
// Attribute values
// ---------------------------------------------------------------------------

/// A DOM-like event delivered to a [`Listener`].
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name, such as `"click"`.
    pub name: String,
    /// Optional payload, such as an input's new value.
    pub value: Option<Value>,
}

impl Event {
    /// Creates an event without a payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// An event listener.
///
/// Listeners compare by reference: two listeners are equal only when they are
/// clones of the same allocation. A closure rebuilt on every render is
/// therefore a changed attribute on every render.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    /// Wraps a callback.
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the callback.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// Returns `true` if both listeners share one allocation.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// An attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A string.
    Str(String),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An event listener.
    Listener(Listener),
}

impl Value {
    /// Returns the listener if this value is one.
    #[must_use]
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            Self::Listener(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Listener(_) => f.write_str("[listener]"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Listener> for Value {
    fn from(l: Listener) -> Self {
        Self::Listener(l)
    }
}

/// Returns the event name for a listener key (`"onClick"` → `"click"`), or
/// `None` if the key is not a listener key.
#[must_use]
pub fn listener_event(key: &str) -> Option<String> {
    key.strip_prefix(LISTENER_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(str::to_lowercase)
}

/// An immutable, cheaply clonable attribute map.
///
/// Keys starting with [`LISTENER_PREFIX`] are listener slots; everything else
/// is a plain attribute. A non-listener value stored under a listener key is
/// ignored by the commit phase.
#[derive(Clone, Default, PartialEq)]
pub struct Attributes(Rc<BTreeMap<String, Value>>);

impl Attributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the map with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`, copying the map first if it is shared.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        Rc::make_mut(&mut self.0).insert(key.into(), value.into());
    }

    /// Returns the value under `key`.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if both maps share one allocation.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over listener entries as `(key, listener)`.
    pub fn listeners(&self) -> impl Iterator<Item = (&str, &Listener)> {
        self.iter().filter_map(|(k, v)| {
            if k.starts_with(LISTENER_PREFIX) {
                v.as_listener().map(|l| (k, l))
            } else {
                None
            }
        })
    }

    /// Returns the listener stored under `key`.
    #[must_use]
    pub fn listener(&self, key: &str) -> Option<&Listener> {
        self.get(key).and_then(Value::as_listener)
    }

    /// Iterates over plain (non-listener) entries.
    pub fn plain(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter().filter(|(k, _)| !k.starts_with(LISTENER_PREFIX))
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// An immutable description of one node and its subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// What the node is.
    pub kind: NodeKind,
    /// The node's attributes.
    pub attributes: Attributes,
    /// The node's children in order.
    pub children: Rc<[Node]>,
}

/// A loose child passed to [`describe`], before normalization.
#[derive(Clone, Debug)]
pub enum Child {
    /// An already structured node.
    Node(Node),
    /// Text content.
    Text(String),
    /// An absent child.
    Empty,
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<NodeBuilder> for Child {
    fn from(builder: NodeBuilder) -> Self {
        Self::Node(builder.build())
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Child {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Self::Empty
    }
}

impl From<()> for Child {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl<T: Into<Self>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Self::Empty, Into::into)
    }
}

macro_rules! numeric_child {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Child {
                fn from(n: $t) -> Self {
                    Self::Text(n.to_string())
                }
            }
        )*
    };
}

numeric_child!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Child {
    fn into_node(self) -> Node {
        match self {
            Self::Node(node) => node,
            Self::Text(s) => text(s),
            Self::Empty => empty(),
        }
    }
}

/// Builds a node description, normalizing loose children.
pub fn describe<I>(kind: NodeKind, attributes: Attributes, children: I) -> Node
where
    I: IntoIterator,
    I::Item: Into<Child>,
{
    let children: Vec<Node> = children
        .into_iter()
        .map(|c| c.into().into_node())
        .collect();
    Node {
        kind,
        attributes,
        children: children.into(),
    }
}

/// Builds a text node.
#[must_use]
pub fn text(content: impl Into<String>) -> Node {
    Node {
        kind: NodeKind::Text,
        attributes: Attributes::new().with(TEXT_KEY, Value::Str(content.into())),
        children: Rc::from([]),
    }
}

/// Builds an empty placeholder node.
#[must_use]
pub fn empty() -> Node {
    Node {
        kind: NodeKind::Empty,
        attributes: Attributes::new(),
        children: Rc::from([]),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incremental builder over [`describe`].
#[derive(Clone, Debug)]
pub struct NodeBuilder {
    kind: NodeKind,
    attributes: Attributes,
    children: Vec<Child>,
}

/// Starts describing a node of any kind.
pub fn node(kind: NodeKind) -> NodeBuilder {
    NodeBuilder::new(kind)
}

/// Starts describing a host element.
pub fn element(tag: impl Into<Tag>) -> NodeBuilder {
    NodeBuilder::new(NodeKind::Element(tag.into()))
}

/// Starts describing a component node.
pub fn component<F, R>(f: F) -> NodeBuilder
where
    F: Fn(&mut RenderContext<'_>, &Props<'_>) -> R + 'static,
    R: IntoNodes + 'static,
{
    NodeBuilder::new(NodeKind::Component(Component::new(f)))
}

impl NodeBuilder {
    /// Starts describing a node of the given kind.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Sets a plain attribute.
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Sets a listener for `event` (stored under `on{event}`).
    #[must_use]
    pub fn on(mut self, event: &str, f: impl Fn(&Event) + 'static) -> Self {
        self.attributes
            .insert(format!("{LISTENER_PREFIX}{event}"), Listener::new(f));
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Appends several children.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Finishes the description.
    #[must_use]
    pub fn build(self) -> Node {
        describe(self.kind, self.attributes, self.children)
    }
}

impl From<NodeBuilder> for Node {
    fn from(builder: NodeBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn primitives_become_text_nodes() {
        let node = describe(
            NodeKind::Element("p".into()),
            Attributes::new(),
            vec![Child::from("hi"), Child::from(42_i32), Child::from(1.5_f64)],
        );
        assert_eq!(node.children.len(), 3, "three children");
        for child in node.children.iter() {
            assert_eq!(child.kind, NodeKind::Text, "normalized to text");
        }
        assert_eq!(
            node.children[1].attributes.get(TEXT_KEY),
            Some(&Value::Str("42".into())),
            "number rendered as text"
        );
    }

    #[test]
    fn absent_children_become_empty_nodes() {
        let node = element("div")
            .child(None::<Node>)
            .child(false)
            .child(())
            .child("x")
            .build();
        let kinds: Vec<_> = node.children.iter().map(|c| c.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Empty, NodeKind::Empty, NodeKind::Empty, NodeKind::Text],
            "positions are kept by empty placeholders"
        );
    }

    #[test]
    fn structured_children_pass_through() {
        let inner = element("span").attr("id", "a").build();
        let outer = element("div").child(inner.clone()).build();
        assert_eq!(outer.children[0], inner, "unchanged");
    }

    #[test]
    fn builder_splits_listeners_from_plain_attributes() {
        let node = element("a")
            .attr("href", "#")
            .on("Click", |_| {})
            .build();
        let plain: Vec<_> = node.attributes.plain().map(|(k, _)| k).collect();
        let listeners: Vec<_> = node.attributes.listeners().map(|(k, _)| k).collect();
        assert_eq!(plain, vec!["href"], "plain attributes");
        assert_eq!(listeners, vec!["onClick"], "listener attributes");
        assert_eq!(listener_event("onClick").as_deref(), Some("click"), "event name");
        assert_eq!(listener_event("href"), None, "not a listener key");
        assert_eq!(listener_event("on"), None, "prefix alone is not a listener");
    }

    #[test]
    fn listeners_compare_by_reference() {
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        assert_eq!(a, a.clone(), "clones are equal");
        assert_ne!(a, b, "distinct allocations differ");
    }

    #[test]
    fn attributes_copy_on_write() {
        let a = Attributes::new().with("k", 1_i64);
        let mut b = a.clone();
        assert!(a.ptr_eq(&b), "shared after clone");
        b.insert("k", 2_i64);
        assert!(!a.ptr_eq(&b), "copied on write");
        assert_eq!(a.get("k"), Some(&Value::Int(1)), "original untouched");
    }

    fn one(_: &mut RenderContext<'_>, _: &Props<'_>) -> Node {
        text("one")
    }

    fn two(_: &mut RenderContext<'_>, _: &Props<'_>) -> Node {
        text("two")
    }

    #[test]
    fn component_identity_follows_function_type() {
        let a = Component::new(one);
        let b = Component::new(one);
        let c = Component::new(two);
        assert_eq!(a, b, "same fn item");
        assert_ne!(a, c, "different fn items");
        assert_eq!(
            NodeKind::Component(a.clone()),
            NodeKind::Component(b),
            "kind equality"
        );
        assert_ne!(NodeKind::Component(a), NodeKind::Text, "variant mismatch");
    }

    #[test]
    fn element_kinds_compare_by_tag() {
        assert_eq!(
            NodeKind::Element("div".into()),
            NodeKind::Element(String::from("div").into()),
            "borrowed and owned tags"
        );
        assert_ne!(
            NodeKind::Element("div".into()),
            NodeKind::Element("span".into()),
            "different tags"
        );
    }
}
