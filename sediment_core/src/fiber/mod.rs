// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber tree data model.
//!
//! A *fiber* is the mutable, persistent counterpart of a node description.
//! Each fiber has:
//!
//! - An identity ([`FiberId`]), a generational handle that becomes stale when
//!   the fiber is freed.
//! - Topology: parent, first-child, and next-sibling links forming an ordered
//!   tree, walked by explicit pointer chasing so the work loop can stop
//!   between any two fibers.
//! - The description it was produced from: kind, attributes, and children.
//! - Render state: the owned surface node (host fibers only), the
//!   [`alternate`](FiberStore::alternate) link to the same position in the
//!   last committed tree, the pending [`Effect`], and the hook slots of a
//!   component fiber.
//!
//! Every generation's fibers live in one struct-of-arrays [`FiberStore`].

mod id;
mod store;
mod traverse;

pub use id::{Effect, FiberId, INVALID};
pub use store::FiberStore;
pub use traverse::{Children, Preorder};
