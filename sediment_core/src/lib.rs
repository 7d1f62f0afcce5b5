// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber tree, positional reconciler, and cooperative render/commit
//! scheduler.
//!
//! `sediment_core` turns immutable node descriptions into changes on a
//! retained rendering surface. Work is split into units (one per fiber) so a
//! host can spread a render over many short slices, and the resulting
//! mutations are applied in one atomic commit. It is `no_std` compatible
//! (with `alloc`) and stores fibers in struct-of-arrays form addressed by
//! generational index handles.
//!
//! # Architecture
//!
//! ```text
//!   render(Node, container)      StateSetter::set()
//!            │                          │
//!            ▼                          ▼
//!   Scheduler::run_slice(surface, &dyn Deadline)
//!            │
//!            ▼
//!   Building: unit of work per fiber ──► positional diff ──► next fiber
//!            │           (yields when the deadline runs low)
//!            ▼
//!   Committing: deletions, then Insert/Update in pre-order ──► Surface
//!            │
//!            ▼
//!   committed tree = baseline for the next generation
//! ```
//!
//! **[`describe`]**: The node description model: kinds, attributes,
//! listeners, and the `describe`/`element`/`component` builders.
//!
//! **[`fiber`]**: Struct-of-arrays fiber store with generational handles and
//! allocation-free traversal.
//!
//! **[`hooks`]**: [`RenderContext`](hooks::RenderContext) and `use_state`,
//! with update queues that survive abandoned generations.
//!
//! **[`scheduler`]**: The cooperative work loop: generations, slices,
//! abandonment, commit.
//!
//! **[`surface`]**: The [`Surface`](surface::Surface) adapter contract and the
//! in-memory [`MemorySurface`](surface::memory::MemorySurface).
//!
//! **[`deadline`]**: Slice budgets: unbounded, step-counted, wall-clock.
//!
//! **[`time`]**: Host tick timestamps and durations.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! work-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies and
//!   the wall-clock deadline.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-fiber
//!   unit-of-work events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod deadline;
pub mod describe;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod scheduler;
pub mod surface;
pub mod time;
pub mod trace;

mod commit;
mod reconcile;

#[cfg(test)]
mod tests;

pub use error::Error;
