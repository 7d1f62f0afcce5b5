// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for sediment.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`DomSurface`]: a [`Surface`] over live DOM nodes
//! - [`IdleLoop`]: `requestIdleCallback` slice source, with [`IdleWaker`]
//!   handles for re-arming it when state changes
//! - [`mount`]: wires a [`Scheduler`] to both and returns a [`WebRoot`]

#![no_std]

extern crate alloc;

mod dom;
mod idle;

use alloc::rc::Rc;
use core::cell::RefCell;

pub use dom::DomSurface;
pub use idle::{IdleDeadline, IdleLoop, IdleWaker};
pub use sediment_core::surface::Surface;

use sediment_core::describe::Node;
use sediment_core::scheduler::{Scheduler, SchedulerConfig};
use sediment_core::surface::SurfaceError;
use sediment_core::time::{HostTime, Timebase};

/// Returns the current host time from `performance.now()`.
///
/// The returned [`HostTime`] is in microsecond ticks. Use [`timebase`] to
/// convert to nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    HostTime(millis_to_ticks(idle::performance_now()))
}

/// Returns the web [`Timebase`]: 1 tick = 1 µs = 1000 ns.
#[must_use]
pub fn timebase() -> Timebase {
    Timebase::MICROS
}

/// Converts a `DOMHighResTimeStamp`-style millisecond value to µs ticks.
pub(crate) fn millis_to_ticks(ms: f64) -> u64 {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "browser timestamps are small non-negative f64; µs fits in u64"
    )]
    let us = (ms.max(0.0) * 1000.0) as u64;
    us
}

/// A description tree mounted into a DOM container and driven by idle
/// callbacks.
///
/// Dropping the root stops the loop; the DOM is left as last committed.
pub struct WebRoot {
    scheduler: Rc<RefCell<Scheduler<DomSurface>>>,
    container: web_sys::Node,
    idle: IdleLoop,
}

impl core::fmt::Debug for WebRoot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebRoot")
            .field("scheduler", &self.scheduler)
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}

impl WebRoot {
    /// Replaces the mounted tree. The change lands over the next idle
    /// callbacks.
    pub fn render(&self, root: impl Into<Node>) {
        self.scheduler
            .borrow_mut()
            .render(root, self.container.clone());
    }

    /// Removes everything this root rendered into its container.
    pub fn unmount(&self) {
        self.scheduler.borrow_mut().unmount();
    }

    /// Returns `true` while a generation is in flight or requested.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.scheduler.borrow().has_pending_work()
    }

    /// Returns a handle that re-arms this root's idle loop.
    #[must_use]
    pub fn waker(&self) -> IdleWaker {
        self.idle.waker()
    }
}

/// Mounts `root` into `container` with the
/// [`idle_callback`](SchedulerConfig::idle_callback) configuration.
///
/// # Errors
///
/// Returns [`SurfaceError::Backend`] when `container` is not attached to a
/// document.
pub fn mount(root: impl Into<Node>, container: web_sys::Element) -> Result<WebRoot, SurfaceError> {
    mount_with_config(root, container, SchedulerConfig::idle_callback())
}

/// Like [`mount`], with an explicit scheduler configuration.
///
/// # Errors
///
/// See [`mount`].
pub fn mount_with_config(
    root: impl Into<Node>,
    container: web_sys::Element,
    config: SchedulerConfig,
) -> Result<WebRoot, SurfaceError> {
    let document = container
        .owner_document()
        .ok_or_else(|| SurfaceError::Backend("container has no owner document".into()))?;
    let surface = Rc::new(RefCell::new(DomSurface::new(document)));
    let scheduler: Rc<RefCell<Scheduler<DomSurface>>> =
        Rc::new(RefCell::new(Scheduler::new(config)));

    let idle = {
        let scheduler = Rc::clone(&scheduler);
        let surface = Rc::clone(&surface);
        IdleLoop::new(move |deadline: &IdleDeadline| {
            let mut scheduler = scheduler.borrow_mut();
            if let Err(err) = scheduler.run_slice(&mut *surface.borrow_mut(), deadline) {
                tracing::warn!(%err, "slice failed; committed tree kept");
            }
            scheduler.has_pending_work()
        })
    };
    let waker = idle.waker();
    scheduler
        .borrow()
        .set_wake_hook(Some(alloc::boxed::Box::new(move || waker.wake())));

    let container: web_sys::Node = container.into();
    let web_root = WebRoot {
        scheduler,
        container,
        idle,
    };
    web_root.render(root);
    Ok(web_root)
}
