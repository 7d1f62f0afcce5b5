// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestIdleCallback` slice source.
//!
//! [`IdleLoop`] asks the browser for idle periods and hands each one to a
//! callback as an [`IdleDeadline`], which implements the scheduler's
//! [`Deadline`]. Unlike an animation loop it only stays armed while the
//! callback reports pending work; [`IdleWaker`] re-arms it when new work
//! arrives.
//!
//! Time is reported in microsecond [`HostTime`] ticks.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use sediment_core::deadline::Deadline;
use sediment_core::time::{Duration, HostTime};

use crate::millis_to_ticks;

// Direct global bindings instead of `web_sys::Window` methods, so no
// Window object has to be fetched (and unwrapped) on every slice.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestIdleCallback")]
    fn request_idle_callback(callback: &JsValue) -> u32;

    #[wasm_bindgen(js_name = "cancelIdleCallback")]
    fn cancel_idle_callback(id: u32);
}

/// The budget of one idle period.
pub struct IdleDeadline {
    inner: web_sys::IdleDeadline,
}

impl IdleDeadline {
    /// Returns `true` if the browser ran the callback because its timeout
    /// expired rather than because it was idle.
    #[must_use]
    pub fn did_timeout(&self) -> bool {
        self.inner.did_timeout()
    }
}

impl Deadline for IdleDeadline {
    fn time_remaining(&self) -> Duration {
        Duration(millis_to_ticks(self.inner.time_remaining()))
    }

    fn now(&self) -> HostTime {
        crate::now()
    }
}

impl core::fmt::Debug for IdleDeadline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdleDeadline")
            .field("time_remaining", &self.inner.time_remaining())
            .finish_non_exhaustive()
    }
}

/// A `requestIdleCallback` loop that runs while its callback has work.
///
/// The callback receives the idle period's [`IdleDeadline`] and returns
/// `true` if it wants another idle period. When it returns `false` the loop
/// goes quiet until [`wake`](Self::wake) (or an [`IdleWaker`]) re-arms it.
/// Dropping the loop cancels any pending callback.
pub struct IdleLoop {
    inner: Rc<IdleInner>,
}

type IdleClosure = Closure<dyn FnMut(web_sys::IdleDeadline)>;

struct IdleInner {
    /// The JS closure registered with `requestIdleCallback`.
    closure: RefCell<Option<IdleClosure>>,

    /// The user callback; returns whether more work is pending.
    callback: RefCell<Box<dyn FnMut(&IdleDeadline) -> bool>>,

    /// Whether a callback is currently requested.
    armed: Cell<bool>,

    /// The ID returned by the most recent `requestIdleCallback` call.
    idle_id: Cell<u32>,

    /// Idle periods handed to the callback so far.
    slices: Cell<u64>,
}

impl IdleInner {
    fn arm(&self) {
        if self.armed.get() {
            return;
        }
        if let Some(closure) = &*self.closure.borrow() {
            self.armed.set(true);
            self.idle_id
                .set(request_idle_callback(closure.as_ref().unchecked_ref()));
        }
    }

    fn disarm(&self) {
        if self.armed.replace(false) {
            cancel_idle_callback(self.idle_id.get());
        }
    }
}

impl IdleLoop {
    /// Creates a loop around `callback`. Nothing runs until the first
    /// [`wake`](Self::wake).
    pub fn new(callback: impl FnMut(&IdleDeadline) -> bool + 'static) -> Self {
        let inner = Rc::new(IdleInner {
            closure: RefCell::new(None),
            callback: RefCell::new(Box::new(callback)),
            armed: Cell::new(false),
            idle_id: Cell::new(0),
            slices: Cell::new(0),
        });

        // The closure holds a weak handle so the loop and its JS closure do
        // not keep each other alive.
        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |deadline: web_sys::IdleDeadline| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.armed.set(false);
            inner.slices.set(inner.slices.get() + 1);
            let deadline = IdleDeadline { inner: deadline };
            // The callback may wake the loop itself; `arm` is idempotent.
            let more = {
                let mut callback = inner.callback.borrow_mut();
                callback(&deadline)
            };
            if more {
                inner.arm();
            }
        }) as Box<dyn FnMut(web_sys::IdleDeadline)>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Requests an idle callback unless one is already pending.
    pub fn wake(&self) {
        self.inner.arm();
    }

    /// Cancels the pending idle callback, if any.
    pub fn stop(&self) {
        self.inner.disarm();
    }

    /// Returns `true` if an idle callback is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner.armed.get()
    }

    /// Returns a handle that can re-arm this loop from elsewhere.
    #[must_use]
    pub fn waker(&self) -> IdleWaker {
        IdleWaker {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Drop for IdleLoop {
    fn drop(&mut self) {
        self.inner.disarm();
        // Drop the JS closure so it doesn't leak.
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for IdleLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdleLoop")
            .field("armed", &self.inner.armed.get())
            .field("slices", &self.inner.slices.get())
            .finish_non_exhaustive()
    }
}

/// A weak handle that re-arms an [`IdleLoop`].
///
/// Install it as the scheduler's wake hook so that state updates fired from
/// DOM events schedule an idle period. Waking a dropped loop does nothing.
#[derive(Clone)]
pub struct IdleWaker {
    inner: Weak<IdleInner>,
}

impl core::fmt::Debug for IdleWaker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdleWaker")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl IdleWaker {
    /// Requests an idle callback if the loop is alive and idle.
    pub fn wake(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.arm();
        }
    }
}
