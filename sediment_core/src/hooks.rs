// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component-local state.
//!
//! A component fiber owns an ordered list of hook slots. A slot is identified
//! only by its call position within a render: the first `use_state` call
//! reads slot 0, the second slot 1, and so on. Components must therefore make
//! the same hook calls in the same order on every render.
//!
//! Hooks are methods on [`RenderContext`], which only exists while the
//! scheduler is invoking a component, so calling a hook outside a render
//! does not compile.
//!
//! Each slot is a shared cell. When a fiber is reused by the next generation
//! the cells are carried over, so every generation of the same position
//! (committed, in flight, or abandoned) reads and queues into the same
//! record. Updates queued through a [`StateSetter`] are never lost to an
//! abandoned generation: they stay in the cell until a render drains them.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::marker::PhantomData;

use crate::fiber::FiberId;

type Update = Box<dyn FnOnce(Box<dyn Any>) -> Box<dyn Any>>;

/// One hook slot: the resolved state plus the updates queued since the last
/// render of its fiber.
pub(crate) struct HookRecord {
    state: Box<dyn Any>,
    pending: VecDeque<Update>,
}

impl HookRecord {
    fn new(state: Box<dyn Any>) -> Self {
        Self {
            state,
            pending: VecDeque::new(),
        }
    }

    /// Applies queued updates in enqueue order and clears the queue.
    ///
    /// The cell is not borrowed while an update runs, so an update may queue
    /// further updates on the same slot; those are applied in the same drain.
    fn drain(cell: &RefCell<Self>) {
        loop {
            let (update, prev) = {
                let mut record = cell.borrow_mut();
                let Some(update) = record.pending.pop_front() else {
                    return;
                };
                (update, core::mem::replace(&mut record.state, Box::new(())))
            };
            let next = update(prev);
            cell.borrow_mut().state = next;
        }
    }
}

impl fmt::Debug for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecord")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

/// A shared hook slot.
pub(crate) type HookCell = Rc<RefCell<HookRecord>>;

/// Flag shared between the scheduler and every [`StateSetter`].
///
/// Setting it asks the scheduler to start a new generation at the next slice
/// boundary. The optional wake hook lets a host loop re-arm its scheduling
/// primitive when an update arrives while it is idle.
#[derive(Default)]
pub(crate) struct UpdateSignal {
    pending: Cell<bool>,
    wake: RefCell<Option<Box<dyn Fn()>>>,
}

impl UpdateSignal {
    pub(crate) fn schedule(&self) {
        if !self.pending.replace(true) {
            self.wake();
        }
    }

    /// Runs the wake hook without touching the pending flag.
    pub(crate) fn wake(&self) {
        if let Some(wake) = &*self.wake.borrow() {
            wake();
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.get()
    }

    pub(crate) fn take(&self) -> bool {
        self.pending.replace(false)
    }

    pub(crate) fn set_wake(&self, wake: Option<Box<dyn Fn()>>) {
        *self.wake.borrow_mut() = wake;
    }
}

impl fmt::Debug for UpdateSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateSignal")
            .field("pending", &self.pending.get())
            .field("wake", &self.wake.borrow().is_some())
            .finish()
    }
}

/// The hook context of one component invocation.
///
/// Passed to every component render function. The slot cursor starts at zero
/// for each render.
pub struct RenderContext<'a> {
    hooks: &'a mut Vec<HookCell>,
    cursor: usize,
    signal: &'a Rc<UpdateSignal>,
    fiber: FiberId,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        hooks: &'a mut Vec<HookCell>,
        signal: &'a Rc<UpdateSignal>,
        fiber: FiberId,
    ) -> Self {
        Self {
            hooks,
            cursor: 0,
            signal,
            fiber,
        }
    }

    /// Returns the fiber being rendered.
    #[must_use]
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    /// Returns the number of hook calls made so far in this render.
    #[must_use]
    pub fn hook_cursor(&self) -> usize {
        self.cursor
    }

    /// Declares a piece of state, returning its value for this render and a
    /// setter.
    ///
    /// `initial` is only used the first time this slot is created for the
    /// fiber; later renders return the stored value with every queued update
    /// applied in order.
    ///
    /// # Panics
    ///
    /// Panics if the slot at this call position was created with a different
    /// type, which means the component changed its hook call order.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state), computing the initial value lazily.
    ///
    /// # Panics
    ///
    /// Panics if the slot at this call position was created with a different
    /// type.
    pub fn use_state_with<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let slot = self.cursor;
        self.cursor += 1;
        if slot == self.hooks.len() {
            self.hooks
                .push(Rc::new(RefCell::new(HookRecord::new(Box::new(init())))));
        }
        let cell = &self.hooks[slot];
        HookRecord::drain(cell);
        let value = {
            let record = cell.borrow();
            match record.state.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => panic!(
                    "hook slot {slot} of {:?} holds a different type than {}; \
                     hooks must be called in the same order on every render",
                    self.fiber,
                    core::any::type_name::<T>(),
                ),
            }
        };
        let setter = StateSetter {
            cell: Rc::downgrade(cell),
            signal: Rc::clone(self.signal),
            fiber: self.fiber,
            _marker: PhantomData,
        };
        (value, setter)
    }
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("fiber", &self.fiber)
            .field("cursor", &self.cursor)
            .field("slots", &self.hooks.len())
            .finish()
    }
}

/// Queues updates to one hook slot.
///
/// Setters may be called at any time: from event listeners, from other
/// components, or during a render. Every call is queued on the slot and
/// schedules a new generation; nothing is applied until the owning component
/// renders again. Calls made after the fiber position has been unmounted are
/// dropped.
pub struct StateSetter<T> {
    cell: Weak<RefCell<HookRecord>>,
    signal: Rc<UpdateSignal>,
    fiber: FiberId,
    _marker: PhantomData<fn(T)>,
}

impl<T: 'static> StateSetter<T> {
    /// Queues a replacement value.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Queues a function of the previous value.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        let Some(cell) = self.cell.upgrade() else {
            tracing::debug!(fiber = ?self.fiber, "state update for unmounted fiber dropped");
            return;
        };
        cell.borrow_mut()
            .pending
            .push_back(Box::new(move |prev: Box<dyn Any>| match prev.downcast::<T>() {
                Ok(prev) => Box::new(f(&*prev)) as Box<dyn Any>,
                // The slot changed type; leave it for use_state to report.
                Err(other) => other,
            }));
        self.signal.schedule();
    }

    /// Returns `true` while the fiber position that owns the slot is mounted
    /// (or still being built).
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.cell.strong_count() > 0
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
            signal: Rc::clone(&self.signal),
            fiber: self.fiber,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("fiber", &self.fiber)
            .field("mounted", &(self.cell.strong_count() > 0))
            .finish()
    }
}
