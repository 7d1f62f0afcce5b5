// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber identity.

use core::fmt;

/// Sentinel value indicating "no fiber" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a fiber in a [`FiberStore`](super::FiberStore).
///
/// Contains both a slot index and a generation counter. Slots are recycled
/// when a fiber tree is freed after a commit (or abandoned), and the bumped
/// generation makes every outstanding handle to the old fiber stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl FiberId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FiberId({}@gen{})", self.idx, self.generation)
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}

/// The mutation a committed generation applies for a fiber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Nothing to apply (the root anchor, or a fiber already committed).
    #[default]
    None,
    /// Attach a new surface node.
    Insert,
    /// Diff attributes against the previous generation.
    Update,
    /// Detach and release the fiber's surface subtree.
    Delete,
}
