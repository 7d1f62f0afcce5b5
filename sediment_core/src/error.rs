// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by the work loop.

use crate::fiber::FiberId;
use crate::surface::SurfaceError;

/// An error that stopped a generation.
///
/// The committed tree is never touched by a failed generation; the surface
/// keeps showing the last successful commit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The surface adapter could not create a node for a fiber. The
    /// generation was abandoned.
    #[error("surface rejected fiber {fiber} in generation {generation}")]
    Surface {
        /// The abandoned generation.
        generation: u64,
        /// The fiber whose node could not be created.
        fiber: FiberId,
        /// The adapter's error.
        #[source]
        source: SurfaceError,
    },
    /// [`Scheduler::flush`](crate::scheduler::Scheduler::flush) gave up because
    /// every commit scheduled another generation.
    #[error("tree did not settle after {generations} generations")]
    Unsettled {
        /// Generations committed before giving up.
        generations: u32,
    },
}
