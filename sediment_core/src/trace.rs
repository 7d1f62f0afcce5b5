// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the work loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler calls as generations begin, slices run, phases change, and
//! commits land. All method bodies default to no-ops, so implementing only
//! the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`GenerationSummaryBuilder`] accumulates slice and phase timings across the
//! slices of one generation and produces a [`GenerationSummary`] at commit.
//!
//! Timestamps come from [`Deadline::now`](crate::deadline::Deadline::now).
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates the per-fiber [`UnitOfWorkEvent`]
//!   plus the corresponding `TraceSink` method.

use crate::scheduler::CommitSummary;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a generation is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Processing fibers (interruptible, may span slices).
    Build,
    /// Applying effects to the surface (uninterruptible).
    Commit,
}

/// What started a generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationCause {
    /// An explicit [`Scheduler::render`](crate::scheduler::Scheduler::render).
    Render,
    /// A queued state update.
    StateUpdate,
    /// [`Scheduler::unmount`](crate::scheduler::Scheduler::unmount).
    Unmount,
}

/// Why an in-flight generation was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbandonReason {
    /// A newer generation replaced it.
    Superseded,
    /// The surface adapter failed to create a node.
    SurfaceError,
}

/// The kind of fiber a unit of work processed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// The root anchor.
    Root,
    /// A component invocation.
    Component,
    /// A host element.
    Element,
    /// A text node.
    Text,
    /// An empty placeholder.
    Empty,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a new generation is seeded.
#[derive(Clone, Copy, Debug)]
pub struct GenerationBeginEvent {
    /// Monotonic generation counter.
    pub generation: u64,
    /// What started it.
    pub cause: GenerationCause,
    /// Host time at the start of the slice that seeded it.
    pub timestamp: HostTime,
}

/// Emitted when an uncommitted generation is dropped.
#[derive(Clone, Copy, Debug)]
pub struct GenerationAbandonEvent {
    /// Generation counter.
    pub generation: u64,
    /// Why it was dropped.
    pub reason: AbandonReason,
    /// Units of work it had completed.
    pub units: u32,
    /// Host time of abandonment.
    pub timestamp: HostTime,
}

/// Marks the start of a work slice that has work to do.
#[derive(Clone, Copy, Debug)]
pub struct SliceBeginEvent {
    /// Generation being worked on.
    pub generation: u64,
    /// Zero-based slice index within the generation.
    pub slice: u32,
    /// Host time at the start of the slice.
    pub timestamp: HostTime,
}

/// Marks the end of a work slice.
#[derive(Clone, Copy, Debug)]
pub struct SliceEndEvent {
    /// Generation being worked on.
    pub generation: u64,
    /// Zero-based slice index within the generation.
    pub slice: u32,
    /// Units of work processed in this slice.
    pub units: u32,
    /// `true` if the slice ran out of budget; `false` if it committed or
    /// failed.
    pub yielded: bool,
    /// Host time at the end of the slice.
    pub timestamp: HostTime,
}

/// Marks the beginning of a phase segment.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Generation counter.
    pub generation: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the segment.
    pub timestamp: HostTime,
}

/// Marks the end of a phase segment.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Generation counter.
    pub generation: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the segment.
    pub timestamp: HostTime,
}

/// Per-fiber record of one unit of work.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct UnitOfWorkEvent {
    /// Generation counter.
    pub generation: u64,
    /// Slot index of the processed fiber.
    pub fiber_index: u32,
    /// What kind of fiber it was.
    pub kind: UnitKind,
}

/// Per-generation timing summary produced by [`GenerationSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct GenerationSummary {
    /// Generation counter.
    pub generation: u64,
    /// What started it.
    pub cause: GenerationCause,
    /// Host time at the start of the generation.
    pub started: HostTime,
    /// Number of slices it spanned.
    pub slices: u32,
    /// Units of work processed.
    pub units: u32,
    /// Total build time in ticks across all slices.
    pub build_ticks: u64,
    /// Commit time in ticks.
    pub commit_ticks: u64,
    /// Fibers inserted by the commit.
    pub inserted: u32,
    /// Fibers updated by the commit.
    pub updated: u32,
    /// Fibers deleted by the commit.
    pub deleted: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the work loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a generation is seeded.
    fn on_generation_begin(&mut self, e: &GenerationBeginEvent) {
        _ = e;
    }

    /// Called when an uncommitted generation is dropped.
    fn on_generation_abandon(&mut self, e: &GenerationAbandonEvent) {
        _ = e;
    }

    /// Called at the start of a slice with work to do.
    fn on_slice_begin(&mut self, e: &SliceBeginEvent) {
        _ = e;
    }

    /// Called at the end of a slice.
    fn on_slice_end(&mut self, e: &SliceEndEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase segment.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase segment.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after a commit with its effect counters.
    fn on_commit(&mut self, s: &CommitSummary) {
        _ = s;
    }

    /// Called with a per-generation timing summary.
    fn on_generation_summary(&mut self, s: &GenerationSummary) {
        _ = s;
    }

    /// Called for every processed fiber (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_unit_of_work(&mut self, e: &UnitOfWorkEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates a `Tracer` method that forwards one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $method:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`GenerationBeginEvent`].
        generation_begin => on_generation_begin(GenerationBeginEvent)
    );
    forward!(
        /// Emits a [`GenerationAbandonEvent`].
        generation_abandon => on_generation_abandon(GenerationAbandonEvent)
    );
    forward!(
        /// Emits a [`SliceBeginEvent`].
        slice_begin => on_slice_begin(SliceBeginEvent)
    );
    forward!(
        /// Emits a [`SliceEndEvent`].
        slice_end => on_slice_end(SliceEndEvent)
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent)
    );
    forward!(
        /// Emits a [`CommitSummary`].
        commit => on_commit(CommitSummary)
    );
    forward!(
        /// Emits a [`GenerationSummary`].
        generation_summary => on_generation_summary(GenerationSummary)
    );

    /// Emits a [`UnitOfWorkEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn unit_of_work(&mut self, e: &UnitOfWorkEvent) {
        if let Some(s) = &mut self.sink {
            s.on_unit_of_work(e);
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects slice counts and phase timings across the slices of one
/// generation and produces a [`GenerationSummary`].
#[derive(Debug)]
pub struct GenerationSummaryBuilder {
    begin: GenerationBeginEvent,
    slices: u32,
    units: u32,
    open: [Option<HostTime>; 2],
    ticks: [u64; 2],
}

impl GenerationSummaryBuilder {
    /// Starts building a summary for the given generation.
    #[must_use]
    pub fn new(begin: &GenerationBeginEvent) -> Self {
        Self {
            begin: *begin,
            slices: 0,
            units: 0,
            open: [None; 2],
            ticks: [0; 2],
        }
    }

    /// Records a finished slice that processed `units` fibers.
    pub fn slice(&mut self, units: u32) {
        self.slices += 1;
        self.units += units;
    }

    /// Records the start of a phase segment.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.open[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase segment. Segments of the same phase add up.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        let idx = phase_index(phase);
        if let Some(start) = self.open[idx].take() {
            self.ticks[idx] += t.saturating_duration_since(start).ticks();
        }
    }

    /// Returns the number of units recorded so far.
    #[must_use]
    pub fn units(&self) -> u32 {
        self.units
    }

    /// Consumes the builder and produces the final [`GenerationSummary`].
    #[must_use]
    pub fn finish(self, commit: &CommitSummary) -> GenerationSummary {
        GenerationSummary {
            generation: self.begin.generation,
            cause: self.begin.cause,
            started: self.begin.timestamp,
            slices: self.slices,
            units: self.units,
            build_ticks: self.ticks[phase_index(PhaseKind::Build)],
            commit_ticks: self.ticks[phase_index(PhaseKind::Commit)],
            inserted: commit.inserted,
            updated: commit.updated,
            deleted: commit.deleted,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Build => 0,
        PhaseKind::Commit => 1,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> GenerationBeginEvent {
        GenerationBeginEvent {
            generation: 3,
            cause: GenerationCause::StateUpdate,
            timestamp: HostTime(1_000),
        }
    }

    fn sample_commit() -> CommitSummary {
        CommitSummary {
            generation: 3,
            inserted: 2,
            updated: 5,
            deleted: 1,
            ..CommitSummary::default()
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_generation_begin(&sample_begin());
        sink.on_commit(&sample_commit());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.generation_begin(&sample_begin());
        tracer.commit(&sample_commit());
    }

    #[test]
    fn summary_builder_sums_build_segments() {
        let mut builder = GenerationSummaryBuilder::new(&sample_begin());

        builder.phase_begin(PhaseKind::Build, HostTime(1_000));
        builder.phase_end(PhaseKind::Build, HostTime(1_300));
        builder.slice(4);
        builder.phase_begin(PhaseKind::Build, HostTime(2_000));
        builder.phase_end(PhaseKind::Build, HostTime(2_100));
        builder.phase_begin(PhaseKind::Commit, HostTime(2_100));
        builder.phase_end(PhaseKind::Commit, HostTime(2_150));
        builder.slice(2);

        let summary = builder.finish(&sample_commit());
        assert_eq!(summary.build_ticks, 400, "300 + 100 across two slices");
        assert_eq!(summary.commit_ticks, 50, "single commit segment");
        assert_eq!(summary.slices, 2, "two slices");
        assert_eq!(summary.units, 6, "4 + 2 units");
        assert_eq!(summary.inserted, 2, "copied from the commit");
        assert_eq!(summary.cause, GenerationCause::StateUpdate, "cause kept");
    }

    #[test]
    fn summary_builder_ignores_unmatched_end() {
        let mut builder = GenerationSummaryBuilder::new(&sample_begin());
        builder.phase_end(PhaseKind::Commit, HostTime(5_000));
        let summary = builder.finish(&CommitSummary::default());
        assert_eq!(summary.commit_ticks, 0, "no open segment");
        assert_eq!(summary.build_ticks, 0, "never built");
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            generations: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_generation_begin(&mut self, e: &GenerationBeginEvent) {
                self.generations.push(e.generation);
            }
        }

        let mut sink = RecordingSink {
            generations: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.generation_begin(&sample_begin());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.generations, &[3], "dispatched");
    }
}
