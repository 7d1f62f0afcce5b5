// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use sediment_core::scheduler::CommitSummary;
use sediment_core::time::{HostTime, Timebase};
use sediment_core::trace::{
    AbandonReason, GenerationAbandonEvent, GenerationBeginEvent, GenerationCause,
    GenerationSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, SliceBeginEvent, SliceEndEvent,
    TraceSink, UnitOfWorkEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
    units: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self::new(Box::new(std::io::stderr()), timebase)
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self::with_writer(writer, timebase)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self {
            writer,
            timebase,
            units: false,
        }
    }

    /// Also prints one line per processed fiber. Off by default.
    #[must_use]
    pub fn with_units(mut self, units: bool) -> Self {
        self.units = units;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.timebase.ticks_to_micros_f64(t.ticks())
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_micros_f64(ticks)
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Build => "build",
        PhaseKind::Commit => "commit",
    }
}

fn cause_name(cause: GenerationCause) -> &'static str {
    match cause {
        GenerationCause::Render => "render",
        GenerationCause::StateUpdate => "state",
        GenerationCause::Unmount => "unmount",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_generation_begin(&mut self, e: &GenerationBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[gen:begin] gen={} cause={} at {:.1}µs",
            e.generation,
            cause_name(e.cause),
            self.host_us(e.timestamp),
        );
    }

    fn on_generation_abandon(&mut self, e: &GenerationAbandonEvent) {
        let reason = match e.reason {
            AbandonReason::Superseded => "superseded",
            AbandonReason::SurfaceError => "SURFACE ERROR",
        };
        let _ = writeln!(
            self.writer,
            "[gen:abandon] gen={} reason={reason} units={} at {:.1}µs",
            e.generation,
            e.units,
            self.host_us(e.timestamp),
        );
    }

    fn on_slice_begin(&mut self, e: &SliceBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[slice:begin] gen={} slice={} at {:.1}µs",
            e.generation,
            e.slice,
            self.host_us(e.timestamp),
        );
    }

    fn on_slice_end(&mut self, e: &SliceEndEvent) {
        let outcome = if e.yielded { "yielded" } else { "done" };
        let _ = writeln!(
            self.writer,
            "[slice:end] gen={} slice={} units={} {outcome} at {:.1}µs",
            e.generation,
            e.slice,
            e.units,
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] gen={} {} at {:.1}µs",
            e.generation,
            phase_name(e.phase),
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] gen={} {} at {:.1}µs",
            e.generation,
            phase_name(e.phase),
            self.host_us(e.timestamp),
        );
    }

    fn on_commit(&mut self, s: &CommitSummary) {
        let _ = writeln!(
            self.writer,
            "[commit] gen={} +{} ~{} -{} attrs=+{}/-{} listeners=+{}/-{}",
            s.generation,
            s.inserted,
            s.updated,
            s.deleted,
            s.attributes_set,
            s.attributes_removed,
            s.listeners_added,
            s.listeners_removed,
        );
    }

    fn on_generation_summary(&mut self, s: &GenerationSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] gen={} cause={} slices={} units={} build={:.1}µs commit={:.1}µs",
            s.generation,
            cause_name(s.cause),
            s.slices,
            s.units,
            self.ticks_to_us(s.build_ticks),
            self.ticks_to_us(s.commit_ticks),
        );
    }

    fn on_unit_of_work(&mut self, e: &UnitOfWorkEvent) {
        if self.units {
            let _ = writeln!(
                self.writer,
                "[unit] gen={} fiber=#{} {:?}",
                e.generation, e.fiber_index, e.kind,
            );
        }
    }
}
