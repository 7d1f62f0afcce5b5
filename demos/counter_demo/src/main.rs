// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless counter app that exercises the work loop and the diagnostics
//! pipeline.
//!
//! Mounts two counters on a [`MemorySurface`], runs the render in simulated
//! idle periods (so the scheduler really yields between slices), clicks the
//! first counter a few times, and prints the markup after each commit. Events
//! go to both a [`PrettyPrintSink`] and a [`RecorderSink`]; the recording is
//! exported as a Chrome trace JSON file at the end.

use std::cell::Cell;
use std::fs::File;
use std::io::BufWriter;

use sediment_core::deadline::Deadline;
use sediment_core::describe::{Event, NodeBuilder, Props, component, element};
use sediment_core::hooks::RenderContext;
use sediment_core::scheduler::{CommitSummary, Scheduler, SchedulerConfig, SliceOutcome};
use sediment_core::surface::memory::{MemoryNodeId, MemorySurface};
use sediment_core::time::{Duration, HostTime, Timebase};
use sediment_core::trace::{
    GenerationAbandonEvent, GenerationBeginEvent, GenerationSummary, PhaseBeginEvent,
    PhaseEndEvent, SliceBeginEvent, SliceEndEvent, TraceSink, Tracer, UnitOfWorkEvent,
};

use sediment_debug::pretty::PrettyPrintSink;
use sediment_debug::recorder::RecorderSink;

/// Length of one simulated idle period, in µs ticks.
const IDLE_PERIOD_US: u64 = 3_000;
/// Simulated cost of one unit of work.
const UNIT_COST_US: u64 = 400;
/// Gap between idle periods (one 60 Hz frame).
const FRAME_GAP_US: u64 = 16_667;
const CLICKS: u32 = 3;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

fn counter(cx: &mut RenderContext<'_>, _: &Props<'_>) -> NodeBuilder {
    let (count, set_count) = cx.use_state(1_i32);
    element("h1")
        .child(
            element("a")
                .on("click", move |_| set_count.update(|c| c + 1))
                .child("Count: "),
        )
        .child(element("span").child(count))
}

fn static_counter(_: &mut RenderContext<'_>, _: &Props<'_>) -> NodeBuilder {
    element("h2")
        .child(element("div").child("Count: "))
        .child(element("div").child(2))
}

fn app() -> NodeBuilder {
    element("div")
        .child(component(counter))
        .child(component(static_counter))
}

// ---------------------------------------------------------------------------
// Simulated host
// ---------------------------------------------------------------------------

/// An idle period on a simulated clock. Every budget check stands for one
/// unit of work and advances the clock by [`UNIT_COST_US`].
struct SimulatedIdle<'a> {
    clock: &'a Cell<u64>,
    end: u64,
}

impl<'a> SimulatedIdle<'a> {
    fn begin(clock: &'a Cell<u64>) -> Self {
        let end = clock.get() + IDLE_PERIOD_US;
        Self { clock, end }
    }
}

impl Deadline for SimulatedIdle<'_> {
    fn time_remaining(&self) -> Duration {
        let now = self.clock.get() + UNIT_COST_US;
        self.clock.set(now);
        Duration(self.end.saturating_sub(now))
    }

    fn now(&self) -> HostTime {
        HostTime(self.clock.get())
    }
}

/// Forwards every event to two sinks.
struct Tee<'a> {
    a: &'a mut dyn TraceSink,
    b: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_generation_begin(&mut self, e: &GenerationBeginEvent) {
        self.a.on_generation_begin(e);
        self.b.on_generation_begin(e);
    }

    fn on_generation_abandon(&mut self, e: &GenerationAbandonEvent) {
        self.a.on_generation_abandon(e);
        self.b.on_generation_abandon(e);
    }

    fn on_slice_begin(&mut self, e: &SliceBeginEvent) {
        self.a.on_slice_begin(e);
        self.b.on_slice_begin(e);
    }

    fn on_slice_end(&mut self, e: &SliceEndEvent) {
        self.a.on_slice_end(e);
        self.b.on_slice_end(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.a.on_phase_begin(e);
        self.b.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.a.on_phase_end(e);
        self.b.on_phase_end(e);
    }

    fn on_commit(&mut self, s: &CommitSummary) {
        self.a.on_commit(s);
        self.b.on_commit(s);
    }

    fn on_generation_summary(&mut self, s: &GenerationSummary) {
        self.a.on_generation_summary(s);
        self.b.on_generation_summary(s);
    }

    fn on_unit_of_work(&mut self, e: &UnitOfWorkEvent) {
        self.a.on_unit_of_work(e);
        self.b.on_unit_of_work(e);
    }
}

/// Runs idle periods until the scheduler has nothing left to do.
fn settle(
    scheduler: &mut Scheduler<MemorySurface>,
    surface: &mut MemorySurface,
    root: MemoryNodeId,
    clock: &Cell<u64>,
    tracer: &mut Tracer<'_>,
) {
    while scheduler.has_pending_work() {
        let deadline = SimulatedIdle::begin(clock);
        let outcome = scheduler
            .run_slice_traced(surface, &deadline, tracer)
            .expect("every tag in the app is known to the memory surface");
        if let SliceOutcome::Committed { .. } = outcome {
            println!(
                "  {} => {}",
                surface.container_name(root).unwrap_or("?"),
                surface.markup(root)
            );
        }
        clock.set(clock.get().max(deadline.end) + FRAME_GAP_US);
    }
}

fn main() {
    let timebase = Timebase::MICROS;

    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()), timebase);
    let mut recorder = RecorderSink::new();

    // -- scheduler ---------------------------------------------------------
    let mut surface = MemorySurface::new();
    let root = surface.create_container("root");
    let mut scheduler: Scheduler<MemorySurface> = Scheduler::new(SchedulerConfig::idle_callback());
    let clock = Cell::new(1_000_000); // start at 1s

    {
        let mut tee = Tee {
            a: &mut pretty,
            b: &mut recorder,
        };
        let mut tracer = Tracer::new(&mut tee);

        println!("mount");
        scheduler.render(app(), root);
        settle(&mut scheduler, &mut surface, root, &clock, &mut tracer);

        for click in 1..=CLICKS {
            let link = surface.find(root, "a").expect("counter link mounted");
            let handled = surface.dispatch(link, &Event::new("click"));
            println!("click {click} ({handled} listener)");
            settle(&mut scheduler, &mut surface, root, &clock, &mut tracer);
        }
    }

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    sediment_debug::chrome::export(recorder.as_bytes(), timebase, &mut writer)
        .expect("failed to write Chrome trace");

    println!(
        "Wrote {path} ({} generations, {} bytes recorded)",
        scheduler.generation(),
        recorder.as_bytes().len()
    );
}
