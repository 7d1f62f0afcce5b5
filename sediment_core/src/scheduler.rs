// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cooperative work loop.
//!
//! A [`Scheduler`] owns every fiber and the cursors of the in-flight
//! generation. The host calls [`run_slice`](Scheduler::run_slice) from its
//! scheduling primitive with a [`Deadline`]; the scheduler processes fibers
//! until the tree is complete or the budget runs out, and commits in the same
//! slice that finishes building.
//!
//! # Generations
//!
//! A generation starts at the beginning of a slice when one of these is
//! pending:
//!
//! - a [`render`](Scheduler::render) or [`unmount`](Scheduler::unmount) call;
//! - a state update queued through a
//!   [`StateSetter`](crate::hooks::StateSetter).
//!
//! Every generation diffs against the last committed tree. Starting one while
//! another is still building abandons the older one; queued state survives
//! because it lives in the shared hook cells, not in the abandoned fibers.
//!
//! Updates queued while a component renders are held back until the current
//! generation commits, so a component that sets state during render does not
//! keep restarting its own generation.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::deadline::{Deadline, Unbounded};
use crate::describe::{Attributes, Node};
use crate::error::Error;
use crate::fiber::{Effect, FiberId, FiberStore};
use crate::hooks::UpdateSignal;
use crate::surface::Surface;
use crate::time::{Duration, HostTime};
use crate::trace::{
    AbandonReason, GenerationAbandonEvent, GenerationBeginEvent, GenerationCause,
    GenerationSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, SliceBeginEvent,
    SliceEndEvent, Tracer,
};

/// Configuration for the [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Yield once [`Deadline::time_remaining`] drops below this.
    pub yield_threshold: Duration,
    /// Units of work processed in every slice before the deadline is
    /// consulted.
    pub min_units_per_slice: u32,
    /// Commits [`Scheduler::flush`] allows before reporting
    /// [`Error::Unsettled`].
    pub max_settle_generations: u32,
}

impl SchedulerConfig {
    /// Configuration for idle-callback hosts with microsecond ticks.
    ///
    /// Yields when less than a millisecond remains, and always makes progress
    /// on at least one fiber per slice.
    #[must_use]
    pub const fn idle_callback() -> Self {
        Self {
            yield_threshold: Duration(1_000),
            min_units_per_slice: 1,
            max_settle_generations: 32,
        }
    }

    /// Configuration for tests and headless hosts.
    ///
    /// Yields as soon as the deadline reports no time left, with no
    /// guaranteed progress, so a [`Steps`](crate::deadline::Steps) budget of
    /// `n` processes exactly `n` fibers.
    #[must_use]
    pub const fn headless() -> Self {
        Self {
            yield_threshold: Duration(1),
            min_units_per_slice: 0,
            max_settle_generations: 32,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::idle_callback()
    }
}

/// Where the work loop is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No generation in flight.
    #[default]
    Idle,
    /// Processing fibers; may span several slices.
    Building,
    /// Applying effects; never spans slices.
    Committing,
}

/// What one slice did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Nothing was pending.
    Idle,
    /// The budget ran out with fibers left to process.
    Yielded {
        /// Units of work processed in this slice.
        units: u32,
    },
    /// The generation finished building and was committed.
    Committed {
        /// Units of work processed in this slice.
        units: u32,
        /// Effect counters of the commit.
        summary: CommitSummary,
    },
}

/// Counters describing one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CommitSummary {
    /// The committed generation.
    pub generation: u64,
    /// Fibers committed with [`Effect::Insert`].
    pub inserted: u32,
    /// Fibers committed with [`Effect::Update`].
    pub updated: u32,
    /// Subtrees committed with [`Effect::Delete`].
    pub deleted: u32,
    /// `set_attribute` calls made for updated nodes.
    pub attributes_set: u32,
    /// `remove_attribute` calls made for updated nodes.
    pub attributes_removed: u32,
    /// `add_listener` calls made.
    pub listeners_added: u32,
    /// `remove_listener` calls made for updated nodes.
    pub listeners_removed: u32,
}

impl CommitSummary {
    /// Returns `true` if the commit changed nothing on the surface.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inserted == 0
            && self.deleted == 0
            && self.attributes_set == 0
            && self.attributes_removed == 0
            && self.listeners_added == 0
            && self.listeners_removed == 0
    }
}

/// The most recent root description and where it goes.
struct RootRequest<N> {
    container: N,
    children: Rc<[Node]>,
}

/// Drives generations from request to commit.
///
/// # Usage
///
/// ```rust,ignore
/// let mut scheduler = Scheduler::new(SchedulerConfig::idle_callback());
/// scheduler.render(app, container);
/// // From the host's scheduling primitive:
/// scheduler.run_slice(&mut surface, &deadline)?;
/// if scheduler.has_pending_work() {
///     // re-arm
/// }
/// ```
pub struct Scheduler<S: Surface> {
    config: SchedulerConfig,
    pub(crate) fibers: FiberStore<S::Node>,
    phase: Phase,
    request: Option<RootRequest<S::Node>>,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    restart: Option<GenerationCause>,
    pub(crate) signal: Rc<UpdateSignal>,
    /// Set when a component queued an update while rendering.
    pub(crate) update_after_commit: bool,
    generation: u64,
    slice: u32,
    summary: Option<GenerationSummaryBuilder>,
}

impl<S: Surface> Scheduler<S> {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            fibers: FiberStore::new(),
            phase: Phase::Idle,
            request: None,
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            restart: None,
            signal: Rc::new(UpdateSignal::default()),
            update_after_commit: false,
            generation: 0,
            slice: 0,
            summary: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // -- Requests --

    /// Requests a render of `root` into `container`.
    ///
    /// The generation starts at the beginning of the next slice, replacing
    /// any generation still building. Rendering into a different container
    /// than the committed tree's unmounts the old tree in the same commit.
    pub fn render(&mut self, root: impl Into<Node>, container: S::Node) {
        self.request = Some(RootRequest {
            container,
            children: Rc::from([root.into()]),
        });
        self.restart = Some(GenerationCause::Render);
        self.signal.wake();
    }

    /// Requests removal of everything rendered into the container.
    ///
    /// Does nothing if nothing was ever rendered.
    pub fn unmount(&mut self) {
        if let Some(request) = &mut self.request {
            request.children = Rc::from([]);
            self.restart = Some(GenerationCause::Unmount);
            self.signal.wake();
        }
    }

    /// Installs a hook that runs whenever new work is requested: a state
    /// update arriving while none was pending, a render, or an unmount.
    ///
    /// Host loops use it to re-arm their scheduling primitive. Pass `None` to
    /// remove it.
    pub fn set_wake_hook(&self, hook: Option<Box<dyn Fn()>>) {
        self.signal.set_wake(hook);
    }

    // -- Inspection --

    /// Returns `true` if a slice would do work.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.next_unit.is_some()
            || (self.request.is_some() && (self.restart.is_some() || self.signal.is_pending()))
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the fiber the next slice will process first.
    #[must_use]
    pub fn pending_unit(&self) -> Option<FiberId> {
        self.next_unit
    }

    /// Returns the root anchor of the committed tree.
    #[must_use]
    pub fn committed_root(&self) -> Option<FiberId> {
        self.current_root
    }

    /// Returns the number of the newest generation started.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the fiber store for read-only inspection.
    #[must_use]
    pub fn fibers(&self) -> &FiberStore<S::Node> {
        &self.fibers
    }

    // -- Work loop --

    /// Runs one slice without tracing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Surface`] when the adapter rejects a node. The
    /// generation is abandoned and the committed tree is left untouched.
    pub fn run_slice(&mut self, surface: &mut S, deadline: &dyn Deadline) -> Result<SliceOutcome, Error> {
        self.run_slice_traced(surface, deadline, &mut Tracer::none())
    }

    /// Runs one slice, reporting events to `tracer`.
    ///
    /// # Errors
    ///
    /// See [`run_slice`](Self::run_slice).
    pub fn run_slice_traced(
        &mut self,
        surface: &mut S,
        deadline: &dyn Deadline,
        tracer: &mut Tracer<'_>,
    ) -> Result<SliceOutcome, Error> {
        let start = deadline.now();
        let updated = self.signal.take();
        let cause = self
            .restart
            .take()
            .or_else(|| updated.then_some(GenerationCause::StateUpdate));
        if let Some(cause) = cause {
            self.begin_generation(cause, start, tracer);
        }
        if self.next_unit.is_none() {
            return Ok(SliceOutcome::Idle);
        }

        let generation = self.generation;
        let slice = self.slice;
        self.slice += 1;
        tracer.slice_begin(&SliceBeginEvent {
            generation,
            slice,
            timestamp: start,
        });
        self.phase_begin(PhaseKind::Build, start, tracer);

        let mut units = 0_u32;
        while let Some(unit) = self.next_unit {
            if units >= self.config.min_units_per_slice
                && deadline.time_remaining() < self.config.yield_threshold
            {
                let now = deadline.now();
                self.phase_end(PhaseKind::Build, now, tracer);
                self.end_slice(slice, units, true, now, tracer);
                return Ok(SliceOutcome::Yielded { units });
            }
            #[cfg(feature = "trace-rich")]
            let kind = self.unit_kind(unit);
            match self.perform_unit_of_work(surface, unit) {
                Ok(next) => self.next_unit = next,
                Err(source) => {
                    let now = deadline.now();
                    self.phase_end(PhaseKind::Build, now, tracer);
                    self.end_slice(slice, units, false, now, tracer);
                    tracing::warn!(generation, fiber = %unit, error = %source, "surface rejected node");
                    self.abandon(AbandonReason::SurfaceError, now, tracer);
                    return Err(Error::Surface {
                        generation,
                        fiber: unit,
                        source,
                    });
                }
            }
            units += 1;
            #[cfg(feature = "trace-rich")]
            tracer.unit_of_work(&crate::trace::UnitOfWorkEvent {
                generation,
                fiber_index: unit.index(),
                kind,
            });
        }

        let now = deadline.now();
        self.phase_end(PhaseKind::Build, now, tracer);
        self.phase = Phase::Committing;
        self.phase_begin(PhaseKind::Commit, now, tracer);
        let summary = self.commit_root(surface);
        self.phase = Phase::Idle;
        let end = deadline.now();
        self.phase_end(PhaseKind::Commit, end, tracer);
        self.end_slice(slice, units, false, end, tracer);
        tracer.commit(&summary);
        if let Some(builder) = self.summary.take() {
            tracer.generation_summary(&builder.finish(&summary));
        }
        tracing::trace!(
            generation,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "generation committed"
        );

        if core::mem::take(&mut self.update_after_commit) {
            self.signal.schedule();
        }
        Ok(SliceOutcome::Committed { units, summary })
    }

    /// Runs unbounded slices until no work is pending and returns the last
    /// commit's summary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Surface`] from a failed slice, or
    /// [`Error::Unsettled`] when every one of
    /// [`max_settle_generations`](SchedulerConfig::max_settle_generations)
    /// commits scheduled another generation.
    pub fn flush(&mut self, surface: &mut S) -> Result<Option<CommitSummary>, Error> {
        let mut last = None;
        let mut generations = 0_u32;
        while self.has_pending_work() {
            if let SliceOutcome::Committed { summary, .. } = self.run_slice(surface, &Unbounded)? {
                last = Some(summary);
                generations += 1;
                if generations >= self.config.max_settle_generations && self.has_pending_work() {
                    return Err(Error::Unsettled { generations });
                }
            }
        }
        Ok(last)
    }

    // -- Generation lifecycle --

    /// Seeds a new work-in-progress root from the latest request.
    fn begin_generation(&mut self, cause: GenerationCause, now: HostTime, tracer: &mut Tracer<'_>) {
        if self.wip_root.is_some() {
            self.abandon(AbandonReason::Superseded, now, tracer);
        }
        let Some(request) = &self.request else {
            return;
        };
        self.generation += 1;
        self.slice = 0;

        let root = self
            .fibers
            .allocate(None, Attributes::new(), Rc::clone(&request.children));
        self.fibers.surface[root.idx as usize] = Some(request.container.clone());
        if let Some(current) = self.current_root {
            let same_container =
                self.fibers.surface[current.idx as usize].as_ref() == Some(&request.container);
            if same_container {
                self.fibers.alternate[root.idx as usize] = Some(current);
            } else {
                // Fresh mount; the old tree leaves its container in this commit.
                let old: Vec<FiberId> = self.fibers.children(current).collect();
                for child in old {
                    self.fibers.effect[child.idx as usize] = Effect::Delete;
                    self.deletions.push(child);
                }
            }
        }
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        self.phase = Phase::Building;

        let begin = GenerationBeginEvent {
            generation: self.generation,
            cause,
            timestamp: now,
        };
        tracer.generation_begin(&begin);
        self.summary = Some(GenerationSummaryBuilder::new(&begin));
        tracing::trace!(generation = self.generation, ?cause, "generation started");
    }

    /// Drops the in-flight generation and frees its fibers.
    ///
    /// Detached nodes the generation created are dropped with their fibers.
    fn abandon(&mut self, reason: AbandonReason, now: HostTime, tracer: &mut Tracer<'_>) {
        let Some(root) = self.wip_root.take() else {
            return;
        };
        for id in self.deletions.drain(..) {
            if self.fibers.is_alive(id) {
                self.fibers.effect[id.idx as usize] = Effect::None;
            }
        }
        self.fibers.release_subtree(root);
        self.next_unit = None;
        self.phase = Phase::Idle;
        // Held-back updates stay queued in their cells for the next generation.
        self.update_after_commit = false;

        let units = self.summary.take().map_or(0, |b| b.units());
        tracer.generation_abandon(&GenerationAbandonEvent {
            generation: self.generation,
            reason,
            units,
            timestamp: now,
        });
        tracing::debug!(generation = self.generation, ?reason, units, "generation abandoned");
    }

    fn end_slice(
        &mut self,
        slice: u32,
        units: u32,
        yielded: bool,
        now: HostTime,
        tracer: &mut Tracer<'_>,
    ) {
        if let Some(builder) = &mut self.summary {
            builder.slice(units);
        }
        tracer.slice_end(&SliceEndEvent {
            generation: self.generation,
            slice,
            units,
            yielded,
            timestamp: now,
        });
    }

    fn phase_begin(&mut self, phase: PhaseKind, now: HostTime, tracer: &mut Tracer<'_>) {
        if let Some(builder) = &mut self.summary {
            builder.phase_begin(phase, now);
        }
        tracer.phase_begin(&PhaseBeginEvent {
            generation: self.generation,
            phase,
            timestamp: now,
        });
    }

    fn phase_end(&mut self, phase: PhaseKind, now: HostTime, tracer: &mut Tracer<'_>) {
        if let Some(builder) = &mut self.summary {
            builder.phase_end(phase, now);
        }
        tracer.phase_end(&PhaseEndEvent {
            generation: self.generation,
            phase,
            timestamp: now,
        });
    }
}

impl<S: Surface> fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("committed_root", &self.current_root)
            .field("wip_root", &self.wip_root)
            .field("next_unit", &self.next_unit)
            .field("deletions", &self.deletions.len())
            .field("live_fibers", &self.fibers.live_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Steps;
    use crate::describe::element;
    use crate::surface::memory::MemorySurface;

    #[test]
    fn presets() {
        let idle = SchedulerConfig::idle_callback();
        assert_eq!(idle.yield_threshold, Duration(1_000), "1 ms in µs ticks");
        assert_eq!(idle.min_units_per_slice, 1, "always progress");
        assert_eq!(SchedulerConfig::default(), idle, "default preset");
        let headless = SchedulerConfig::headless();
        assert_eq!(headless.min_units_per_slice, 0, "pure step budget");
    }

    #[test]
    fn idle_without_request() {
        let mut surface = MemorySurface::new();
        let mut scheduler = Scheduler::<MemorySurface>::new(SchedulerConfig::headless());
        assert!(!scheduler.has_pending_work(), "nothing requested");
        let outcome = scheduler.run_slice(&mut surface, &Unbounded).unwrap();
        assert_eq!(outcome, SliceOutcome::Idle, "no generation");
        assert_eq!(scheduler.generation(), 0, "none started");
        scheduler.unmount();
        assert!(!scheduler.has_pending_work(), "unmount without render is a no-op");
    }

    #[test]
    fn render_starts_at_next_slice() {
        let mut surface = MemorySurface::new();
        let root = surface.create_container("root");
        let mut scheduler = Scheduler::new(SchedulerConfig::headless());
        scheduler.render(element("div"), root);
        assert_eq!(scheduler.phase(), Phase::Idle, "deferred to the slice");
        assert!(scheduler.has_pending_work(), "requested");

        let outcome = scheduler.run_slice(&mut surface, &Steps::new(1)).unwrap();
        assert_eq!(outcome, SliceOutcome::Yielded { units: 1 }, "root processed");
        assert_eq!(scheduler.phase(), Phase::Building, "mid-build");
        assert_eq!(scheduler.generation(), 1, "first generation");

        let outcome = scheduler.run_slice(&mut surface, &Unbounded).unwrap();
        assert!(
            matches!(outcome, SliceOutcome::Committed { units: 1, .. }),
            "div processed and committed: {outcome:?}"
        );
        assert_eq!(scheduler.phase(), Phase::Idle, "settled");
        assert!(!scheduler.has_pending_work(), "nothing left");
        assert!(scheduler.committed_root().is_some(), "baseline recorded");
    }

    #[test]
    fn wake_hook_fires_on_render() {
        use core::cell::Cell;

        let mut surface = MemorySurface::new();
        let root = surface.create_container("root");
        let mut scheduler = Scheduler::new(SchedulerConfig::headless());
        let wakes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&wakes);
        scheduler.set_wake_hook(Some(Box::new(move || counter.set(counter.get() + 1))));
        scheduler.render(element("p"), root);
        assert_eq!(wakes.get(), 1, "render wakes the host");
        scheduler.flush(&mut surface).unwrap();
        scheduler.unmount();
        assert_eq!(wakes.get(), 2, "unmount wakes the host");
    }

    #[test]
    fn noop_summary() {
        let summary = CommitSummary {
            generation: 4,
            updated: 3,
            ..CommitSummary::default()
        };
        assert!(summary.is_noop(), "updates without diffs change nothing");
        let summary = CommitSummary {
            attributes_set: 1,
            ..summary
        };
        assert!(!summary.is_noop(), "an attribute changed");
    }
}
