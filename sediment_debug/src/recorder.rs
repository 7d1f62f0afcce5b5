// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use sediment_core::scheduler::CommitSummary;
use sediment_core::time::HostTime;
use sediment_core::trace::{
    AbandonReason, GenerationAbandonEvent, GenerationBeginEvent, GenerationCause,
    GenerationSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, SliceBeginEvent, SliceEndEvent,
    TraceSink, UnitKind, UnitOfWorkEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_GENERATION_BEGIN: u8 = 1;
const TAG_GENERATION_ABANDON: u8 = 2;
const TAG_SLICE_BEGIN: u8 = 3;
const TAG_SLICE_END: u8 = 4;
const TAG_PHASE_BEGIN: u8 = 5;
const TAG_PHASE_END: u8 = 6;
const TAG_COMMIT: u8 = 7;
const TAG_GENERATION_SUMMARY: u8 = 8;
const TAG_UNIT_OF_WORK: u8 = 9;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_cause(&mut self, c: GenerationCause) {
        self.write_u8(match c {
            GenerationCause::Render => 0,
            GenerationCause::StateUpdate => 1,
            GenerationCause::Unmount => 2,
        });
    }

    fn write_reason(&mut self, r: AbandonReason) {
        self.write_u8(match r {
            AbandonReason::Superseded => 0,
            AbandonReason::SurfaceError => 1,
        });
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Build => 0,
            PhaseKind::Commit => 1,
        });
    }

    fn write_unit_kind(&mut self, k: UnitKind) {
        self.write_u8(match k {
            UnitKind::Root => 0,
            UnitKind::Component => 1,
            UnitKind::Element => 2,
            UnitKind::Text => 3,
            UnitKind::Empty => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_generation_begin(&mut self, e: &GenerationBeginEvent) {
        self.write_u8(TAG_GENERATION_BEGIN);
        self.write_u64(e.generation);
        self.write_cause(e.cause);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_generation_abandon(&mut self, e: &GenerationAbandonEvent) {
        self.write_u8(TAG_GENERATION_ABANDON);
        self.write_u64(e.generation);
        self.write_reason(e.reason);
        self.write_u32(e.units);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_slice_begin(&mut self, e: &SliceBeginEvent) {
        self.write_u8(TAG_SLICE_BEGIN);
        self.write_u64(e.generation);
        self.write_u32(e.slice);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_slice_end(&mut self, e: &SliceEndEvent) {
        self.write_u8(TAG_SLICE_END);
        self.write_u64(e.generation);
        self.write_u32(e.slice);
        self.write_u32(e.units);
        self.write_u8(u8::from(e.yielded));
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.generation);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.generation);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_commit(&mut self, s: &CommitSummary) {
        self.write_u8(TAG_COMMIT);
        self.write_u64(s.generation);
        self.write_u32(s.inserted);
        self.write_u32(s.updated);
        self.write_u32(s.deleted);
        self.write_u32(s.attributes_set);
        self.write_u32(s.attributes_removed);
        self.write_u32(s.listeners_added);
        self.write_u32(s.listeners_removed);
    }

    fn on_generation_summary(&mut self, s: &GenerationSummary) {
        self.write_u8(TAG_GENERATION_SUMMARY);
        self.write_u64(s.generation);
        self.write_cause(s.cause);
        self.write_u64(s.started.ticks());
        self.write_u32(s.slices);
        self.write_u32(s.units);
        self.write_u64(s.build_ticks);
        self.write_u64(s.commit_ticks);
        self.write_u32(s.inserted);
        self.write_u32(s.updated);
        self.write_u32(s.deleted);
    }

    fn on_unit_of_work(&mut self, e: &UnitOfWorkEvent) {
        self.write_u8(TAG_UNIT_OF_WORK);
        self.write_u64(e.generation);
        self.write_u32(e.fiber_index);
        self.write_unit_kind(e.kind);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`GenerationBeginEvent`].
    GenerationBegin(GenerationBeginEvent),
    /// A [`GenerationAbandonEvent`].
    GenerationAbandon(GenerationAbandonEvent),
    /// A [`SliceBeginEvent`].
    SliceBegin(SliceBeginEvent),
    /// A [`SliceEndEvent`].
    SliceEnd(SliceEndEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CommitSummary`].
    Commit(CommitSummary),
    /// A [`GenerationSummary`].
    GenerationSummary(GenerationSummary),
    /// A [`UnitOfWorkEvent`].
    UnitOfWork(UnitOfWorkEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_cause(&mut self) -> Option<GenerationCause> {
        Some(match self.read_u8()? {
            0 => GenerationCause::Render,
            1 => GenerationCause::StateUpdate,
            _ => GenerationCause::Unmount,
        })
    }

    fn read_reason(&mut self) -> Option<AbandonReason> {
        Some(match self.read_u8()? {
            0 => AbandonReason::Superseded,
            _ => AbandonReason::SurfaceError,
        })
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Build,
            _ => PhaseKind::Commit,
        })
    }

    fn read_unit_kind(&mut self) -> Option<UnitKind> {
        Some(match self.read_u8()? {
            0 => UnitKind::Root,
            1 => UnitKind::Component,
            2 => UnitKind::Element,
            3 => UnitKind::Text,
            _ => UnitKind::Empty,
        })
    }

    fn decode_generation_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::GenerationBegin(GenerationBeginEvent {
            generation: self.read_u64()?,
            cause: self.read_cause()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_generation_abandon(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::GenerationAbandon(GenerationAbandonEvent {
            generation: self.read_u64()?,
            reason: self.read_reason()?,
            units: self.read_u32()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_slice_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SliceBegin(SliceBeginEvent {
            generation: self.read_u64()?,
            slice: self.read_u32()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_slice_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SliceEnd(SliceEndEvent {
            generation: self.read_u64()?,
            slice: self.read_u32()?,
            units: self.read_u32()?,
            yielded: self.read_u8()? != 0,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            generation: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            generation: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitSummary {
            generation: self.read_u64()?,
            inserted: self.read_u32()?,
            updated: self.read_u32()?,
            deleted: self.read_u32()?,
            attributes_set: self.read_u32()?,
            attributes_removed: self.read_u32()?,
            listeners_added: self.read_u32()?,
            listeners_removed: self.read_u32()?,
        }))
    }

    fn decode_generation_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::GenerationSummary(GenerationSummary {
            generation: self.read_u64()?,
            cause: self.read_cause()?,
            started: self.read_time()?,
            slices: self.read_u32()?,
            units: self.read_u32()?,
            build_ticks: self.read_u64()?,
            commit_ticks: self.read_u64()?,
            inserted: self.read_u32()?,
            updated: self.read_u32()?,
            deleted: self.read_u32()?,
        }))
    }

    fn decode_unit_of_work(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::UnitOfWork(UnitOfWorkEvent {
            generation: self.read_u64()?,
            fiber_index: self.read_u32()?,
            kind: self.read_unit_kind()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_GENERATION_BEGIN => self.decode_generation_begin(),
            TAG_GENERATION_ABANDON => self.decode_generation_abandon(),
            TAG_SLICE_BEGIN => self.decode_slice_begin(),
            TAG_SLICE_END => self.decode_slice_end(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_COMMIT => self.decode_commit(),
            TAG_GENERATION_SUMMARY => self.decode_generation_summary(),
            TAG_UNIT_OF_WORK => self.decode_unit_of_work(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
