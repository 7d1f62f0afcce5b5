// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Slices and the phases inside them become nested duration events; generation
//! boundaries, commits, and units of work become instant events.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use sediment_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
/// Commit, summary, and unit-of-work records carry no time of their own and
/// are placed at the most recent timestamp seen.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0_f64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::GenerationBegin(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "GenerationBegin",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "generation": e.generation,
                        "cause": format!("{:?}", e.cause),
                    }
                }));
            }
            RecordedEvent::GenerationAbandon(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "GenerationAbandon",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "generation": e.generation,
                        "reason": format!("{:?}", e.reason),
                        "units": e.units,
                    }
                }));
            }
            RecordedEvent::SliceBegin(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "B",
                    "name": "Slice",
                    "cat": "Slice",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": e.generation,
                        "slice": e.slice,
                    }
                }));
            }
            RecordedEvent::SliceEnd(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "E",
                    "name": "Slice",
                    "cat": "Slice",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": e.generation,
                        "slice": e.slice,
                        "units": e.units,
                        "yielded": e.yielded,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Phase",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": e.generation,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Phase",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": e.generation,
                    }
                }));
            }
            RecordedEvent::Commit(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Commit",
                    "cat": "Commit",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "generation": s.generation,
                        "inserted": s.inserted,
                        "updated": s.updated,
                        "deleted": s.deleted,
                        "attributes_set": s.attributes_set,
                        "attributes_removed": s.attributes_removed,
                        "listeners_added": s.listeners_added,
                        "listeners_removed": s.listeners_removed,
                    }
                }));
            }
            RecordedEvent::GenerationSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "GenerationSummary",
                    "cat": "Summary",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "generation": s.generation,
                        "cause": format!("{:?}", s.cause),
                        "started_us": ticks_to_us(s.started.ticks(), timebase),
                        "slices": s.slices,
                        "units": s.units,
                        "build_us": ticks_to_us(s.build_ticks, timebase),
                        "commit_us": ticks_to_us(s.commit_ticks, timebase),
                    }
                }));
            }
            RecordedEvent::UnitOfWork(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.kind),
                    "cat": "Unit",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "generation": e.generation,
                        "fiber": e.fiber_index,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_micros_f64(ticks)
}
