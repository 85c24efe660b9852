// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//! Frame phases become duration events on one track, cache and pipeline
//! activity become instants, and frame summaries become counters.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use lamina_core::trace::CacheContent;

use crate::recorder::{RecordedEvent, decode};

const PID: u32 = 1;
const TID_RASTER: u32 = 1;
const TID_PIPELINE: u32 = 2;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Events without a timestamp of their own (cache, resource misses, drops,
/// layer bounds) are placed at the start of the frame they occurred in.
///
/// # Errors
///
/// Returns any error from writing to `writer`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut frame_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                frame_ts = nanos_to_us(e.timestamp.nanos());
                events.push(json!({
                    "ph": "i",
                    "name": "FrameBegin",
                    "cat": "Frame",
                    "ts": frame_ts,
                    "pid": PID,
                    "tid": TID_RASTER,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "scene_version": e.scene_version,
                        "target_us": e.target_time.map(|t| nanos_to_us(t.nanos())),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": nanos_to_us(e.timestamp.nanos()),
                    "pid": PID,
                    "tid": TID_RASTER,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": nanos_to_us(e.timestamp.nanos()),
                    "pid": PID,
                    "tid": TID_RASTER,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Cache(e) => {
                let (content, id) = match e.content {
                    CacheContent::Picture(id) => ("picture", id),
                    CacheContent::Layer(id) => ("layer", id),
                };
                events.push(json!({
                    "ph": "i",
                    "name": format!("Cache{:?}", e.kind),
                    "cat": "RasterCache",
                    "ts": frame_ts,
                    "pid": PID,
                    "tid": TID_RASTER,
                    "s": "t",
                    "args": {
                        "content": content,
                        "id": id,
                        "width": e.width,
                        "height": e.height,
                    }
                }));
            }
            RecordedEvent::ResourceMiss(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ResourceMiss",
                    "cat": "Resources",
                    "ts": frame_ts,
                    "pid": PID,
                    "tid": TID_RASTER,
                    "s": "t",
                    "args": {
                        "kind": format!("{:?}", e.kind),
                        "id": e.id,
                    }
                }));
            }
            RecordedEvent::FrameDropped(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameDropped",
                    "cat": "Pipeline",
                    "ts": frame_ts,
                    "pid": PID,
                    "tid": TID_PIPELINE,
                    "s": "p",
                    "args": {
                        "dropped_version": e.dropped_version,
                        "replaced_by": e.replaced_by,
                    }
                }));
            }
            RecordedEvent::Submit(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Submit",
                    "cat": "Frame",
                    "ts": nanos_to_us(e.submitted_at.nanos()),
                    "pid": PID,
                    "tid": TID_RASTER,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "accepted": e.accepted,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "RasterCache",
                    "cat": "Summary",
                    "ts": nanos_to_us(s.start.nanos()),
                    "pid": PID,
                    "args": {
                        "hits": s.cache_hits,
                        "rasterized": s.cache_rasterized,
                        "evicted": s.cache_evicted,
                    }
                }));
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": nanos_to_us(s.start.nanos()),
                    "pid": PID,
                    "tid": TID_RASTER,
                    "s": "t",
                    "args": {
                        "frame_index": s.frame_index,
                        "preroll_us": nanos_to_us(s.preroll_ns),
                        "paint_us": nanos_to_us(s.paint_ns),
                        "sweep_us": nanos_to_us(s.sweep_ns),
                        "submit_us": nanos_to_us(s.submit_ns),
                        "over_budget": s.over_budget,
                    }
                }));
            }
            RecordedEvent::LayerBounds(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": e.kind.name(),
                    "cat": "Rich",
                    "ts": frame_ts,
                    "pid": PID,
                    "tid": TID_RASTER,
                    "s": "t",
                    "args": {
                        "layer_id": e.layer_id,
                        "bounds": e.bounds,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use lamina_core::time::HostTime;
    use lamina_core::trace::{
        CacheEvent, CacheEventKind, FrameBeginEvent, FrameSummary, PhaseBeginEvent,
        PhaseEndEvent, PhaseKind, TraceSink,
    };

    use super::*;
    use crate::recorder::RecorderSink;

    fn export_to_values(bytes: &[u8]) -> Vec<Value> {
        let mut out = Vec::new();
        export(bytes, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 1,
            scene_version: 1,
            timestamp: HostTime(2_000_000),
            target_time: None,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Preroll,
            timestamp: HostTime(2_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 1,
            phase: PhaseKind::Preroll,
            timestamp: HostTime(2_000_500),
        });
        rec.on_cache(&CacheEvent {
            kind: CacheEventKind::Hit,
            content: CacheContent::Picture(4),
            width: 10,
            height: 10,
        });

        let parsed = export_to_values(rec.as_bytes());
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["name"], "FrameBegin");
        assert_eq!(parsed[0]["ts"], 2000.0);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "Preroll");
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 2000.5);

        // Cache events are stamped with the frame start.
        assert_eq!(parsed[3]["name"], "CacheHit");
        assert_eq!(parsed[3]["ts"], 2000.0);
        assert_eq!(parsed[3]["args"]["content"], "picture");
    }

    #[test]
    fn summary_emits_counter_and_instant() {
        let mut rec = RecorderSink::new();
        rec.on_frame_summary(&FrameSummary {
            frame_index: 3,
            start: HostTime(1_000),
            preroll_ns: 0,
            paint_ns: 2_000,
            sweep_ns: 0,
            submit_ns: 0,
            cache_hits: 2,
            cache_rasterized: 1,
            cache_evicted: 0,
            over_budget: false,
        });
        let parsed = export_to_values(rec.as_bytes());
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["ph"], "C");
        assert_eq!(parsed[0]["args"]["hits"], 2);
        assert_eq!(parsed[1]["args"]["paint_us"], 2.0);
    }

    #[test]
    fn export_empty_recording() {
        assert!(export_to_values(&[]).is_empty());
    }
}
